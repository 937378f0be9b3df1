//! Periodic recognition session.
//!
//! A [`Session`] owns the template store for its lifetime, polls a
//! [`FrameSource`] once per cycle, reads each frame and hands the snapshot
//! to the caller. Learned templates are flushed every few hands and once
//! more at shutdown; a failed flush is logged and retried at the next one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use card_vision_core::{Card, Frame};
use card_vision_match::TemplateStore;
use card_vision_table::{ExternalAmounts, GameStateSnapshot, LocatedRegion, ReadIssue, TableReader};
use serde::{Deserialize, Serialize};

use crate::source::FrameSource;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// External reader for the text regions (pot, stacks).
pub trait AmountReader {
    fn read_amounts(&mut self, frame: &Frame, regions: &[&LocatedRegion]) -> ExternalAmounts;
}

/// Reads nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAmounts;

impl AmountReader for NoAmounts {
    fn read_amounts(&mut self, _frame: &Frame, _regions: &[&LocatedRegion]) -> ExternalAmounts {
        ExternalAmounts::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Save the store after this many new hands. `0` saves only at shutdown.
    pub flush_every_hands: u32,
    /// Stop after this many polls.
    pub max_cycles: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flush_every_hands: 10,
            max_cycles: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Polls of the frame source.
    pub cycles: u64,
    /// Polls that produced no frame.
    pub skipped: u64,
    pub table_not_found: u64,
    /// Invalid snapshots with a table in view.
    pub invalid: u64,
    pub valid: u64,
    pub hands: u64,
    pub provisional_created: u64,
    pub refinements: u64,
    pub flushes: u64,
    pub flush_failures: u64,
}

pub struct Session<S> {
    reader: TableReader,
    store: TemplateStore,
    source: S,
    amounts: Box<dyn AmountReader>,
    config: SessionConfig,
    stats: SessionStats,
    stop: Arc<AtomicBool>,
    last_hero: Option<Vec<Card>>,
    hands_since_flush: u32,
}

impl<S: FrameSource> Session<S> {
    pub fn new(reader: TableReader, store: TemplateStore, source: S, config: SessionConfig) -> Self {
        Self {
            reader,
            store,
            source,
            amounts: Box::new(NoAmounts),
            config,
            stats: SessionStats::default(),
            stop: Arc::new(AtomicBool::new(false)),
            last_hero: None,
            hands_since_flush: 0,
        }
    }

    pub fn with_amounts(mut self, amounts: impl AmountReader + 'static) -> Self {
        self.amounts = Box::new(amounts);
        self
    }

    /// Flag that ends [`Session::run`] before its next cycle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TemplateStore {
        &mut self.store
    }

    pub fn into_store(self) -> TemplateStore {
        self.store
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Poll the source once and read the frame. `None` if no frame came in.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self), fields(cycle = self.stats.cycles + 1))
    )]
    pub fn run_cycle(&mut self) -> Option<GameStateSnapshot> {
        self.stats.cycles += 1;
        let Some(frame) = self.source.next_frame() else {
            self.stats.skipped += 1;
            log::debug!("{}: no frame this cycle", self.source.name());
            return None;
        };

        let reading = self.reader.read_frame(&frame, &mut self.store);
        self.stats.provisional_created += reading.new_provisionals().len() as u64;
        self.stats.refinements += reading.refinements as u64;

        let amounts = if reading.table.is_some() {
            let text: Vec<&LocatedRegion> = reading.text_regions().collect();
            self.amounts.read_amounts(&frame, &text)
        } else {
            ExternalAmounts::default()
        };
        let snapshot = reading.snapshot(amounts);

        match snapshot.issue() {
            None => {
                self.stats.valid += 1;
                self.track_hand(&snapshot);
            }
            Some(ReadIssue::TableNotFound) => self.stats.table_not_found += 1,
            Some(_) => self.stats.invalid += 1,
        }
        Some(snapshot)
    }

    /// Run cycles until stopped, out of frames or at `max_cycles`, then
    /// flush the store and return the statistics.
    pub fn run(&mut self, mut on_snapshot: impl FnMut(&GameStateSnapshot)) -> SessionStats {
        log::info!("session started on {} source", self.source.name());
        loop {
            if self.stop.load(Ordering::Relaxed) {
                log::info!("stop requested");
                break;
            }
            if self
                .config
                .max_cycles
                .is_some_and(|max| self.stats.cycles >= max)
            {
                break;
            }
            if self.source.is_exhausted() {
                break;
            }
            if let Some(snapshot) = self.run_cycle() {
                on_snapshot(&snapshot);
            }
        }

        self.flush();
        let s = &self.stats;
        log::info!(
            "session finished: {} cycles ({} skipped), {} valid, {} invalid, {} without table, {} hands, {} new provisionals, {} refinements, {} flushes ({} failed)",
            s.cycles,
            s.skipped,
            s.valid,
            s.invalid,
            s.table_not_found,
            s.hands,
            s.provisional_created,
            s.refinements,
            s.flushes,
            s.flush_failures
        );
        self.stats.clone()
    }

    /// Save the store if it changed. Returns `false` on failure.
    ///
    /// A store without a root directory is kept in memory only.
    pub fn flush(&mut self) -> bool {
        self.hands_since_flush = 0;
        if self.store.root().is_none() {
            return true;
        }
        match self.reader.learner().flush(&mut self.store) {
            Ok(Some(summary)) => {
                self.stats.flushes += 1;
                log::debug!(
                    "templates saved: {} confirmed, {} provisional, {} stale files removed",
                    summary.confirmed,
                    summary.provisional,
                    summary.removed
                );
                true
            }
            Ok(None) => true,
            Err(e) => {
                self.stats.flush_failures += 1;
                log::warn!("template flush failed, retrying at the next flush: {e}");
                false
            }
        }
    }

    fn track_hand(&mut self, snapshot: &GameStateSnapshot) {
        let hero = snapshot.hero_cards();
        if self.last_hero.as_ref() == Some(&hero) {
            return;
        }
        self.stats.hands += 1;
        self.hands_since_flush += 1;
        log::debug!("hand {} starts", self.stats.hands);
        self.last_hero = Some(hero);

        let every = self.config.flush_every_hands;
        if every > 0 && self.hands_since_flush >= every {
            self.flush();
        }
    }
}
