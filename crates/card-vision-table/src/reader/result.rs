use card_vision_core::PixelRect;
use card_vision_match::{Candidate, SuitColorReading};
use chrono::{DateTime, Utc};

use crate::assembler::{
    ExternalAmounts, GameStateAssembler, GameStateSnapshot, ReadIssue, RecognizedCard,
};
use crate::learner::LearnOutcome;
use crate::locator::{LocatedRegion, TableLocation};
use crate::profile::RegionRole;

/// What happened in one card slot.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotOutcome {
    /// Not enough card face: no card dealt here.
    Empty,
    /// The crop could not be normalized.
    Unreadable,
    Recognized(RecognizedCard),
    /// Resembles a known card, but not enough to accept.
    Rejected { best: Candidate },
    /// Unlike anything known; handed to the learner.
    Learned(LearnOutcome),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlotReading {
    pub region: String,
    pub role: RegionRole,
    /// Slot index inside its region, left to right.
    pub index: usize,
    pub rect: PixelRect,
    pub color: Option<SuitColorReading>,
    pub outcome: SlotOutcome,
}

/// Output of reading one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TableReading {
    pub captured_at: DateTime<Utc>,
    pub table: Option<TableLocation>,
    pub regions: Vec<LocatedRegion>,
    pub slots: Vec<SlotReading>,
    /// Accepted hero cards, left to right. Empty if the frame was rejected.
    pub hero: Vec<RecognizedCard>,
    /// Accepted board cards, left to right. Empty if the frame was rejected.
    pub board: Vec<RecognizedCard>,
    pub rejection: Option<ReadIssue>,
    /// Confirmed templates refined by this frame.
    pub refinements: usize,
}

impl TableReading {
    pub(crate) fn table_not_found(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            table: None,
            regions: Vec::new(),
            slots: Vec::new(),
            hero: Vec::new(),
            board: Vec::new(),
            rejection: Some(ReadIssue::TableNotFound),
            refinements: 0,
        }
    }

    /// Regions holding text for an external reader (pot, stacks).
    pub fn text_regions(&self) -> impl Iterator<Item = &LocatedRegion> {
        self.regions.iter().filter(|r| r.role.is_text())
    }

    /// Provisional templates created by this frame.
    pub fn new_provisionals(&self) -> Vec<u64> {
        self.slots
            .iter()
            .filter_map(|s| match s.outcome {
                SlotOutcome::Learned(LearnOutcome::Created(id)) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Board slots showing a card face that did not yield an accepted card.
    pub fn unread_board_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.role == RegionRole::BoardCards)
            .filter(|s| !matches!(s.outcome, SlotOutcome::Empty | SlotOutcome::Recognized(_)))
            .count()
    }

    /// Assemble the game-state snapshot for this frame.
    pub fn snapshot(&self, amounts: ExternalAmounts) -> GameStateSnapshot {
        GameStateAssembler::assemble_partial(
            self.hero.clone(),
            self.board.clone(),
            self.unread_board_slots(),
            self.rejection.clone(),
            amounts,
            self.captured_at,
        )
    }
}
