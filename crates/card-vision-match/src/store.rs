//! In-memory template library with explicit load/save.
//!
//! On-disk layout under the store root:
//!
//! ```text
//! confirmed/<card>.png     canonical grayscale template, e.g. `Qs.png`
//! confirmed/<card>.json    sidecar metadata (history, observations, last seen)
//! provisional/<id>.png     unlabeled card image
//! provisional/<id>.json    sidecar metadata (hash, history, first/last seen)
//! ```
//!
//! Images are lossless 8-bit PNG, so a save/load cycle reproduces the pixel
//! data exactly.

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use card_vision_core::{Card, GrayImage};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::history::ConfidenceHistory;
use crate::template::{CardTemplate, ConfirmedMeta, ProvisionalMeta, ProvisionalTemplate};

const CONFIRMED_DIR: &str = "confirmed";
const PROVISIONAL_DIR: &str = "provisional";

#[derive(thiserror::Error, Debug)]
pub enum TemplateStoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("store has no root directory")]
    NoRoot,
    #[error("template image {path} is {got_w}x{got_h}, metadata says {want_w}x{want_h}")]
    DimensionMismatch {
        path: PathBuf,
        got_w: usize,
        got_h: usize,
        want_w: usize,
        want_h: usize,
    },
    #[error("metadata {path} does not match its file name")]
    NameMismatch { path: PathBuf },
    #[error("template {what} has an invalid raster")]
    InvalidRaster { what: String },
}

/// What a [`TemplateStore::save`] wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub confirmed: usize,
    pub provisional: usize,
    pub removed: usize,
}

/// Durable library of card templates keyed by card identity.
///
/// The store owns all template state; matching borrows it immutably and
/// learning borrows it mutably, so a template is never observed half-blended.
#[derive(Clone, Debug, Default)]
pub struct TemplateStore {
    root: Option<PathBuf>,
    confirmed: BTreeMap<Card, CardTemplate>,
    provisional: BTreeMap<u64, ProvisionalTemplate>,
    next_provisional_id: u64,
    dirty: bool,
}

impl TemplateStore {
    /// Empty in-memory store with no backing directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store rooted at `root`, loading every persisted template.
    ///
    /// A missing directory yields an empty store bound to `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TemplateStoreError> {
        let root = root.into();
        let mut store = Self {
            root: Some(root.clone()),
            ..Self::default()
        };
        store.load_from(&root)?;
        log::info!(
            "loaded {} confirmed and {} provisional templates from {}",
            store.confirmed.len(),
            store.provisional.len(),
            root.display()
        );
        Ok(store)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = Some(root.into());
        self.dirty = true;
    }

    /// True when in-memory state differs from what was last saved or loaded.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Number of confirmed templates.
    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    pub fn provisional_len(&self) -> usize {
        self.provisional.len()
    }

    /// Confirmed templates in card order.
    pub fn confirmed(&self) -> impl Iterator<Item = &CardTemplate> {
        self.confirmed.values()
    }

    pub fn get(&self, card: Card) -> Option<&CardTemplate> {
        self.confirmed.get(&card)
    }

    pub fn get_mut(&mut self, card: Card) -> Option<&mut CardTemplate> {
        let t = self.confirmed.get_mut(&card)?;
        self.dirty = true;
        Some(t)
    }

    /// Insert or replace a confirmed template, returning the previous one.
    pub fn insert_confirmed(&mut self, template: CardTemplate) -> Option<CardTemplate> {
        self.dirty = true;
        self.confirmed.insert(template.card, template)
    }

    pub fn remove_confirmed(&mut self, card: Card) -> Option<CardTemplate> {
        let t = self.confirmed.remove(&card)?;
        self.dirty = true;
        Some(t)
    }

    /// Provisional templates in id order.
    pub fn provisional(&self) -> impl Iterator<Item = &ProvisionalTemplate> {
        self.provisional.values()
    }

    pub fn get_provisional(&self, id: u64) -> Option<&ProvisionalTemplate> {
        self.provisional.get(&id)
    }

    pub fn get_provisional_mut(&mut self, id: u64) -> Option<&mut ProvisionalTemplate> {
        let t = self.provisional.get_mut(&id)?;
        self.dirty = true;
        Some(t)
    }

    /// Store a new provisional template and return its id.
    pub fn insert_provisional(
        &mut self,
        image: GrayImage,
        hash: String,
        confidence: f32,
        seen_at: DateTime<Utc>,
    ) -> u64 {
        let id = self.next_provisional_id;
        self.next_provisional_id += 1;
        self.provisional.insert(
            id,
            ProvisionalTemplate {
                id,
                image,
                hash,
                history: ConfidenceHistory::seeded(crate::DEFAULT_HISTORY_WINDOW, confidence),
                observations: 1,
                first_seen: seen_at,
                last_seen: seen_at,
            },
        );
        self.dirty = true;
        id
    }

    /// Remove and return a provisional template (used when promoting it).
    pub fn take_provisional(&mut self, id: u64) -> Option<ProvisionalTemplate> {
        let t = self.provisional.remove(&id)?;
        self.dirty = true;
        Some(t)
    }

    /// Save to the store root.
    pub fn save(&mut self) -> Result<SaveSummary, TemplateStoreError> {
        let root = self.root.clone().ok_or(TemplateStoreError::NoRoot)?;
        let summary = self.save_to(&root)?;
        self.dirty = false;
        Ok(summary)
    }

    /// Write every template under `root`, removing files of templates that
    /// no longer exist in memory.
    pub fn save_to(&self, root: &Path) -> Result<SaveSummary, TemplateStoreError> {
        let confirmed_dir = root.join(CONFIRMED_DIR);
        let provisional_dir = root.join(PROVISIONAL_DIR);
        fs::create_dir_all(&confirmed_dir)?;
        fs::create_dir_all(&provisional_dir)?;

        let mut summary = SaveSummary::default();

        for t in self.confirmed.values() {
            let stem = t.card.to_string();
            write_png(&confirmed_dir.join(format!("{stem}.png")), &t.image, &stem)?;
            write_json(&confirmed_dir.join(format!("{stem}.json")), &t.meta())?;
            summary.confirmed += 1;
        }

        for t in self.provisional.values() {
            let stem = t.id.to_string();
            write_png(&provisional_dir.join(format!("{stem}.png")), &t.image, &stem)?;
            write_json(&provisional_dir.join(format!("{stem}.json")), &t.meta())?;
            summary.provisional += 1;
        }

        summary.removed += remove_stale(&confirmed_dir, |stem| {
            stem.parse::<Card>()
                .map(|c| self.confirmed.contains_key(&c))
                .unwrap_or(false)
        })?;
        summary.removed += remove_stale(&provisional_dir, |stem| {
            stem.parse::<u64>()
                .map(|id| self.provisional.contains_key(&id))
                .unwrap_or(false)
        })?;

        log::debug!(
            "saved {} confirmed / {} provisional templates to {} ({} stale files removed)",
            summary.confirmed,
            summary.provisional,
            root.display(),
            summary.removed
        );
        Ok(summary)
    }

    fn load_from(&mut self, root: &Path) -> Result<(), TemplateStoreError> {
        let confirmed_dir = root.join(CONFIRMED_DIR);
        for meta_path in json_files(&confirmed_dir)? {
            let meta: ConfirmedMeta = read_json(&meta_path)?;
            if file_stem(&meta_path) != Some(meta.card.to_string()) {
                return Err(TemplateStoreError::NameMismatch { path: meta_path });
            }
            let image = read_png(&meta_path.with_extension("png"), meta.width, meta.height)?;
            self.confirmed.insert(
                meta.card,
                CardTemplate {
                    card: meta.card,
                    image,
                    history: meta.history,
                    observations: meta.observations,
                    last_seen: meta.last_seen,
                },
            );
        }

        let provisional_dir = root.join(PROVISIONAL_DIR);
        for meta_path in json_files(&provisional_dir)? {
            let meta: ProvisionalMeta = read_json(&meta_path)?;
            if file_stem(&meta_path) != Some(meta.id.to_string()) {
                return Err(TemplateStoreError::NameMismatch { path: meta_path });
            }
            let image = read_png(&meta_path.with_extension("png"), meta.width, meta.height)?;
            self.next_provisional_id = self.next_provisional_id.max(meta.id + 1);
            self.provisional.insert(
                meta.id,
                ProvisionalTemplate {
                    id: meta.id,
                    image,
                    hash: meta.hash,
                    history: meta.history,
                    observations: meta.observations,
                    first_seen: meta.first_seen,
                    last_seen: meta.last_seen,
                },
            );
        }

        self.dirty = false;
        Ok(())
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, TemplateStoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn remove_stale(
    dir: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<usize, TemplateStoreError> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if !matches!(ext, Some("png") | Some("json")) {
            continue;
        }
        let Some(stem) = file_stem(&path) else {
            continue;
        };
        if !keep(&stem) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write through a temporary file so a crash never leaves a truncated file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TemplateStoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), TemplateStoreError> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TemplateStoreError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_png(path: &Path, img: &GrayImage, what: &str) -> Result<(), TemplateStoreError> {
    let luma = img.to_luma().ok_or_else(|| TemplateStoreError::InvalidRaster {
        what: what.to_string(),
    })?;
    let mut bytes = Vec::new();
    luma.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    write_atomic(path, &bytes)
}

fn read_png(path: &Path, width: usize, height: usize) -> Result<GrayImage, TemplateStoreError> {
    let luma = image::open(path)?.to_luma8();
    let img = GrayImage::from_luma(&luma);
    if img.width != width || img.height != height {
        return Err(TemplateStoreError::DimensionMismatch {
            path: path.to_path_buf(),
            got_w: img.width,
            got_h: img.height,
            want_w: width,
            want_h: height,
        });
    }
    Ok(img)
}
