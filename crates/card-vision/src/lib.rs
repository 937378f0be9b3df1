//! High-level facade crate for the `card-vision-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the underlying crates,
//! - [`FrameSource`] implementations (still image, image directory,
//!   synthetic scenes, and primary-monitor capture behind the `capture`
//!   feature),
//! - a [`Session`] runner that reads one frame per cycle and persists learned
//!   templates every few hands,
//! - a synthetic table renderer for calibration and tests,
//! - the `card-vision` CLI (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use card_vision::{Frame, PlatformProfile, TableReader, TemplateStore};
//! use card_vision::table::ExternalAmounts;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::ImageReader::open("table.png")?.decode()?.to_rgb8();
//! let reader = TableReader::new(&PlatformProfile::classic())?;
//! let mut store = TemplateStore::open("templates")?;
//!
//! let snapshot = reader.read_snapshot(&Frame::now(img), &mut store, ExternalAmounts::default());
//! println!("{}", serde_json::to_string(&snapshot.to_record())?);
//! store.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `card_vision::core`: cards, frames, rasters, HSV, rectangles, logging.
//! - `card_vision::templates`: template store, matcher, suit color classifier.
//! - `card_vision::table`: profiles, locator, gate, learner, snapshots, reader.

pub use card_vision_core as core;
pub use card_vision_match as templates;
pub use card_vision_table as table;

pub use card_vision_core::{Card, Frame, Rank, Suit, SuitColor};
pub use card_vision_match::{TemplateMatcher, TemplateStore};
pub use card_vision_table::{
    GameStateSnapshot, PlatformProfile, SnapshotRecord, Street, TableReader,
};

pub mod config;
pub mod session;
pub mod source;
pub mod synthetic;

pub use config::{AppConfig, ConfigError, SourceConfig};
pub use session::{AmountReader, NoAmounts, Session, SessionConfig, SessionStats};
pub use source::{
    DirectorySource, FrameSource, RateLimitedSource, SourceError, StillSource, SyntheticSource,
};

#[cfg(feature = "capture")]
pub use source::ScreenSource;

/// Install a `tracing` subscriber and route `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    card_vision_core::init_tracing(json);
    // No-op when the subscriber already installed the bridge.
    let _ = tracing_log::LogTracer::init();
}
