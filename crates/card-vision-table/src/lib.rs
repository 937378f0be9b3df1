//! Poker table reading.
//!
//! Current focus:
//! - table presence by felt color mass and proportional region layout,
//! - card slot normalization (grayscale, Otsu, polarity),
//! - matching against a [`TemplateStore`](card_vision_match::TemplateStore)
//!   with a red/black color prior,
//! - confidence gating and per-frame sanity rules,
//! - adaptive learning of unknown cards,
//! - assembly of an immutable [`GameStateSnapshot`].
//!
//! Template storage and matching live in `card-vision-match`.

mod assembler;
mod gate;
mod learner;
mod locator;
mod preprocess;
mod profile;
mod reader;

pub use assembler::{
    ExternalAmounts, GameStateAssembler, GameStateSnapshot, ReadIssue, RecognizedCard,
    SnapshotRecord, Street,
};
pub use gate::{
    ConfidenceGate, GateDecision, GateParams, SanityViolation, MAX_BOARD_CARDS, MAX_HERO_CARDS,
};
pub use learner::{blend, AdaptiveLearner, LearnError, LearnOutcome, LearnerParams, Promotion};
pub use locator::{slot_rects, LocatedRegion, RegionLocator, TableLocation};
pub use preprocess::{ImagePreprocessor, Preprocessed};
pub use profile::{
    NamedRegion, PlatformProfile, ProfileError, RegionRole, RegionSpec, TableParams, Theme,
};
pub use reader::{SlotOutcome, SlotReading, TableReader, TableReading};
