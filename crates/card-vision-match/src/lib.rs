//! Card template library and matching.
//!
//! - [`TemplateStore`] owns every known template, confirmed (labeled with a
//!   [`Card`](card_vision_core::Card)) or provisional (unlabeled), and
//!   persists them as PNG + JSON sidecar files.
//! - [`TemplateMatcher`] scores a normalized crop against every confirmed
//!   template with zero-mean normalized cross-correlation.
//! - [`SuitColorClassifier`] gives a red/black prior from HSV pixel ratios.
//!
//! ```no_run
//! use card_vision_match::{TemplateMatcher, TemplateStore};
//! use card_vision_core::GrayImage;
//!
//! let store = TemplateStore::open("templates").unwrap();
//! let crop = GrayImage::new(40, 56);
//! if let Some(m) = TemplateMatcher::default().best_match(&crop.view(), &store, None) {
//!     println!("{} ({:.2})", m.card, m.score);
//! }
//! ```

mod color;
mod hash;
mod history;
mod matcher;
mod ncc;
mod store;
mod template;

pub use color::{SuitColorClassifier, SuitColorParams, SuitColorReading, CLASSIC_RED_RANGES};
pub use hash::{hash_distance, perceptual_hash};
pub use history::{ConfidenceHistory, DEFAULT_HISTORY_WINDOW};
pub use matcher::{Candidate, MatchParams, TemplateMatch, TemplateMatcher};
pub use ncc::{ncc, score_against};
pub use store::{SaveSummary, TemplateStore, TemplateStoreError};
pub use template::{CardTemplate, ProvisionalTemplate};
