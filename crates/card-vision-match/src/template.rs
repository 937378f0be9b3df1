//! Template records held by the [`TemplateStore`](crate::TemplateStore).

use card_vision_core::{Card, GrayImage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::ConfidenceHistory;

/// A labeled card template: canonical grayscale image plus learning metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct CardTemplate {
    pub card: Card,
    pub image: GrayImage,
    pub history: ConfidenceHistory,
    pub observations: u64,
    pub last_seen: DateTime<Utc>,
}

impl CardTemplate {
    pub fn new(card: Card, image: GrayImage, confidence: f32, seen_at: DateTime<Utc>) -> Self {
        Self {
            card,
            image,
            history: ConfidenceHistory::seeded(crate::DEFAULT_HISTORY_WINDOW, confidence),
            observations: 1,
            last_seen: seen_at,
        }
    }

    #[inline]
    pub fn average_confidence(&self) -> f32 {
        self.history.average()
    }

    pub(crate) fn meta(&self) -> ConfirmedMeta {
        ConfirmedMeta {
            card: self.card,
            width: self.image.width,
            height: self.image.height,
            history: self.history.clone(),
            observations: self.observations,
            last_seen: self.last_seen,
        }
    }
}

/// An unlabeled card image awaiting identification.
#[derive(Clone, Debug, PartialEq)]
pub struct ProvisionalTemplate {
    pub id: u64,
    pub image: GrayImage,
    /// Perceptual hash of `image` (base64), used to deduplicate observations.
    pub hash: String,
    pub history: ConfidenceHistory,
    pub observations: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl ProvisionalTemplate {
    pub(crate) fn meta(&self) -> ProvisionalMeta {
        ProvisionalMeta {
            id: self.id,
            hash: self.hash.clone(),
            width: self.image.width,
            height: self.image.height,
            history: self.history.clone(),
            observations: self.observations,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
        }
    }
}

/// Sidecar metadata stored next to a confirmed template image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ConfirmedMeta {
    pub card: Card,
    pub width: usize,
    pub height: usize,
    pub history: ConfidenceHistory,
    pub observations: u64,
    pub last_seen: DateTime<Utc>,
}

/// Sidecar metadata stored next to a provisional template image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProvisionalMeta {
    pub id: u64,
    pub hash: String,
    pub width: usize,
    pub height: usize,
    pub history: ConfidenceHistory,
    pub observations: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}
