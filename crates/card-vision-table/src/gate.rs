//! Score thresholds and per-frame sanity rules.

use std::collections::HashSet;

use card_vision_core::Card;
use serde::{Deserialize, Serialize};

use crate::profile::RegionRole;

/// Most cards a hero region can hold.
pub const MAX_HERO_CARDS: usize = 2;
/// Most cards a board region can hold.
pub const MAX_BOARD_CARDS: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateParams {
    /// Minimum NCC score for a label to be trusted.
    pub accept_threshold: f32,
    /// Below this score nothing in the library resembles the crop and it is
    /// handed to the learner as a new provisional template.
    pub bootstrap_threshold: f32,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            accept_threshold: 0.80,
            bootstrap_threshold: 0.60,
        }
    }
}

/// Reason a whole frame's recognition is discarded.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SanityViolation {
    #[error("card {card} recognized more than once")]
    DuplicateCard { card: Card },
    #[error("{count} cards in {role} region, at most {max} allowed")]
    TooManyCards {
        role: RegionRole,
        count: usize,
        max: usize,
    },
}

/// Decision for a single score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    /// Similar to something known, but not enough to trust.
    Reject,
    /// Unlike anything known.
    Unknown,
}

#[derive(Clone, Debug, Default)]
pub struct ConfidenceGate {
    params: GateParams,
}

impl ConfidenceGate {
    pub fn new(params: GateParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GateParams {
        &self.params
    }

    #[inline]
    pub fn accept(&self, score: f32) -> bool {
        score.is_finite() && score >= self.params.accept_threshold
    }

    /// Classify a best-match score; `None` means the library was empty.
    pub fn decide(&self, score: Option<f32>) -> GateDecision {
        match score {
            Some(s) if self.accept(s) => GateDecision::Accept,
            Some(s) if s.is_finite() && s >= self.params.bootstrap_threshold => {
                GateDecision::Reject
            }
            _ => GateDecision::Unknown,
        }
    }

    /// Sanity pass over every accepted card of one frame.
    ///
    /// Duplicates are checked across all regions, since a card can only be
    /// in one place at a time.
    pub fn check_frame(&self, hero: &[Card], board: &[Card]) -> Result<(), SanityViolation> {
        if hero.len() > MAX_HERO_CARDS {
            return Err(SanityViolation::TooManyCards {
                role: RegionRole::HeroCards,
                count: hero.len(),
                max: MAX_HERO_CARDS,
            });
        }
        if board.len() > MAX_BOARD_CARDS {
            return Err(SanityViolation::TooManyCards {
                role: RegionRole::BoardCards,
                count: board.len(),
                max: MAX_BOARD_CARDS,
            });
        }
        let mut seen = HashSet::with_capacity(hero.len() + board.len());
        for &card in hero.iter().chain(board) {
            if !seen.insert(card) {
                return Err(SanityViolation::DuplicateCard { card });
            }
        }
        Ok(())
    }
}
