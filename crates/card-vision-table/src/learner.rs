//! Adaptive template learning.
//!
//! Every card slot moves through `Unknown -> Provisional -> Confirmed`:
//!
//! - a crop unlike anything in the library becomes a provisional template,
//!   unless it duplicates one already waiting (close perceptual hash *and*
//!   high NCC);
//! - a provisional template is promoted once something outside the pipeline
//!   supplies its label ([`AdaptiveLearner::confirm`]);
//! - confirmed templates are refined by blending in accepted observations,
//!   weighted towards the stored image.

use card_vision_core::{resize_bilinear, Card, GrayImage};
use card_vision_match::{
    hash_distance, perceptual_hash, score_against, CardTemplate, SaveSummary, TemplateStore,
    TemplateStoreError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum LearnError {
    #[error("no provisional template with id {0}")]
    UnknownProvisional(u64),
    #[error(transparent)]
    Store(#[from] TemplateStoreError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerParams {
    /// Store unknown crops as provisional templates and refine confirmed ones.
    pub enabled: bool,
    /// Weight of a new observation when blending (the stored image keeps `1 - w`).
    pub blend_weight: f32,
    /// Largest perceptual-hash distance for two crops to be the same card.
    pub max_hash_distance: u32,
    /// Smallest NCC for two crops to be the same card.
    pub dedup_similarity: f32,
}

impl Default for LearnerParams {
    fn default() -> Self {
        Self {
            enabled: true,
            blend_weight: 0.3,
            max_hash_distance: 8,
            dedup_similarity: 0.9,
        }
    }
}

/// What happened to an unknown crop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LearnOutcome {
    Created(u64),
    Duplicate(u64),
    /// Learning is turned off or the crop could not be hashed.
    Ignored,
}

impl LearnOutcome {
    pub fn provisional_id(self) -> Option<u64> {
        match self {
            Self::Created(id) | Self::Duplicate(id) => Some(id),
            Self::Ignored => None,
        }
    }
}

/// How a label was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Promotion {
    /// The provisional image became the card's template.
    Promoted,
    /// The card already had a template; the provisional image was blended in.
    Merged,
}

/// Per-pixel `round((1 - w) * stored + w * observed)`, with `observed`
/// resampled to the stored size. `None` if either raster is malformed.
pub fn blend(stored: &GrayImage, observed: &GrayImage, weight: f32) -> Option<GrayImage> {
    let sview = card_vision_core::GrayImageView::new(stored.width, stored.height, &stored.data)?;
    let oview =
        card_vision_core::GrayImageView::new(observed.width, observed.height, &observed.data)?;
    let resized = resize_bilinear(&oview, sview.width, sview.height)?;
    let w = weight.clamp(0.0, 1.0);
    let data = sview
        .data
        .iter()
        .zip(&resized.data)
        .map(|(&s, &o)| ((1.0 - w) * s as f32 + w * o as f32).round().clamp(0.0, 255.0) as u8)
        .collect();
    Some(GrayImage {
        width: sview.width,
        height: sview.height,
        data,
    })
}

#[derive(Clone, Debug, Default)]
pub struct AdaptiveLearner {
    params: LearnerParams,
}

impl AdaptiveLearner {
    pub fn new(params: LearnerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LearnerParams {
        &self.params
    }

    /// Record a crop that nothing in the library resembles.
    ///
    /// `score` is the best library score, if any; it seeds the provisional
    /// confidence history.
    pub fn observe_unknown(
        &self,
        store: &mut TemplateStore,
        crop: &GrayImage,
        score: Option<f32>,
        seen_at: DateTime<Utc>,
    ) -> LearnOutcome {
        if !self.params.enabled {
            return LearnOutcome::Ignored;
        }
        let Some(hash) = perceptual_hash(crop) else {
            log::warn!("cannot hash {}x{} crop", crop.width, crop.height);
            return LearnOutcome::Ignored;
        };
        let confidence = score.unwrap_or(0.0).max(0.0);

        if let Some(id) = self.find_duplicate(store, crop, &hash) {
            if let Some(p) = store.get_provisional_mut(id) {
                p.observations += 1;
                p.last_seen = seen_at;
                p.history.push(confidence);
                log::debug!("crop matches provisional #{id} ({} sightings)", p.observations);
            }
            return LearnOutcome::Duplicate(id);
        }

        let id = store.insert_provisional(crop.clone(), hash, confidence, seen_at);
        log::info!(
            "new provisional template #{id} ({}x{}, best score {:.3})",
            crop.width,
            crop.height,
            confidence
        );
        LearnOutcome::Created(id)
    }

    fn find_duplicate(&self, store: &TemplateStore, crop: &GrayImage, hash: &str) -> Option<u64> {
        let view = crop.view();
        store
            .provisional()
            .filter_map(|p| {
                let d = hash_distance(hash, &p.hash);
                if d > self.params.max_hash_distance {
                    return None;
                }
                let s = score_against(&view, &p.image)?;
                (s >= self.params.dedup_similarity).then_some((d, p.id))
            })
            .min()
            .map(|(_, id)| id)
    }

    /// Blend an accepted observation into the confirmed template for `card`
    /// and record its score. Callers only pass scores that cleared the
    /// acceptance threshold.
    ///
    /// Returns `false` if there is no such template or the blend failed.
    pub fn refine(
        &self,
        store: &mut TemplateStore,
        card: Card,
        crop: &GrayImage,
        score: f32,
        seen_at: DateTime<Utc>,
    ) -> bool {
        if !self.params.enabled {
            return false;
        }
        let weight = self.params.blend_weight;
        let Some(t) = store.get_mut(card) else {
            return false;
        };
        let Some(blended) = blend(&t.image, crop, weight) else {
            log::warn!("cannot blend observation into template {card}");
            return false;
        };
        t.image = blended;
        t.history.push(score);
        t.observations += 1;
        t.last_seen = seen_at;
        log::debug!(
            "refined {card}: score {score:.3}, average {:.3} over {} observations",
            t.average_confidence(),
            t.observations
        );
        true
    }

    /// Label provisional template `id` as `card`.
    pub fn confirm(
        &self,
        store: &mut TemplateStore,
        id: u64,
        card: Card,
    ) -> Result<Promotion, LearnError> {
        let p = store
            .take_provisional(id)
            .ok_or(LearnError::UnknownProvisional(id))?;

        let weight = self.params.blend_weight;
        if let Some(t) = store.get_mut(card) {
            if let Some(blended) = blend(&t.image, &p.image, weight) {
                t.image = blended;
            }
            for s in p.history.scores() {
                t.history.push(s);
            }
            t.observations += p.observations;
            t.last_seen = t.last_seen.max(p.last_seen);
            log::info!("provisional #{id} merged into existing template {card}");
            return Ok(Promotion::Merged);
        }

        store.insert_confirmed(CardTemplate {
            card,
            image: p.image,
            history: p.history,
            observations: p.observations,
            last_seen: p.last_seen,
        });
        log::info!("provisional #{id} promoted to {card}");
        Ok(Promotion::Promoted)
    }

    /// Label provisional `id` when exactly one of `candidates` is not in
    /// `known` (cards already visible elsewhere or already templated).
    ///
    /// Returns the label applied, or `None` when the choice is still open.
    pub fn resolve_by_elimination(
        &self,
        store: &mut TemplateStore,
        id: u64,
        candidates: &[Card],
        known: &[Card],
    ) -> Result<Option<Card>, LearnError> {
        if store.get_provisional(id).is_none() {
            return Err(LearnError::UnknownProvisional(id));
        }
        let mut remaining = candidates.iter().filter(|c| !known.contains(c));
        match (remaining.next(), remaining.next()) {
            (Some(&card), None) => {
                self.confirm(store, id, card)?;
                Ok(Some(card))
            }
            _ => Ok(None),
        }
    }

    /// Persist the store if anything changed since the last save.
    pub fn flush(&self, store: &mut TemplateStore) -> Result<Option<SaveSummary>, LearnError> {
        if !store.is_dirty() {
            return Ok(None);
        }
        Ok(Some(store.save()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use card_vision_core::{Rank, Suit};

    fn glyph(seed: usize) -> GrayImage {
        GrayImage::from_fn(30, 42, |x, y| {
            if (x / 3 * (seed + 2) + y / 3 * (seed + 5)) % 7 < 2 {
                255
            } else {
                0
            }
        })
    }

    const KC: Card = Card::new(Rank::King, Suit::Clubs);

    #[test]
    fn blend_is_weighted_towards_stored() {
        let stored = GrayImage::from_fn(4, 4, |_, _| 200);
        let observed = GrayImage::from_fn(4, 4, |_, _| 100);
        let out = blend(&stored, &observed, 0.3).unwrap();
        assert!(out.data.iter().all(|&v| v == 170));
    }

    #[test]
    fn blend_resizes_observation() {
        let stored = GrayImage::from_fn(4, 4, |_, _| 0);
        let observed = GrayImage::from_fn(9, 7, |_, _| 255);
        let out = blend(&stored, &observed, 0.3).unwrap();
        assert_eq!((out.width, out.height), (4, 4));
        assert!(out.data.iter().all(|&v| v == 77));
    }

    #[test]
    fn unknown_crop_becomes_provisional_once() {
        let learner = AdaptiveLearner::default();
        let mut store = TemplateStore::new();
        let now = Utc::now();
        let a = learner.observe_unknown(&mut store, &glyph(1), Some(0.2), now);
        let b = learner.observe_unknown(&mut store, &glyph(1), None, now);
        assert_eq!(a, LearnOutcome::Created(0));
        assert_eq!(b, LearnOutcome::Duplicate(0));
        assert_eq!(store.provisional_len(), 1);
        assert_eq!(store.get_provisional(0).unwrap().observations, 2);

        let c = learner.observe_unknown(&mut store, &glyph(4), None, now);
        assert_eq!(c, LearnOutcome::Created(1));
    }

    #[test]
    fn disabled_learner_does_nothing() {
        let learner = AdaptiveLearner::new(LearnerParams {
            enabled: false,
            ..LearnerParams::default()
        });
        let mut store = TemplateStore::new();
        assert_eq!(
            learner.observe_unknown(&mut store, &glyph(1), None, Utc::now()),
            LearnOutcome::Ignored
        );
        assert_eq!(store.provisional_len(), 0);
    }

    #[test]
    fn confirm_promotes_and_then_merges() {
        let learner = AdaptiveLearner::default();
        let mut store = TemplateStore::new();
        let now = Utc::now();
        let id = learner
            .observe_unknown(&mut store, &glyph(2), Some(0.1), now)
            .provisional_id()
            .unwrap();
        assert_eq!(learner.confirm(&mut store, id, KC).unwrap(), Promotion::Promoted);
        assert_eq!(store.get(KC).unwrap().image, glyph(2));

        let id2 = learner
            .observe_unknown(&mut store, &glyph(3), Some(0.1), now)
            .provisional_id()
            .unwrap();
        assert_eq!(learner.confirm(&mut store, id2, KC).unwrap(), Promotion::Merged);
        assert_eq!(store.len(), 1);
        assert_eq!(store.provisional_len(), 0);
        assert_eq!(store.get(KC).unwrap().observations, 2);

        assert!(matches!(
            learner.confirm(&mut store, 99, KC),
            Err(LearnError::UnknownProvisional(99))
        ));
    }

    #[test]
    fn refinement_moves_average_toward_accepted_score() {
        let learner = AdaptiveLearner::default();
        let mut store = TemplateStore::new();
        let now = Utc::now();
        store.insert_confirmed(CardTemplate::new(KC, glyph(2), 0.3, now));
        for score in [0.95, 0.9, 0.85, 0.99] {
            let before = store.get(KC).unwrap().average_confidence();
            assert!(learner.refine(&mut store, KC, &glyph(2), score, now));
            let after = store.get(KC).unwrap().average_confidence();
            assert!(
                (score - after).abs() < (score - before).abs(),
                "{before} -> {after} for {score}"
            );
        }
        assert_eq!(store.get(KC).unwrap().observations, 5);
        // Same image blended into itself stays put.
        assert_eq!(store.get(KC).unwrap().image, glyph(2));
    }

    #[test]
    fn refine_unknown_card_is_a_no_op() {
        let learner = AdaptiveLearner::default();
        let mut store = TemplateStore::new();
        assert!(!learner.refine(&mut store, KC, &glyph(1), 0.9, Utc::now()));
    }

    #[test]
    fn elimination_needs_a_single_candidate() {
        let learner = AdaptiveLearner::default();
        let mut store = TemplateStore::new();
        let id = learner
            .observe_unknown(&mut store, &glyph(5), None, Utc::now())
            .provisional_id()
            .unwrap();
        let kd = Card::new(Rank::King, Suit::Diamonds);
        let kh = Card::new(Rank::King, Suit::Hearts);

        let open = learner
            .resolve_by_elimination(&mut store, id, &[kd, kh], &[])
            .unwrap();
        assert_eq!(open, None);

        let resolved = learner
            .resolve_by_elimination(&mut store, id, &[kd, kh], &[kh])
            .unwrap();
        assert_eq!(resolved, Some(kd));
        assert!(store.get(kd).is_some());
        assert_relative_eq!(store.get(kd).unwrap().average_confidence(), 0.0);
    }
}
