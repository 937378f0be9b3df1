//! Library matching by normalized cross-correlation.

use card_vision_core::{Card, GrayImageView, SuitColor};
use serde::{Deserialize, Serialize};

use crate::ncc::score_against;
use crate::store::TemplateStore;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Scores closer than this are treated as a tie.
    pub tie_margin: f32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self { tie_margin: 0.03 }
    }
}

/// One scored library entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub card: Card,
    pub score: f32,
}

/// Best label for a crop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateMatch {
    pub card: Card,
    /// NCC score in `[-1, 1]`.
    pub score: f32,
    pub runner_up: Option<Candidate>,
    /// Best and runner-up share a color family, differ in suit, and are
    /// within the tie margin: the exact suit is a guess.
    pub ambiguous: bool,
    /// The chosen label disagrees with the supplied color prior.
    pub color_conflict: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TemplateMatcher {
    params: MatchParams,
}

impl TemplateMatcher {
    pub fn new(params: MatchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    /// Score every confirmed template, best first.
    ///
    /// Templates that cannot be scored (corrupt raster) are logged and
    /// skipped. Ties in score are ordered by card, so the result is fully
    /// deterministic for a given store.
    pub fn score_all(&self, crop: &GrayImageView<'_>, store: &TemplateStore) -> Vec<Candidate> {
        let mut out = Vec::with_capacity(store.len());
        for t in store.confirmed() {
            match score_against(crop, &t.image) {
                Some(score) if score.is_finite() => out.push(Candidate {
                    card: t.card,
                    score,
                }),
                _ => log::warn!(
                    "skipping template {} ({}x{}, {} bytes): cannot score",
                    t.card,
                    t.image.width,
                    t.image.height,
                    t.image.data.len()
                ),
            }
        }
        out.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.card.cmp(&b.card)));
        out
    }

    /// Best label for `crop`, or `None` if nothing in the store could be scored.
    ///
    /// With a color `prior`, a candidate of that color replaces a best
    /// candidate of the other color when it scores within the tie margin.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, crop, store), fields(templates = store.len()))
    )]
    pub fn best_match(
        &self,
        crop: &GrayImageView<'_>,
        store: &TemplateStore,
        prior: Option<SuitColor>,
    ) -> Option<TemplateMatch> {
        let candidates = self.score_all(crop, store);
        let top = *candidates.first()?;
        let margin = self.params.tie_margin.max(0.0);

        let best = match prior {
            Some(color) if top.card.color() != color => candidates
                .iter()
                .take_while(|c| top.score - c.score <= margin)
                .find(|c| c.card.color() == color)
                .copied()
                .unwrap_or(top),
            _ => top,
        };

        let runner_up = candidates.iter().find(|c| c.card != best.card).copied();
        let ambiguous = runner_up.is_some_and(|r| {
            r.card.color() == best.card.color()
                && r.card.suit != best.card.suit
                && (best.score - r.score).abs() <= margin
        });
        let color_conflict = prior.is_some_and(|c| c != best.card.color());

        Some(TemplateMatch {
            card: best.card,
            score: best.score,
            runner_up,
            ambiguous,
            color_conflict,
        })
    }
}
