use card_vision_core::{fraction_in_ranges, Card, Frame, GrayImage, PixelRect};
use card_vision_match::{
    Candidate, SuitColorClassifier, SuitColorReading, TemplateMatcher, TemplateStore,
};

use super::{SlotOutcome, SlotReading, TableReading};
use crate::assembler::{ExternalAmounts, GameStateSnapshot, RecognizedCard};
use crate::gate::{ConfidenceGate, GateDecision};
use crate::learner::AdaptiveLearner;
use crate::locator::RegionLocator;
use crate::preprocess::{ImagePreprocessor, Preprocessed};
use crate::profile::{NamedRegion, PlatformProfile, ProfileError, RegionRole, Theme};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Reads one frame at a time against a shared template store.
#[derive(Clone, Debug)]
pub struct TableReader {
    regions: Vec<NamedRegion>,
    theme: Theme,
    locator: RegionLocator,
    classifier: SuitColorClassifier,
    matcher: TemplateMatcher,
    gate: ConfidenceGate,
    learner: AdaptiveLearner,
}

struct Refinement {
    card: Card,
    image: GrayImage,
    score: f32,
}

impl TableReader {
    /// Build a reader from a validated profile.
    pub fn new(profile: &PlatformProfile) -> Result<Self, ProfileError> {
        profile.validate()?;
        let theme = profile.theme()?.clone();
        Ok(Self {
            regions: profile.named_regions(),
            classifier: SuitColorClassifier::new(theme.suit_color_params()),
            theme,
            locator: RegionLocator::new(profile.table.clone()),
            matcher: TemplateMatcher::new(profile.matching.clone()),
            gate: ConfidenceGate::new(profile.gate.clone()),
            learner: AdaptiveLearner::new(profile.learner.clone()),
        })
    }

    #[inline]
    pub fn regions(&self) -> &[NamedRegion] {
        &self.regions
    }

    #[inline]
    pub fn locator(&self) -> &RegionLocator {
        &self.locator
    }

    #[inline]
    pub fn gate(&self) -> &ConfidenceGate {
        &self.gate
    }

    #[inline]
    pub fn learner(&self) -> &AdaptiveLearner {
        &self.learner
    }

    /// Read one frame.
    ///
    /// Never fails: a missing table or an inconsistent set of cards is
    /// reported through [`TableReading::rejection`]. Unknown cards are added
    /// to `store` as provisional templates; accepted cards refine their
    /// templates only when the frame passes the sanity check.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame, store), fields(w = frame.width(), h = frame.height()))
    )]
    pub fn read_frame(&self, frame: &Frame, store: &mut TemplateStore) -> TableReading {
        let captured_at = frame.captured_at;
        let Some(table) = self.locator.locate_table(frame) else {
            return TableReading::table_not_found(captured_at);
        };
        let regions = self.locator.locate_regions(frame, &table, &self.regions);

        let mut slots = Vec::new();
        let mut hero = Vec::new();
        let mut board = Vec::new();
        let mut pending = Vec::new();

        for region in &regions {
            if region.role.max_cards().is_none() {
                continue;
            }
            for (index, &rect) in region.slots.iter().enumerate() {
                let (color, outcome) = self.read_slot(frame, rect, store, &mut pending);
                if let SlotOutcome::Recognized(card) = &outcome {
                    match region.role {
                        RegionRole::HeroCards => hero.push(*card),
                        _ => board.push(*card),
                    }
                }
                slots.push(SlotReading {
                    region: region.name.clone(),
                    role: region.role,
                    index,
                    rect,
                    color,
                    outcome,
                });
            }
        }

        let hero_cards: Vec<Card> = hero.iter().map(|c| c.card).collect();
        let board_cards: Vec<Card> = board.iter().map(|c| c.card).collect();
        let rejection = match self.gate.check_frame(&hero_cards, &board_cards) {
            Ok(()) => None,
            Err(violation) => {
                log::debug!("frame rejected: {violation}");
                hero.clear();
                board.clear();
                Some(violation.into())
            }
        };

        let mut refinements = 0;
        if rejection.is_none() {
            for r in pending {
                if self
                    .learner
                    .refine(store, r.card, &r.image, r.score, captured_at)
                {
                    refinements += 1;
                }
            }
        }

        TableReading {
            captured_at,
            table: Some(table),
            regions,
            slots,
            hero,
            board,
            rejection,
            refinements,
        }
    }

    /// Read one frame and assemble its snapshot.
    pub fn read_snapshot(
        &self,
        frame: &Frame,
        store: &mut TemplateStore,
        amounts: ExternalAmounts,
    ) -> GameStateSnapshot {
        self.read_frame(frame, store).snapshot(amounts)
    }

    fn read_slot(
        &self,
        frame: &Frame,
        rect: PixelRect,
        store: &mut TemplateStore,
        pending: &mut Vec<Refinement>,
    ) -> (Option<SuitColorReading>, SlotOutcome) {
        let Some(crop) = frame.crop(&rect) else {
            return (None, SlotOutcome::Unreadable);
        };
        let face = fraction_in_ranges(&crop, std::slice::from_ref(&self.theme.card_face));
        if face < self.theme.min_face_fraction {
            return (None, SlotOutcome::Empty);
        }
        let Preprocessed::Binary(binary) = ImagePreprocessor::process(&crop) else {
            return (None, SlotOutcome::Unreadable);
        };

        let color = self.classifier.classify(&crop);
        let prior = color.filter(|c| c.confident).map(|c| c.color);
        let best = self.matcher.best_match(&binary.view(), store, prior);

        let outcome = match (self.gate.decide(best.map(|m| m.score)), best) {
            (GateDecision::Accept, Some(m)) => {
                if !m.ambiguous {
                    pending.push(Refinement {
                        card: m.card,
                        image: binary,
                        score: m.score,
                    });
                }
                SlotOutcome::Recognized(RecognizedCard {
                    card: m.card,
                    rect,
                    confidence: m.score.clamp(0.0, 1.0),
                    ambiguous: m.ambiguous,
                })
            }
            (GateDecision::Reject, Some(m)) => SlotOutcome::Rejected {
                best: Candidate {
                    card: m.card,
                    score: m.score,
                },
            },
            _ => SlotOutcome::Learned(self.learner.observe_unknown(
                store,
                &binary,
                best.map(|m| m.score),
                frame.captured_at,
            )),
        };
        (color, outcome)
    }
}
