//! Game-state snapshots and their flat record form.

use std::fmt;

use card_vision_core::{Card, PixelRect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::SanityViolation;
use crate::profile::RegionRole;

/// Betting round implied by the number of board cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    /// 1, 2 or more than 5 board cards: not a street, never rounded to one.
    Indeterminate,
}

impl Street {
    pub fn from_board_count(count: usize) -> Self {
        match count {
            0 => Self::Preflop,
            3 => Self::Flop,
            4 => Self::Turn,
            5 => Self::River,
            _ => Self::Indeterminate,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Indeterminate => "indeterminate",
        })
    }
}

/// Why a snapshot is invalid.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadIssue {
    #[error("table not found")]
    TableNotFound,
    #[error("card {card} recognized more than once")]
    DuplicateCard { card: Card },
    #[error("{count} cards in {role} region, at most {max} allowed")]
    TooManyCards {
        role: RegionRole,
        count: usize,
        max: usize,
    },
    #[error("no hero cards recognized")]
    NoHeroCards,
    #[error("only {found} of 2 hero cards recognized")]
    IncompleteHeroCards { found: usize },
    /// Rebuilt from a record marked invalid without a reason.
    #[error("invalid, reason not recorded")]
    Unspecified,
}

impl From<SanityViolation> for ReadIssue {
    fn from(v: SanityViolation) -> Self {
        match v {
            SanityViolation::DuplicateCard { card } => Self::DuplicateCard { card },
            SanityViolation::TooManyCards { role, count, max } => {
                Self::TooManyCards { role, count, max }
            }
        }
    }
}

/// One accepted card.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognizedCard {
    pub card: Card,
    /// Slot position in frame pixels.
    pub rect: PixelRect,
    /// Match score clamped to `[0, 1]`.
    pub confidence: f32,
    /// The exact suit was a close call between two same-colored suits.
    pub ambiguous: bool,
}

/// Pot and stack values read by an external text reader. Opaque here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalAmounts {
    pub pot: Option<f64>,
    pub hero_stack: Option<f64>,
}

/// Everything one cycle learned about the table. Immutable once assembled.
#[derive(Clone, Debug, PartialEq)]
pub struct GameStateSnapshot {
    hero: Vec<RecognizedCard>,
    board: Vec<RecognizedCard>,
    street: Street,
    amounts: ExternalAmounts,
    issue: Option<ReadIssue>,
    captured_at: DateTime<Utc>,
}

impl GameStateSnapshot {
    pub fn hero(&self) -> &[RecognizedCard] {
        &self.hero
    }

    pub fn board(&self) -> &[RecognizedCard] {
        &self.board
    }

    pub fn hero_cards(&self) -> Vec<Card> {
        self.hero.iter().map(|c| c.card).collect()
    }

    pub fn board_cards(&self) -> Vec<Card> {
        self.board.iter().map(|c| c.card).collect()
    }

    pub fn street(&self) -> Street {
        self.street
    }

    pub fn amounts(&self) -> ExternalAmounts {
        self.amounts
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.issue.is_none()
    }

    pub fn issue(&self) -> Option<&ReadIssue> {
        self.issue.as_ref()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Flat record for downstream consumers.
    pub fn to_record(&self) -> SnapshotRecord {
        SnapshotRecord {
            hero_cards: self.hero_cards(),
            board_cards: self.board_cards(),
            hero_confidence: self.hero.iter().map(|c| c.confidence).collect(),
            board_confidence: self.board.iter().map(|c| c.confidence).collect(),
            street: self.street,
            valid: self.is_valid(),
            invalid_reason: self.issue.clone(),
            pot: self.amounts.pot,
            hero_stack: self.amounts.hero_stack,
            captured_at: self.captured_at,
        }
    }

    /// Rebuild a snapshot from its record.
    ///
    /// Slot positions and ambiguity flags are not part of the record; they
    /// come back as empty rectangles and `false`. Missing confidences read
    /// as `1.0`. The street is derived again from the board, so a record
    /// claiming otherwise cannot produce an inconsistent snapshot.
    pub fn from_record(record: &SnapshotRecord) -> Self {
        fn cards(cards: &[Card], confidence: &[f32]) -> Vec<RecognizedCard> {
            cards
                .iter()
                .enumerate()
                .map(|(i, &card)| RecognizedCard {
                    card,
                    rect: PixelRect::new(0, 0, 0, 0),
                    confidence: confidence.get(i).copied().unwrap_or(1.0),
                    ambiguous: false,
                })
                .collect()
        }
        let issue = match (&record.invalid_reason, record.valid) {
            (Some(issue), _) => Some(issue.clone()),
            (None, true) => None,
            (None, false) => Some(ReadIssue::Unspecified),
        };
        Self {
            hero: cards(&record.hero_cards, &record.hero_confidence),
            board: cards(&record.board_cards, &record.board_confidence),
            street: Street::from_board_count(record.board_cards.len()),
            amounts: ExternalAmounts {
                pot: record.pot,
                hero_stack: record.hero_stack,
            },
            issue,
            captured_at: record.captured_at,
        }
    }
}

/// Flat, serializable form of a [`GameStateSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub hero_cards: Vec<Card>,
    pub board_cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hero_confidence: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub board_confidence: Vec<f32>,
    pub street: Street,
    pub valid: bool,
    #[serde(default)]
    pub invalid_reason: Option<ReadIssue>,
    #[serde(default)]
    pub pot: Option<f64>,
    #[serde(default)]
    pub hero_stack: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

/// Combines accepted cards into a snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct GameStateAssembler;

impl GameStateAssembler {
    /// Build the snapshot for one cycle.
    ///
    /// `rejection` is the reason the frame was discarded upstream (table not
    /// found, sanity violation). Cards of a rejected frame are dropped: a
    /// discarded frame is never partially trusted.
    pub fn assemble(
        hero: Vec<RecognizedCard>,
        board: Vec<RecognizedCard>,
        rejection: Option<ReadIssue>,
        amounts: ExternalAmounts,
        captured_at: DateTime<Utc>,
    ) -> GameStateSnapshot {
        Self::assemble_partial(hero, board, 0, rejection, amounts, captured_at)
    }

    /// Like [`assemble`](Self::assemble), with `unread_board` board slots
    /// that showed a card face but produced no accepted card.
    ///
    /// Any unread board card makes the street indeterminate: the board
    /// count is unknown, so it is never rounded down to an earlier street.
    pub fn assemble_partial(
        hero: Vec<RecognizedCard>,
        board: Vec<RecognizedCard>,
        unread_board: usize,
        rejection: Option<ReadIssue>,
        amounts: ExternalAmounts,
        captured_at: DateTime<Utc>,
    ) -> GameStateSnapshot {
        if let Some(issue) = rejection {
            return Self::invalid(issue, amounts, captured_at);
        }
        let issue = match hero.len() {
            0 => Some(ReadIssue::NoHeroCards),
            1 => Some(ReadIssue::IncompleteHeroCards { found: 1 }),
            _ => None,
        };
        let street = if unread_board > 0 {
            log::debug!(
                "{unread_board} unread board card(s) next to {} recognized: street indeterminate",
                board.len()
            );
            Street::Indeterminate
        } else {
            Street::from_board_count(board.len())
        };
        GameStateSnapshot {
            street,
            hero,
            board,
            amounts,
            issue,
            captured_at,
        }
    }

    /// An invalid snapshot with no cards.
    pub fn invalid(
        issue: ReadIssue,
        amounts: ExternalAmounts,
        captured_at: DateTime<Utc>,
    ) -> GameStateSnapshot {
        GameStateSnapshot {
            hero: Vec::new(),
            board: Vec::new(),
            street: Street::Indeterminate,
            amounts,
            issue: Some(issue),
            captured_at,
        }
    }
}
