//! Playing-card identity: rank, suit, and the suit's color family.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors produced while parsing card notation such as `"Qs"` or `"10h"`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CardParseError {
    #[error("invalid rank {0:?}")]
    Rank(String),
    #[error("invalid suit {0:?}")]
    Suit(String),
    #[error("card notation must be rank followed by suit, got {0:?}")]
    Format(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn to_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        let rank = match c.to_ascii_uppercase() {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return None,
        };
        Some(rank)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn to_char(self) -> char {
        match self {
            Suit::Clubs => 'c',
            Suit::Diamonds => 'd',
            Suit::Hearts => 'h',
            Suit::Spades => 's',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        let suit = match c.to_ascii_lowercase() {
            'c' => Suit::Clubs,
            'd' => Suit::Diamonds,
            'h' => Suit::Hearts,
            's' => Suit::Spades,
            _ => return None,
        };
        Some(suit)
    }

    /// Ink color family printed for this suit.
    pub fn color(self) -> SuitColor {
        match self {
            Suit::Hearts | Suit::Diamonds => SuitColor::Red,
            Suit::Clubs | Suit::Spades => SuitColor::Black,
        }
    }
}

/// Ink color family of a suit. Two suits share each family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuitColor {
    Red,
    Black,
}

/// A single card identity. Orders by rank, then suit.
///
/// Serialized as its two-character notation (`"Ah"`, `"Tc"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// All 52 cards, rank-major.
    pub fn deck() -> impl Iterator<Item = Card> {
        Rank::ALL
            .into_iter()
            .flat_map(|rank| Suit::ALL.into_iter().map(move |suit| Card { rank, suit }))
    }

    /// Stable index in `0..52`, matching the order of [`Card::deck`].
    pub fn index(self) -> usize {
        self.rank as usize * 4 + self.suit as usize
    }

    pub fn color(self) -> SuitColor {
        self.suit.color()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (rank_part, suit_part) = match s.char_indices().last() {
            Some((idx, _)) if idx > 0 => s.split_at(idx),
            _ => return Err(CardParseError::Format(s.to_string())),
        };

        let rank = if rank_part == "10" {
            Rank::Ten
        } else {
            let mut chars = rank_part.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    Rank::from_char(c).ok_or_else(|| CardParseError::Rank(rank_part.to_string()))?
                }
                _ => return Err(CardParseError::Rank(rank_part.to_string())),
            }
        };

        let suit = suit_part
            .chars()
            .next()
            .and_then(Suit::from_char)
            .ok_or_else(|| CardParseError::Suit(suit_part.to_string()))?;

        Ok(Card { rank, suit })
    }
}

impl TryFrom<String> for Card {
    type Error = CardParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.to_string()
    }
}

/// Parse a comma- or whitespace-separated card list (`"Ah,Kd"`, `"Qs Jc Th"`).
pub fn parse_cards(list: &str) -> Result<Vec<Card>, CardParseError> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_notation() {
        let card: Card = "Qs".parse().unwrap();
        assert_eq!(card, Card::new(Rank::Queen, Suit::Spades));
        assert_eq!(card.to_string(), "Qs");

        let ten: Card = "10h".parse().unwrap();
        assert_eq!(ten, Card::new(Rank::Ten, Suit::Hearts));
        assert_eq!(ten.to_string(), "Th");
    }

    #[test]
    fn rejects_malformed_notation() {
        assert!(matches!("Q".parse::<Card>(), Err(CardParseError::Format(_))));
        assert!(matches!("1s".parse::<Card>(), Err(CardParseError::Rank(_))));
        assert!(matches!("Qx".parse::<Card>(), Err(CardParseError::Suit(_))));
    }

    #[test]
    fn deck_indices_are_dense_and_unique() {
        let indices: Vec<usize> = Card::deck().map(Card::index).collect();
        assert_eq!(indices, (0..52).collect::<Vec<_>>());
    }

    #[test]
    fn suit_colors() {
        assert_eq!(Suit::Hearts.color(), SuitColor::Red);
        assert_eq!(Suit::Diamonds.color(), SuitColor::Red);
        assert_eq!(Suit::Clubs.color(), SuitColor::Black);
        assert_eq!(Suit::Spades.color(), SuitColor::Black);
    }

    #[test]
    fn serializes_as_notation() {
        let card = Card::new(Rank::Ace, Suit::Diamonds);
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(json, "\"Ad\"");
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn parses_card_lists() {
        let cards = parse_cards("Qs, Jc Th").unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[2].to_string(), "Th");
    }
}
