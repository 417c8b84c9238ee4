//! Basic table vocabulary shared by every phase of a round.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seat position at the table (0-3). Turn order is always seat-ascending.
pub type Seat = u8;

/// Number of seats at a Whist table
pub const SEAT_COUNT: u8 = 4;

/// Tricks dealt per round; also the contract target sum
pub const TOTAL_TRICKS: u8 = 13;

/// Lowest trump bid before any frisch
pub const DEFAULT_MINIMUM_TRUMP_BID: u8 = 5;

/// Highest bid of any kind
pub const MAX_BID: u8 = 13;

/// All seats in turn order starting from seat 0
pub const ALL_SEATS: [Seat; 4] = [0, 1, 2, 3];

/// The seat that follows `seat`, wrapping around the table.
pub fn next_seat(seat: Seat) -> Seat {
    (seat + 1) % SEAT_COUNT
}

/// Whether `seat` is a valid seat index.
pub fn is_valid_seat(seat: Seat) -> bool {
    seat < SEAT_COUNT
}

/// Trump suits that can be named in a trump bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
    NoTrump,
}

impl Suit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
            Suit::NoTrump => "NT",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Round classification from the sum of contract bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    /// Contracts sum to more than 13
    Over,
    /// Contracts sum to less than 13
    Under,
}

impl GameType {
    /// Classify a contract sum. A sum of exactly 13 has no game type.
    pub fn from_sum(sum: u8) -> Option<GameType> {
        match sum {
            s if s > TOTAL_TRICKS => Some(GameType::Over),
            s if s < TOTAL_TRICKS => Some(GameType::Under),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seat_wraps() {
        assert_eq!(next_seat(0), 1);
        assert_eq!(next_seat(3), 0);
    }

    #[test]
    fn test_game_type_from_sum() {
        assert_eq!(GameType::from_sum(20), Some(GameType::Over));
        assert_eq!(GameType::from_sum(12), Some(GameType::Under));
        assert_eq!(GameType::from_sum(13), None);
    }
}
