//! Trick accounting for the play phase.
//!
//! Tricks are claimed declaratively: whoever took a trick claims it, and
//! the room admin can undo a mistaken claim.

use crate::game::GameError;
use crate::types::{is_valid_seat, Seat, TOTAL_TRICKS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrickTracker {
    tricks: [u8; 4],
    total: u8,
}

impl TrickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tricks_of(&self, seat: Seat) -> u8 {
        self.tricks.get(seat as usize).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> [u8; 4] {
        self.tricks
    }

    pub fn total_played(&self) -> u8 {
        self.total
    }

    pub fn remaining(&self) -> u8 {
        TOTAL_TRICKS - self.total
    }

    /// All 13 tricks have been accounted for.
    pub fn is_complete(&self) -> bool {
        self.total == TOTAL_TRICKS
    }

    /// Credit one trick to `seat`. Returns the seat's new count.
    pub fn claim(&mut self, seat: Seat) -> Result<u8, GameError> {
        check_seat(seat)?;
        if self.is_complete() {
            return Err(GameError::RoundAlreadyComplete);
        }
        self.tricks[seat as usize] += 1;
        self.total += 1;
        Ok(self.tricks[seat as usize])
    }

    /// Take one trick back from `seat`. Returns the seat's new count.
    pub fn undo(&mut self, seat: Seat) -> Result<u8, GameError> {
        check_seat(seat)?;
        if self.tricks[seat as usize] == 0 {
            return Err(GameError::NothingToUndo);
        }
        self.tricks[seat as usize] -= 1;
        self.total -= 1;
        Ok(self.tricks[seat as usize])
    }

    /// The per-seat counts add up to the running total and never pass 13.
    pub fn is_consistent(&self) -> bool {
        let sum: u32 = self.tricks.iter().map(|&t| t as u32).sum();
        sum == self.total as u32 && self.total <= TOTAL_TRICKS
    }
}

fn check_seat(seat: Seat) -> Result<(), GameError> {
    if !is_valid_seat(seat) {
        return Err(GameError::Validation(format!("No seat {}", seat)));
    }
    Ok(())
}
