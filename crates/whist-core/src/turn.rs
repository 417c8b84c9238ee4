//! Turn order around the table.
//!
//! Turns always move seat-ascending, wrapping modulo 4, from a designated
//! starting seat (the dealer for trump bidding, the trump winner for
//! contract bidding). Seats that are no longer eligible (passed in trump
//! bidding, already bid in contract bidding) are skipped.

use crate::types::{next_seat, Seat, SEAT_COUNT};
use serde::{Deserialize, Serialize};

/// Deterministic turn order anchored at a starting seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSequencer {
    start: Seat,
}

impl TurnSequencer {
    pub fn new(start: Seat) -> Self {
        Self {
            start: start % SEAT_COUNT,
        }
    }

    pub fn start(&self) -> Seat {
        self.start
    }

    /// Position of `seat` within the rotation (0 = first to act).
    pub fn position_of(&self, seat: Seat) -> u8 {
        (seat + SEAT_COUNT - self.start) % SEAT_COUNT
    }

    /// Next eligible seat strictly after `current`, wrapping around the
    /// table. `current` itself is considered last.
    pub fn next_eligible<F>(&self, current: Seat, eligible: F) -> Option<Seat>
    where
        F: Fn(Seat) -> bool,
    {
        let mut seat = current;
        for _ in 0..SEAT_COUNT {
            seat = next_seat(seat);
            if eligible(seat) {
                return Some(seat);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_starts_at_designated_seat() {
        let turns = TurnSequencer::new(2);
        assert_eq!([2, 3, 0, 1].map(|s| turns.position_of(s)), [0, 1, 2, 3]);
        assert_eq!(TurnSequencer::new(0).position_of(0), 0);
    }

    #[test]
    fn test_next_eligible_skips_ineligible() {
        let turns = TurnSequencer::new(0);
        let passed = [false, true, true, false];
        assert_eq!(turns.next_eligible(0, |s| !passed[s as usize]), Some(3));
        assert_eq!(turns.next_eligible(3, |s| !passed[s as usize]), Some(0));
    }

    #[test]
    fn test_next_eligible_returns_current_when_alone() {
        let turns = TurnSequencer::new(1);
        assert_eq!(turns.next_eligible(2, |s| s == 2), Some(2));
        assert_eq!(turns.next_eligible(2, |_| false), None);
    }

    #[test]
    fn test_position_of() {
        let turns = TurnSequencer::new(3);
        assert_eq!(turns.position_of(3), 0);
        assert_eq!(turns.position_of(0), 1);
        assert_eq!(turns.position_of(2), 3);
    }

    #[test]
    fn test_deterministic() {
        let a = TurnSequencer::new(1);
        let b = TurnSequencer::new(1);
        for seat in 0..4 {
            assert_eq!(
                a.next_eligible(seat, |s| s % 2 == 0),
                b.next_eligible(seat, |s| s % 2 == 0)
            );
        }
    }
}
