//! Round scoring and cumulative standings.
//!
//! Scoring rules:
//! - Contract of 1 or more made exactly: `contract² + 10`
//! - Contract of 1 or more missed: `-10` per trick of deviation
//! - Zero contract made: `+50` in an under game, `+25` in an over game
//! - Zero contract missed: `-50` for the first trick, `-10` for each extra
//!
//! Scores depend only on `(contract, tricks_won, game_type)`.

use crate::types::{GameType, Seat, SEAT_COUNT};
use serde::{Deserialize, Serialize};

/// Scoring constants. The defaults are the house rules described above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    /// Added to `contract²` for a made contract
    pub made_bonus: i32,
    /// Lost per trick of deviation on a missed contract
    pub miss_penalty_per_trick: i32,
    pub zero_made_under: i32,
    pub zero_made_over: i32,
    /// Lost for the first trick taken on a zero contract
    pub zero_miss_penalty: i32,
    /// Lost for each further trick taken on a zero contract
    pub zero_miss_penalty_per_extra_trick: i32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            made_bonus: 10,
            miss_penalty_per_trick: 10,
            zero_made_under: 50,
            zero_made_over: 25,
            zero_miss_penalty: 50,
            zero_miss_penalty_per_extra_trick: 10,
        }
    }
}

impl ScoringRules {
    /// Whether the contract was made. Contracts must be hit exactly.
    pub fn made(&self, contract: u8, tricks_won: u8) -> bool {
        contract == tricks_won
    }

    /// Score for one player in one round.
    pub fn score(&self, contract: u8, tricks_won: u8, game_type: GameType) -> i32 {
        let contract = contract as i32;
        let tricks = tricks_won as i32;

        if contract == 0 {
            return match (tricks, game_type) {
                (0, GameType::Under) => self.zero_made_under,
                (0, GameType::Over) => self.zero_made_over,
                (t, _) => {
                    -self.zero_miss_penalty - (t - 1) * self.zero_miss_penalty_per_extra_trick
                }
            };
        }

        if tricks == contract {
            contract * contract + self.made_bonus
        } else {
            -(tricks - contract).abs() * self.miss_penalty_per_trick
        }
    }
}

/// Score with the default house rules.
pub fn score(contract: u8, tricks_won: u8, game_type: GameType) -> i32 {
    ScoringRules::default().score(contract, tricks_won, game_type)
}

/// One row of the standings after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub seat: Seat,
    pub round_score: i32,
    /// Cumulative total after this round
    pub total: i64,
    /// 1-based leaderboard position
    pub rank: u8,
}

/// Cumulative totals across the rounds of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    totals: [i64; 4],
    rounds: Vec<[i32; 4]>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self, seat: Seat) -> i64 {
        self.totals.get(seat as usize).copied().unwrap_or(0)
    }

    pub fn totals(&self) -> [i64; 4] {
        self.totals
    }

    /// Add a round's scores to the totals and return the new standings
    /// in seat order.
    pub fn record_round(&mut self, scores: [i32; 4]) -> Vec<ScoreEntry> {
        for (total, score) in self.totals.iter_mut().zip(scores) {
            *total += score as i64;
        }
        self.rounds.push(scores);

        let ranks = self.ranks();
        (0..SEAT_COUNT)
            .map(|seat| ScoreEntry {
                seat,
                round_score: scores[seat as usize],
                total: self.totals[seat as usize],
                rank: ranks[seat as usize],
            })
            .collect()
    }

    /// Seats ordered by total descending, ties broken by lower seat.
    pub fn leaderboard(&self) -> [Seat; 4] {
        let mut seats = [0, 1, 2, 3];
        seats.sort_by(|&a, &b| {
            self.totals[b as usize]
                .cmp(&self.totals[a as usize])
                .then(a.cmp(&b))
        });
        seats
    }

    /// 1-based leaderboard position of every seat.
    pub fn ranks(&self) -> [u8; 4] {
        let mut ranks = [0; 4];
        for (position, seat) in self.leaderboard().iter().enumerate() {
            ranks[*seat as usize] = position as u8 + 1;
        }
        ranks
    }

    /// Totals equal the sum of all recorded round scores.
    pub fn is_consistent(&self) -> bool {
        (0..SEAT_COUNT as usize).all(|seat| {
            let sum: i64 = self.rounds.iter().map(|r| r[seat] as i64).sum();
            sum == self.totals[seat]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_made_contracts() {
        assert_eq!(score(3, 3, GameType::Under), 19);
        assert_eq!(score(5, 5, GameType::Over), 35);
        assert_eq!(score(1, 1, GameType::Under), 11);
        assert_eq!(score(13, 13, GameType::Over), 179);
    }

    #[test]
    fn test_missed_contracts() {
        assert_eq!(score(5, 3, GameType::Under), -20);
        assert_eq!(score(3, 5, GameType::Over), -20);
        assert_eq!(score(10, 3, GameType::Over), -70);
        // Excess tricks in an under game cost the same as in an over game
        assert_eq!(score(2, 7, GameType::Under), -50);
    }

    #[test]
    fn test_zero_contracts() {
        assert_eq!(score(0, 0, GameType::Under), 50);
        assert_eq!(score(0, 0, GameType::Over), 25);
        assert_eq!(score(0, 1, GameType::Under), -50);
        assert_eq!(score(0, 2, GameType::Over), -60);
        assert_eq!(score(0, 13, GameType::Under), -170);
    }

    #[test]
    fn test_score_is_pure() {
        for contract in 0..=13 {
            for tricks in 0..=13 {
                for game_type in [GameType::Over, GameType::Under] {
                    assert_eq!(
                        score(contract, tricks, game_type),
                        score(contract, tricks, game_type)
                    );
                }
            }
        }
    }

    #[test]
    fn test_custom_rules() {
        let rules = ScoringRules {
            zero_made_over: 30,
            ..ScoringRules::default()
        };
        assert_eq!(rules.score(0, 0, GameType::Over), 30);
        assert!(rules.made(4, 4));
        assert!(!rules.made(4, 5));
    }

    #[test]
    fn test_scoreboard_accumulates() {
        let mut board = Scoreboard::new();
        let first = board.record_round([19, -20, 50, -10]);
        assert_eq!(first[2].rank, 1);
        assert_eq!(first[0].total, 19);

        let second = board.record_round([-10, 35, 0, 11]);
        assert_eq!(
            second.iter().map(|e| e.total).collect::<Vec<_>>(),
            vec![9, 15, 50, 1]
        );
        assert_eq!(board.leaderboard(), [2, 1, 0, 3]);
        assert!(board.is_consistent());
    }

    #[test]
    fn test_leaderboard_ties_by_seat() {
        let mut board = Scoreboard::new();
        board.record_round([10, 20, 20, 10]);
        assert_eq!(board.leaderboard(), [1, 2, 0, 3]);
        assert_eq!(board.ranks(), [3, 1, 2, 4]);
    }
}
