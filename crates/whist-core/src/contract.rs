//! Contract bidding.
//!
//! After trump is set every player commits to a trick count, starting
//! with the trump winner and moving seat-ascending. The running total may
//! not pass 13 before the last bid, and the last bidder may not bring the
//! total to exactly 13, so every round ends up either over or under.

use crate::game::GameError;
use crate::turn::TurnSequencer;
use crate::types::{GameType, Seat, MAX_BID, SEAT_COUNT, TOTAL_TRICKS};
use serde::{Deserialize, Serialize};

/// One player's contract. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractBid {
    pub seat: Seat,
    pub amount: u8,
    /// 1-based bidding position; position 4 is the last bidder
    pub position: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContractState {
    AwaitingContract { seat: Seat },
    Resolved { total: u8, game_type: GameType },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractOutcome {
    Continue { next: Seat },
    AllContractsPlaced { total: u8, game_type: GameType },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractBidding {
    turns: TurnSequencer,
    trump_winning_bid: u8,
    bids: Vec<ContractBid>,
    state: ContractState,
}

impl ContractBidding {
    /// Contract bidding opened by the trump winner.
    pub fn new(trump_winner: Seat, trump_winning_bid: u8) -> Self {
        let turns = TurnSequencer::new(trump_winner);
        Self {
            turns,
            trump_winning_bid,
            bids: Vec::with_capacity(SEAT_COUNT as usize),
            state: ContractState::AwaitingContract {
                seat: turns.start(),
            },
        }
    }

    pub fn state(&self) -> &ContractState {
        &self.state
    }

    pub fn trump_winner(&self) -> Seat {
        self.turns.start()
    }

    pub fn trump_winning_bid(&self) -> u8 {
        self.trump_winning_bid
    }

    pub fn bids(&self) -> &[ContractBid] {
        &self.bids
    }

    pub fn contract_of(&self, seat: Seat) -> Option<u8> {
        self.bids.iter().find(|b| b.seat == seat).map(|b| b.amount)
    }

    pub fn current_bidder(&self) -> Option<Seat> {
        match self.state {
            ContractState::AwaitingContract { seat } => Some(seat),
            ContractState::Resolved { .. } => None,
        }
    }

    pub fn current_sum(&self) -> u8 {
        self.bids.iter().map(|b| b.amount).sum()
    }

    pub fn game_type(&self) -> Option<GameType> {
        match self.state {
            ContractState::Resolved { game_type, .. } => Some(game_type),
            ContractState::AwaitingContract { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, ContractState::Resolved { .. })
    }

    /// Whether `seat` acts last in this contract round.
    pub fn is_last_bidder(&self, seat: Seat) -> bool {
        self.turns.position_of(seat) == SEAT_COUNT - 1
    }

    /// The amount the current bidder may not choose, if they are last and
    /// some amount would complete the total.
    pub fn forbidden_amount(&self) -> Option<u8> {
        let seat = self.current_bidder()?;
        if !self.is_last_bidder(seat) {
            return None;
        }
        TOTAL_TRICKS.checked_sub(self.current_sum())
    }

    /// Check a contract for `seat` against every rule except turn order.
    pub fn validate_amount(&self, seat: Seat, amount: u8) -> Result<(), GameError> {
        if amount > MAX_BID {
            return Err(GameError::Validation(format!(
                "Contract must be between 0 and {}",
                MAX_BID
            )));
        }
        if seat == self.trump_winner() && amount < self.trump_winning_bid {
            return Err(GameError::Validation(format!(
                "Trump winner must bid at least {}",
                self.trump_winning_bid
            )));
        }

        let total = self.current_sum() + amount;
        if self.is_last_bidder(seat) {
            if total == TOTAL_TRICKS {
                return Err(GameError::Validation(format!(
                    "contracts would sum to {}",
                    TOTAL_TRICKS
                )));
            }
        } else if total > TOTAL_TRICKS {
            return Err(GameError::Validation(format!(
                "Contracts may not exceed {} before the last bid (currently {})",
                TOTAL_TRICKS,
                self.current_sum()
            )));
        }
        Ok(())
    }

    pub fn place(&mut self, seat: Seat, amount: u8) -> Result<ContractOutcome, GameError> {
        match self.state {
            ContractState::AwaitingContract { seat: current } if current == seat => {}
            ContractState::AwaitingContract { .. } => return Err(GameError::OutOfTurn),
            ContractState::Resolved { .. } => return Err(GameError::InvalidPhase),
        }
        self.validate_amount(seat, amount)?;

        self.bids.push(ContractBid {
            seat,
            amount,
            position: self.bids.len() as u8 + 1,
        });

        if self.bids.len() == SEAT_COUNT as usize {
            let total = self.current_sum();
            let game_type = GameType::from_sum(total).ok_or_else(|| {
                GameError::StateInconsistency(format!("contracts sum to {}", TOTAL_TRICKS))
            })?;
            self.state = ContractState::Resolved { total, game_type };
            return Ok(ContractOutcome::AllContractsPlaced { total, game_type });
        }

        let bids = &self.bids;
        let next = self
            .turns
            .next_eligible(seat, |s| bids.iter().all(|b| b.seat != s))
            .ok_or_else(|| {
                GameError::StateInconsistency("no contract bidder remains".to_string())
            })?;
        self.state = ContractState::AwaitingContract { seat: next };
        Ok(ContractOutcome::Continue { next })
    }

    /// Smallest contract the current bidder may legally place. Used when a
    /// turn times out.
    pub fn minimum_legal(&self, seat: Seat) -> Option<u8> {
        (0..=MAX_BID).find(|&amount| self.validate_amount(seat, amount).is_ok())
    }
}
