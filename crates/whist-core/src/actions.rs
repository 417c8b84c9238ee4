//! Actions players take and the events they produce.
//!
//! Events identify players by seat; the server maps seats to player
//! identities when it publishes them.

use crate::scoring::ScoreEntry;
use crate::types::{GameType, Seat, Suit};
use serde::{Deserialize, Serialize};

/// All possible actions a seated player can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameAction {
    // ==================== Trump Bidding ====================
    /// Bid a trick count in a suit
    BidTrump { amount: u8, suit: Suit },
    /// Pass in trump bidding
    Pass,

    // ==================== Contract Bidding ====================
    /// Commit to a number of tricks for this round
    BidContract { amount: u8 },

    // ==================== Play ====================
    /// Claim the trick just played
    ClaimTrick,
    /// Take a trick back from a seat (admin only)
    UndoTrick { seat: Seat },
}

/// Which auction a turn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiddingPhase {
    TrumpBidding,
    ContractBidding,
}

/// Everything a player needs to act on their turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPrompt {
    pub seat: Seat,
    pub phase: BiddingPhase,
    pub round_number: u8,
    /// Trump bidding: lowest acceptable bid
    pub minimum_bid: Option<u8>,
    /// Trump bidding: `(seat, amount, suit)` of the bid to beat
    pub current_highest: Option<(Seat, u8, Suit)>,
    /// Contract bidding: amount the last bidder may not choose
    pub forbidden_amount: Option<u8>,
    pub current_contract_sum: Option<u8>,
    pub is_last_bidder: bool,
    pub is_trump_winner: bool,
    pub trump_winning_bid: Option<u8>,
}

/// Per-seat result of a finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatResult {
    pub seat: Seat,
    pub contract: u8,
    pub tricks_won: u8,
    pub made: bool,
    pub round_score: i32,
}

/// Summary of a finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_number: u8,
    pub trump_suit: Suit,
    pub trump_winner: Seat,
    pub winning_bid: u8,
    pub frisch_count: u8,
    pub game_type: GameType,
    pub results: Vec<SeatResult>,
    pub standings: Vec<ScoreEntry>,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A new round was dealt and trump bidding opened
    RoundStarted {
        round_number: u8,
        dealer: Seat,
        minimum_bid: u8,
    },

    /// A trump bid was accepted
    TrumpBidPlaced {
        seat: Seat,
        amount: u8,
        suit: Suit,
        next: Option<Seat>,
    },

    /// A player passed in trump bidding
    TrumpPassed {
        seat: Seat,
        consecutive_passes: u8,
        next: Option<Seat>,
    },

    /// Every player passed without a bid; bidding restarts higher
    FrischStarted {
        frisch_count: u8,
        minimum_bid: u8,
        first_bidder: Seat,
    },

    /// Trump bidding resolved
    TrumpSet {
        winner: Seat,
        suit: Suit,
        winning_bid: u8,
        frisch_count: u8,
    },

    /// A contract bid was accepted
    ContractPlaced {
        seat: Seat,
        amount: u8,
        next: Option<Seat>,
    },

    /// All four contracts are in
    ContractsSet {
        contracts: Vec<(Seat, u8)>,
        total: u8,
        game_type: GameType,
        first_to_act: Seat,
    },

    /// A trick was credited
    TrickClaimed {
        seat: Seat,
        tricks: u8,
        total_played: u8,
        remaining: u8,
    },

    /// A trick was taken back
    TrickUndone {
        seat: Seat,
        tricks: u8,
        total_played: u8,
    },

    /// All 13 tricks are accounted for and scored
    RoundCompleted(RoundSummary),

    /// The last round was scored
    GameFinished { standings: Vec<ScoreEntry> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_shape() {
        let action = GameAction::BidTrump {
            amount: 7,
            suit: Suit::Hearts,
        };
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "bid_trump", "amount": 7, "suit": "hearts"})
        );
    }
}
