//! Whist - rules engine for a four-player Israeli Whist score table
//!
//! This crate provides the game logic for a Whist session, including:
//! - Trump bidding with frisch escalation when everyone passes
//! - Contract bidding with the "never exactly 13" rule
//! - Declarative trick claiming with admin undo
//! - Round scoring and cumulative standings
//!
//! # Architecture
//!
//! The engine is pure: no I/O, no clocks, no randomness. Every action goes
//! through [`GameSession::apply_action`], which either rejects it without
//! touching state or commits it and returns the [`GameEvent`]s it produced.
//! The server crate owns connections, timers and identities.
//!
//! # Modules
//!
//! - [`types`]: Seats, suits and game types
//! - [`turn`]: Seat-ascending turn order
//! - [`trump`]: Trump auction and frisch
//! - [`contract`]: Contract bidding
//! - [`tricks`]: Trick accounting
//! - [`scoring`]: Round scores and standings
//! - [`game`]: Session state machine

pub mod actions;
pub mod contract;
pub mod game;
pub mod scoring;
pub mod tricks;
pub mod trump;
pub mod turn;
pub mod types;

// Re-export commonly used types
pub use actions::{BiddingPhase, GameAction, GameEvent, RoundSummary, SeatResult, TurnPrompt};
pub use contract::{ContractBid, ContractBidding, ContractOutcome, ContractState};
pub use game::{GameConfig, GameError, GamePhase, GameSession, Round};
pub use scoring::{score, ScoreEntry, Scoreboard, ScoringRules};
pub use tricks::TrickTracker;
pub use trump::{
    FrischEscalator, FrischStarted, TrumpBid, TrumpBidding, TrumpOutcome, TrumpResult, TrumpState,
};
pub use turn::TurnSequencer;
pub use types::{
    is_valid_seat, GameType, Seat, Suit, ALL_SEATS, DEFAULT_MINIMUM_TRUMP_BID, MAX_BID,
    SEAT_COUNT, TOTAL_TRICKS,
};
