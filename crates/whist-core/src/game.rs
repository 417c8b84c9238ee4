//! Core game session state machine.
//!
//! This module contains the `GameSession` struct that drives a game
//! round by round: trump bidding (with frisch), contract bidding, trick
//! claiming and scoring.

use crate::actions::{BiddingPhase, GameAction, GameEvent, RoundSummary, SeatResult, TurnPrompt};
use crate::contract::{ContractBidding, ContractOutcome};
use crate::scoring::{ScoreEntry, Scoreboard, ScoringRules};
use crate::tricks::TrickTracker;
use crate::trump::{FrischEscalator, TrumpBidding, TrumpOutcome};
use crate::types::{
    is_valid_seat, Seat, ALL_SEATS, DEFAULT_MINIMUM_TRUMP_BID, SEAT_COUNT, TOTAL_TRICKS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rounds in a standard game
const DEFAULT_TOTAL_ROUNDS: u8 = 13;

/// Errors that can occur when applying actions
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameError {
    #[error("{0}")]
    Validation(String),

    #[error("Not your turn")]
    OutOfTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Seat is already taken")]
    SeatTaken,

    #[error("All 13 tricks have already been played")]
    RoundAlreadyComplete,

    #[error("Player has no tricks to undo")]
    NothingToUndo,

    #[error("Only the room admin can do that")]
    Unauthorized,

    #[error("State inconsistency: {0}")]
    StateInconsistency(String),
}

impl GameError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(_) => "VALIDATION_ERROR",
            GameError::OutOfTurn => "OUT_OF_TURN",
            GameError::InvalidPhase => "INVALID_PHASE",
            GameError::SeatTaken => "SEAT_TAKEN",
            GameError::RoundAlreadyComplete => "ROUND_ALREADY_COMPLETE",
            GameError::NothingToUndo => "NOTHING_TO_UNDO",
            GameError::Unauthorized => "UNAUTHORIZED",
            GameError::StateInconsistency(_) => "STATE_INCONSISTENCY",
        }
    }

    /// Whether the client can simply retry with a different command
    pub fn recoverable(&self) -> bool {
        !matches!(self, GameError::StateInconsistency(_))
    }
}

/// Game rules that can vary between tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub total_rounds: u8,
    pub base_minimum_bid: u8,
    /// Frisch count after which the minimum bid stops rising
    pub max_frisch: Option<u8>,
    pub scoring: ScoringRules,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            base_minimum_bid: DEFAULT_MINIMUM_TRUMP_BID,
            max_frisch: None,
            scoring: ScoringRules::default(),
        }
    }
}

impl GameConfig {
    pub fn escalator(&self) -> FrischEscalator {
        FrischEscalator::new(self.base_minimum_bid, self.max_frisch)
    }
}

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    TrumpBidding,
    ContractBidding,
    Playing,
    Finished,
}

/// State of the round in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub number: u8,
    pub dealer: Seat,
    pub trump: TrumpBidding,
    pub contracts: Option<ContractBidding>,
    pub tricks: TrickTracker,
    pub completed: bool,
}

impl Round {
    fn new(number: u8, escalator: &FrischEscalator) -> Self {
        // Dealer rotates one seat per round
        let dealer = (number - 1) % SEAT_COUNT;
        Self {
            number,
            dealer,
            trump: escalator.start(dealer),
            contracts: None,
            tricks: TrickTracker::new(),
            completed: false,
        }
    }

    pub fn frisch_count(&self) -> u8 {
        self.trump.frisch_count()
    }

    pub fn contract_of(&self, seat: Seat) -> Option<u8> {
        self.contracts.as_ref()?.contract_of(seat)
    }
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    config: GameConfig,
    escalator: FrischEscalator,
    phase: GamePhase,
    round: Round,
    scoreboard: Scoreboard,
    history: Vec<RoundSummary>,
}

impl GameSession {
    /// Start a game. Round 1 is dealt by seat 0.
    pub fn new(config: GameConfig) -> Self {
        let escalator = config.escalator();
        let round = Round::new(1, &escalator);
        Self {
            config,
            escalator,
            phase: GamePhase::TrumpBidding,
            round,
            scoreboard: Scoreboard::new(),
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn round_number(&self) -> u8 {
        self.round.number
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Summaries of every completed round
    pub fn history(&self) -> &[RoundSummary] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.phase == GamePhase::Finished
    }

    /// Event announcing the round currently in trump bidding
    pub fn round_started_event(&self) -> GameEvent {
        GameEvent::RoundStarted {
            round_number: self.round.number,
            dealer: self.round.dealer,
            minimum_bid: self.round.trump.minimum_bid(),
        }
    }

    /// Seat expected to act and the auction it acts in. Trick claiming has
    /// no turn order, so this is `None` while playing.
    pub fn current_turn(&self) -> Option<(Seat, BiddingPhase)> {
        match self.phase {
            GamePhase::TrumpBidding => self
                .round
                .trump
                .current_bidder()
                .map(|seat| (seat, BiddingPhase::TrumpBidding)),
            GamePhase::ContractBidding => self
                .round
                .contracts
                .as_ref()?
                .current_bidder()
                .map(|seat| (seat, BiddingPhase::ContractBidding)),
            GamePhase::Playing | GamePhase::Finished => None,
        }
    }

    /// What the player on turn needs to know to act
    pub fn turn_prompt(&self) -> Option<TurnPrompt> {
        let (seat, phase) = self.current_turn()?;
        let mut prompt = TurnPrompt {
            seat,
            phase,
            round_number: self.round.number,
            minimum_bid: None,
            current_highest: None,
            forbidden_amount: None,
            current_contract_sum: None,
            is_last_bidder: false,
            is_trump_winner: false,
            trump_winning_bid: None,
        };

        match phase {
            BiddingPhase::TrumpBidding => {
                let trump = &self.round.trump;
                prompt.minimum_bid = Some(trump.minimum_bid());
                prompt.current_highest = trump.highest().map(|b| (b.seat, b.amount, b.suit));
                prompt.is_last_bidder = (0..SEAT_COUNT)
                    .filter(|&s| s != seat && !trump.has_passed(s))
                    .count()
                    == 0;
            }
            BiddingPhase::ContractBidding => {
                let contracts = self.round.contracts.as_ref()?;
                prompt.forbidden_amount = contracts.forbidden_amount();
                prompt.current_contract_sum = Some(contracts.current_sum());
                prompt.is_last_bidder = contracts.is_last_bidder(seat);
                prompt.is_trump_winner = seat == contracts.trump_winner();
                if prompt.is_trump_winner {
                    prompt.trump_winning_bid = Some(contracts.trump_winning_bid());
                }
            }
        }
        Some(prompt)
    }

    /// Apply an action taken by the player at `seat`.
    ///
    /// Rejected actions leave the session untouched.
    pub fn apply_action(
        &mut self,
        seat: Seat,
        is_admin: bool,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if !is_valid_seat(seat) {
            return Err(GameError::Validation(format!("No seat {}", seat)));
        }
        if self.phase == GamePhase::Finished {
            return Err(match action {
                GameAction::ClaimTrick => GameError::RoundAlreadyComplete,
                _ => GameError::InvalidPhase,
            });
        }

        let mut events = Vec::new();

        match action {
            // ==================== Trump Bidding ====================
            GameAction::BidTrump { amount, suit } => {
                self.require_phase(GamePhase::TrumpBidding)?;
                let outcome = self.round.trump.bid(seat, amount, suit)?;

                events.push(GameEvent::TrumpBidPlaced {
                    seat,
                    amount,
                    suit,
                    next: next_trump_bidder(outcome),
                });
                events.extend(self.after_trump(outcome)?);
            }

            GameAction::Pass => {
                self.require_phase(GamePhase::TrumpBidding)?;
                let outcome = self.round.trump.pass(seat)?;

                events.push(GameEvent::TrumpPassed {
                    seat,
                    consecutive_passes: self.round.trump.consecutive_passes(),
                    next: next_trump_bidder(outcome),
                });
                events.extend(self.after_trump(outcome)?);
            }

            // ==================== Contract Bidding ====================
            GameAction::BidContract { amount } => {
                self.require_phase(GamePhase::ContractBidding)?;
                let contracts = self
                    .round
                    .contracts
                    .as_mut()
                    .ok_or_else(|| inconsistency("contract bidding without contracts"))?;
                let outcome = contracts.place(seat, amount)?;

                match outcome {
                    ContractOutcome::Continue { next } => {
                        events.push(GameEvent::ContractPlaced {
                            seat,
                            amount,
                            next: Some(next),
                        });
                    }
                    ContractOutcome::AllContractsPlaced { total, game_type } => {
                        events.push(GameEvent::ContractPlaced {
                            seat,
                            amount,
                            next: None,
                        });
                        let first_to_act = contracts.trump_winner();
                        let placed = contracts
                            .bids()
                            .iter()
                            .map(|b| (b.seat, b.amount))
                            .collect();
                        self.phase = GamePhase::Playing;
                        events.push(GameEvent::ContractsSet {
                            contracts: placed,
                            total,
                            game_type,
                            first_to_act,
                        });
                    }
                }
            }

            // ==================== Play ====================
            GameAction::ClaimTrick => {
                self.require_phase(GamePhase::Playing)?;
                let tricks = self.round.tricks.claim(seat)?;

                events.push(GameEvent::TrickClaimed {
                    seat,
                    tricks,
                    total_played: self.round.tricks.total_played(),
                    remaining: self.round.tricks.remaining(),
                });

                if self.round.tricks.is_complete() {
                    events.extend(self.complete_round()?);
                }
            }

            GameAction::UndoTrick { seat: target } => {
                if !is_admin {
                    return Err(GameError::Unauthorized);
                }
                self.require_phase(GamePhase::Playing)?;
                let tricks = self.round.tricks.undo(target)?;

                events.push(GameEvent::TrickUndone {
                    seat: target,
                    tricks,
                    total_played: self.round.tricks.total_played(),
                });
            }
        }

        Ok(events)
    }

    /// The action taken on behalf of `seat` when its turn times out: a pass
    /// in trump bidding, the smallest legal contract in contract bidding.
    pub fn auto_action(&self, seat: Seat) -> Result<GameAction, GameError> {
        match self.current_turn() {
            Some((current, _)) if current != seat => Err(GameError::OutOfTurn),
            Some((_, BiddingPhase::TrumpBidding)) => Ok(GameAction::Pass),
            Some((_, BiddingPhase::ContractBidding)) => {
                let amount = self
                    .round
                    .contracts
                    .as_ref()
                    .and_then(|c| c.minimum_legal(seat))
                    .ok_or_else(|| inconsistency("no legal contract for timed-out seat"))?;
                Ok(GameAction::BidContract { amount })
            }
            None => Err(GameError::InvalidPhase),
        }
    }

    /// Verify the session invariants. A failure means a bug, never a bad
    /// command.
    pub fn check_invariants(&self) -> Result<(), GameError> {
        let tricks = &self.round.tricks;
        if !tricks.is_consistent() {
            return Err(inconsistency(format!(
                "trick counts {:?} do not add up to {}",
                tricks.counts(),
                tricks.total_played()
            )));
        }

        let trump = &self.round.trump;
        let bids = trump.bids();
        if bids.windows(2).any(|w| w[1].amount <= w[0].amount)
            || bids.iter().any(|b| b.amount < trump.minimum_bid())
        {
            return Err(inconsistency("trump bids are not strictly increasing"));
        }

        if let Some(contracts) = &self.round.contracts {
            if contracts.is_complete() && contracts.current_sum() == TOTAL_TRICKS {
                return Err(inconsistency("contracts sum to 13"));
            }
        }

        let contracts_complete = self
            .round
            .contracts
            .as_ref()
            .map(|c| c.is_complete())
            .unwrap_or(false);
        if self.phase == GamePhase::Playing && !contracts_complete {
            return Err(inconsistency("playing without a full set of contracts"));
        }

        if !self.scoreboard.is_consistent() {
            return Err(inconsistency("cumulative totals drifted from round scores"));
        }
        Ok(())
    }

    fn require_phase(&self, phase: GamePhase) -> Result<(), GameError> {
        if self.phase != phase {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    fn after_trump(&mut self, outcome: TrumpOutcome) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();
        match outcome {
            TrumpOutcome::Continue { .. } => {}
            TrumpOutcome::AllPassed => {
                let started = self.escalator.escalate(&mut self.round.trump)?;
                events.push(GameEvent::FrischStarted {
                    frisch_count: started.frisch_count,
                    minimum_bid: started.minimum_bid,
                    first_bidder: started.first_bidder,
                });
            }
            TrumpOutcome::Resolved(result) => {
                self.round.contracts = Some(ContractBidding::new(result.winner, result.amount));
                self.phase = GamePhase::ContractBidding;
                events.push(GameEvent::TrumpSet {
                    winner: result.winner,
                    suit: result.suit,
                    winning_bid: result.amount,
                    frisch_count: self.round.frisch_count(),
                });
            }
        }
        Ok(events)
    }

    fn complete_round(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let trump = self
            .round
            .trump
            .result()
            .ok_or_else(|| inconsistency("round completed without trump"))?;
        let game_type = self
            .round
            .contracts
            .as_ref()
            .and_then(|c| c.game_type())
            .ok_or_else(|| inconsistency("round completed without a game type"))?;

        let rules = self.config.scoring;
        let mut results = Vec::with_capacity(SEAT_COUNT as usize);
        let mut scores = [0i32; 4];
        for seat in ALL_SEATS {
            let contract = self
                .round
                .contract_of(seat)
                .ok_or_else(|| inconsistency(format!("seat {} has no contract", seat)))?;
            let tricks_won = self.round.tricks.tricks_of(seat);
            let round_score = rules.score(contract, tricks_won, game_type);
            scores[seat as usize] = round_score;
            results.push(SeatResult {
                seat,
                contract,
                tricks_won,
                made: rules.made(contract, tricks_won),
                round_score,
            });
        }

        let standings = self.scoreboard.record_round(scores);
        self.round.completed = true;

        let summary = RoundSummary {
            round_number: self.round.number,
            trump_suit: trump.suit,
            trump_winner: trump.winner,
            winning_bid: trump.amount,
            frisch_count: self.round.frisch_count(),
            game_type,
            results,
            standings: standings.clone(),
        };
        self.history.push(summary.clone());

        let mut events = vec![GameEvent::RoundCompleted(summary)];

        if self.round.number >= self.config.total_rounds {
            self.phase = GamePhase::Finished;
            events.push(GameEvent::GameFinished {
                standings: by_rank(standings),
            });
        } else {
            self.round = Round::new(self.round.number + 1, &self.escalator);
            self.phase = GamePhase::TrumpBidding;
            events.push(self.round_started_event());
        }
        Ok(events)
    }
}

fn next_trump_bidder(outcome: TrumpOutcome) -> Option<Seat> {
    match outcome {
        TrumpOutcome::Continue { next } => Some(next),
        TrumpOutcome::AllPassed | TrumpOutcome::Resolved(_) => None,
    }
}

fn by_rank(mut standings: Vec<ScoreEntry>) -> Vec<ScoreEntry> {
    standings.sort_by_key(|e| e.rank);
    standings
}

fn inconsistency(message: impl Into<String>) -> GameError {
    GameError::StateInconsistency(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Suit;

    fn session() -> GameSession {
        GameSession::new(GameConfig::default())
    }

    #[test]
    fn test_new_game_starts_in_trump_bidding() {
        let game = session();
        assert_eq!(game.phase(), GamePhase::TrumpBidding);
        assert_eq!(game.round_number(), 1);
        assert_eq!(game.current_turn(), Some((0, BiddingPhase::TrumpBidding)));
    }

    #[test]
    fn test_rejected_action_leaves_state_untouched() {
        let mut game = session();
        let before = game.clone();
        assert!(game
            .apply_action(1, false, GameAction::BidTrump { amount: 6, suit: Suit::Clubs })
            .is_err());
        assert!(game.apply_action(0, false, GameAction::ClaimTrick).is_err());
        assert_eq!(game, before);
    }

    #[test]
    fn test_undo_requires_admin() {
        let mut game = session();
        assert_eq!(
            game.apply_action(0, false, GameAction::UndoTrick { seat: 1 }),
            Err(GameError::Unauthorized)
        );
        assert_eq!(
            game.apply_action(0, true, GameAction::UndoTrick { seat: 1 }),
            Err(GameError::InvalidPhase)
        );
    }

    #[test]
    fn test_trump_prompt() {
        let mut game = session();
        game.apply_action(0, false, GameAction::BidTrump { amount: 6, suit: Suit::Spades })
            .unwrap();
        let prompt = game.turn_prompt().unwrap();
        assert_eq!(prompt.seat, 1);
        assert_eq!(prompt.minimum_bid, Some(5));
        assert_eq!(prompt.current_highest, Some((0, 6, Suit::Spades)));
    }

    #[test]
    fn test_auto_action_is_pass_in_trump_bidding() {
        let game = session();
        assert_eq!(game.auto_action(0), Ok(GameAction::Pass));
        assert_eq!(game.auto_action(2), Err(GameError::OutOfTurn));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(GameError::OutOfTurn.code(), "OUT_OF_TURN");
        assert!(GameError::NothingToUndo.recoverable());
        assert!(!GameError::StateInconsistency("x".into()).recoverable());
    }
}
