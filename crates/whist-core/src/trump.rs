//! Trump bidding and frisch escalation.
//!
//! Players bid a trick count and a suit, starting from the dealer. A bid
//! must reach the current minimum and strictly exceed the highest bid so
//! far. Once a player passes they are skipped for the rest of this
//! bidding round. Three passes after at least one bid resolve the trump;
//! four passes with no bid hand control to the [`FrischEscalator`].

use crate::game::GameError;
use crate::turn::TurnSequencer;
use crate::types::{Seat, Suit, DEFAULT_MINIMUM_TRUMP_BID, MAX_BID, SEAT_COUNT};
use serde::{Deserialize, Serialize};

/// A recorded trump bid. Superseded only by a strictly higher bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrumpBid {
    pub seat: Seat,
    pub amount: u8,
    pub suit: Suit,
    /// 1-based position among the bids of this frisch round
    pub sequence: u32,
}

/// Outcome of a resolved trump auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrumpResult {
    pub winner: Seat,
    pub suit: Suit,
    pub amount: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrumpState {
    AwaitingBid { seat: Seat },
    AllPassed,
    Resolved { result: TrumpResult },
}

/// What happened after a bid or pass was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrumpOutcome {
    Continue { next: Seat },
    AllPassed,
    Resolved(TrumpResult),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrumpBidding {
    turns: TurnSequencer,
    frisch_count: u8,
    minimum_bid: u8,
    bids: Vec<TrumpBid>,
    passed: [bool; 4],
    consecutive_passes: u8,
    state: TrumpState,
}

impl TrumpBidding {
    /// Fresh trump bidding starting at the dealer.
    pub fn new(dealer: Seat, minimum_bid: u8) -> Self {
        Self::with_frisch(dealer, 0, minimum_bid)
    }

    fn with_frisch(dealer: Seat, frisch_count: u8, minimum_bid: u8) -> Self {
        let turns = TurnSequencer::new(dealer);
        Self {
            turns,
            frisch_count,
            minimum_bid,
            bids: Vec::new(),
            passed: [false; 4],
            consecutive_passes: 0,
            state: TrumpState::AwaitingBid {
                seat: turns.start(),
            },
        }
    }

    pub fn state(&self) -> &TrumpState {
        &self.state
    }

    pub fn dealer(&self) -> Seat {
        self.turns.start()
    }

    pub fn frisch_count(&self) -> u8 {
        self.frisch_count
    }

    pub fn minimum_bid(&self) -> u8 {
        self.minimum_bid
    }

    /// Bids recorded in the current frisch round, oldest first.
    pub fn bids(&self) -> &[TrumpBid] {
        &self.bids
    }

    pub fn highest(&self) -> Option<&TrumpBid> {
        self.bids.last()
    }

    pub fn consecutive_passes(&self) -> u8 {
        self.consecutive_passes
    }

    pub fn has_passed(&self, seat: Seat) -> bool {
        self.passed.get(seat as usize).copied().unwrap_or(false)
    }

    pub fn current_bidder(&self) -> Option<Seat> {
        match self.state {
            TrumpState::AwaitingBid { seat } => Some(seat),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<TrumpResult> {
        match self.state {
            TrumpState::Resolved { result } => Some(result),
            _ => None,
        }
    }

    /// Check a bid amount against the range, the frisch minimum and the
    /// current highest bid.
    pub fn validate_amount(&self, amount: u8) -> Result<(), GameError> {
        if !(DEFAULT_MINIMUM_TRUMP_BID..=MAX_BID).contains(&amount) {
            return Err(GameError::Validation(format!(
                "Trump bid must be between {} and {}",
                DEFAULT_MINIMUM_TRUMP_BID,
                MAX_BID
            )));
        }
        if amount < self.minimum_bid {
            return Err(GameError::Validation(format!(
                "Bid must be at least {}",
                self.minimum_bid
            )));
        }
        if let Some(highest) = self.highest() {
            if amount <= highest.amount {
                return Err(GameError::Validation(format!(
                    "Must bid more than {} {}",
                    highest.amount, highest.suit
                )));
            }
        }
        Ok(())
    }

    pub fn bid(&mut self, seat: Seat, amount: u8, suit: Suit) -> Result<TrumpOutcome, GameError> {
        self.ensure_turn(seat)?;
        self.validate_amount(amount)?;

        let sequence = self.bids.len() as u32 + 1;
        self.bids.push(TrumpBid {
            seat,
            amount,
            suit,
            sequence,
        });
        self.consecutive_passes = 0;

        // Everyone else already passed: nobody left to outbid
        if self.passed_count() == SEAT_COUNT - 1 {
            return Ok(self.resolve());
        }
        self.advance(seat)
    }

    pub fn pass(&mut self, seat: Seat) -> Result<TrumpOutcome, GameError> {
        self.ensure_turn(seat)?;

        self.passed[seat as usize] = true;
        self.consecutive_passes += 1;
        let passes = self.passed_count();

        match self.highest().copied() {
            None if passes == SEAT_COUNT => {
                self.state = TrumpState::AllPassed;
                Ok(TrumpOutcome::AllPassed)
            }
            Some(highest) if passes == SEAT_COUNT - 1 => {
                if self.has_passed(highest.seat) {
                    return Err(GameError::StateInconsistency(format!(
                        "highest trump bidder at seat {} has passed",
                        highest.seat
                    )));
                }
                Ok(self.resolve())
            }
            _ => self.advance(seat),
        }
    }

    fn ensure_turn(&self, seat: Seat) -> Result<(), GameError> {
        match self.state {
            TrumpState::AwaitingBid { seat: current } if current == seat => Ok(()),
            TrumpState::AwaitingBid { .. } => Err(GameError::OutOfTurn),
            _ => Err(GameError::InvalidPhase),
        }
    }

    fn passed_count(&self) -> u8 {
        self.passed.iter().filter(|&&p| p).count() as u8
    }

    fn advance(&mut self, after: Seat) -> Result<TrumpOutcome, GameError> {
        let passed = self.passed;
        let next = self
            .turns
            .next_eligible(after, |s| !passed[s as usize])
            .ok_or_else(|| {
                GameError::StateInconsistency("no eligible trump bidder remains".to_string())
            })?;
        self.state = TrumpState::AwaitingBid { seat: next };
        Ok(TrumpOutcome::Continue { next })
    }

    fn resolve(&mut self) -> TrumpOutcome {
        // Only reachable with at least one bid recorded
        let highest = self.bids[self.bids.len() - 1];
        let result = TrumpResult {
            winner: highest.seat,
            suit: highest.suit,
            amount: highest.amount,
        };
        self.state = TrumpState::Resolved { result };
        TrumpOutcome::Resolved(result)
    }
}

/// Result of restarting trump bidding after an all-pass round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrischStarted {
    /// 1-based frisch number
    pub frisch_count: u8,
    pub minimum_bid: u8,
    pub first_bidder: Seat,
}

/// Raises the minimum trump bid each time every player passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrischEscalator {
    base_minimum: u8,
    /// Frisch count after which the minimum stops rising. `None` means
    /// the minimum keeps rising until it reaches 13.
    max_frisch: Option<u8>,
}

impl Default for FrischEscalator {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_TRUMP_BID, None)
    }
}

impl FrischEscalator {
    pub fn new(base_minimum: u8, max_frisch: Option<u8>) -> Self {
        Self {
            base_minimum,
            max_frisch,
        }
    }

    /// Minimum trump bid after `frisch_count` all-pass rounds.
    pub fn minimum_for(&self, frisch_count: u8) -> u8 {
        let steps = match self.max_frisch {
            Some(max) => frisch_count.min(max),
            None => frisch_count,
        };
        self.base_minimum.saturating_add(steps).min(MAX_BID)
    }

    /// Start trump bidding for a round dealt by `dealer`.
    pub fn start(&self, dealer: Seat) -> TrumpBidding {
        TrumpBidding::new(dealer, self.minimum_for(0))
    }

    /// Restart an all-passed auction from the dealer with a raised minimum
    /// and no recorded bids.
    pub fn escalate(&self, bidding: &mut TrumpBidding) -> Result<FrischStarted, GameError> {
        if bidding.state != TrumpState::AllPassed {
            return Err(GameError::InvalidPhase);
        }
        let frisch_count = bidding.frisch_count.saturating_add(1);
        let minimum_bid = self.minimum_for(frisch_count);
        *bidding = TrumpBidding::with_frisch(bidding.dealer(), frisch_count, minimum_bid);

        Ok(FrischStarted {
            frisch_count,
            minimum_bid,
            first_bidder: bidding.dealer(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auction() -> TrumpBidding {
        FrischEscalator::default().start(0)
    }

    #[test]
    fn test_example_auction_resolves_to_highest() {
        let mut bidding = auction();
        bidding.bid(0, 5, Suit::Clubs).unwrap();
        bidding.bid(1, 6, Suit::Diamonds).unwrap();
        bidding.bid(2, 7, Suit::Hearts).unwrap();
        assert_eq!(bidding.pass(3).unwrap(), TrumpOutcome::Continue { next: 0 });
        assert_eq!(bidding.pass(0).unwrap(), TrumpOutcome::Continue { next: 1 });

        let outcome = bidding.pass(1).unwrap();
        let expected = TrumpResult {
            winner: 2,
            suit: Suit::Hearts,
            amount: 7,
        };
        assert_eq!(outcome, TrumpOutcome::Resolved(expected));
        assert_eq!(bidding.result(), Some(expected));
    }

    #[test]
    fn test_equal_bid_rejected() {
        let mut bidding = auction();
        bidding.bid(0, 6, Suit::Clubs).unwrap();
        let err = bidding.bid(1, 6, Suit::NoTrump).unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
        // Rejection leaves the turn where it was
        assert_eq!(bidding.current_bidder(), Some(1));
        assert_eq!(bidding.highest().map(|b| b.amount), Some(6));
    }

    #[test]
    fn test_bid_range_and_minimum() {
        let mut bidding = auction();
        assert!(matches!(
            bidding.bid(0, 4, Suit::Spades),
            Err(GameError::Validation(_))
        ));
        assert!(matches!(
            bidding.bid(0, 14, Suit::Spades),
            Err(GameError::Validation(_))
        ));
        assert!(bidding.bid(0, 13, Suit::Spades).is_ok());
    }

    #[test]
    fn test_out_of_turn() {
        let mut bidding = auction();
        assert!(matches!(bidding.bid(2, 5, Suit::Clubs), Err(GameError::OutOfTurn)));
        assert!(matches!(bidding.pass(1), Err(GameError::OutOfTurn)));
        assert!(bidding.bids().is_empty());
    }

    #[test]
    fn test_passed_players_are_skipped() {
        let mut bidding = auction();
        bidding.pass(0).unwrap();
        bidding.bid(1, 5, Suit::Clubs).unwrap();
        bidding.bid(2, 6, Suit::Clubs).unwrap();
        // Seat 0 passed, so after seat 3 the turn returns to seat 1
        assert_eq!(
            bidding.bid(3, 7, Suit::Clubs).unwrap(),
            TrumpOutcome::Continue { next: 1 }
        );
    }

    #[test]
    fn test_last_player_bidding_after_three_passes_wins() {
        let mut bidding = auction();
        bidding.pass(0).unwrap();
        bidding.pass(1).unwrap();
        bidding.pass(2).unwrap();
        let outcome = bidding.bid(3, 5, Suit::Spades).unwrap();
        assert!(matches!(outcome, TrumpOutcome::Resolved(TrumpResult { winner: 3, .. })));
    }

    #[test]
    fn test_all_pass_then_frisch() {
        let escalator = FrischEscalator::default();
        let mut bidding = escalator.start(2);
        for seat in [2, 3, 0] {
            bidding.pass(seat).unwrap();
        }
        assert_eq!(bidding.pass(1).unwrap(), TrumpOutcome::AllPassed);
        assert_eq!(bidding.current_bidder(), None);

        let started = escalator.escalate(&mut bidding).unwrap();
        assert_eq!(
            started,
            FrischStarted {
                frisch_count: 1,
                minimum_bid: 6,
                first_bidder: 2,
            }
        );
        assert!(bidding.bids().is_empty());
        assert_eq!(bidding.current_bidder(), Some(2));
        assert!(matches!(bidding.bid(2, 5, Suit::Clubs), Err(GameError::Validation(_))));
    }

    #[test]
    fn test_escalate_requires_all_passed() {
        let escalator = FrischEscalator::default();
        let mut bidding = escalator.start(0);
        assert!(matches!(
            escalator.escalate(&mut bidding),
            Err(GameError::InvalidPhase)
        ));
    }

    #[test]
    fn test_minimum_progression() {
        let unbounded = FrischEscalator::default();
        assert_eq!(unbounded.minimum_for(0), 5);
        assert_eq!(unbounded.minimum_for(3), 8);
        assert_eq!(unbounded.minimum_for(20), 13);

        let capped = FrischEscalator::new(5, Some(3));
        assert_eq!(capped.minimum_for(3), 8);
        assert_eq!(capped.minimum_for(7), 8);
    }
}
