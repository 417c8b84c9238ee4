//! Turn timeouts and disconnect grace periods.
//!
//! Timers never touch room state. When one fires it posts a command into
//! the room's mailbox, and the actor handles it in order with everything
//! else. Each timer carries a token; a command whose token no longer
//! matches the armed timer is stale and ignored.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;
use whist_core::{BiddingPhase, Seat};

use crate::actor::RoomCommand;
use crate::config::TimerConfig;

struct Armed {
    token: u64,
    handle: JoinHandle<()>,
}

struct TurnTimer {
    seat: Seat,
    timer: Armed,
}

pub struct ConnectionSupervisor {
    timers: TimerConfig,
    mailbox: mpsc::Sender<RoomCommand>,
    turn: Option<TurnTimer>,
    grace: HashMap<Uuid, Armed>,
    next_token: u64,
}

impl ConnectionSupervisor {
    pub fn new(timers: TimerConfig, mailbox: mpsc::Sender<RoomCommand>) -> Self {
        Self {
            timers,
            mailbox,
            turn: None,
            grace: HashMap::new(),
            next_token: 0,
        }
    }

    pub fn turn_limit(&self, phase: BiddingPhase) -> Duration {
        match phase {
            BiddingPhase::TrumpBidding => self.timers.trump_turn,
            BiddingPhase::ContractBidding => self.timers.contract_turn,
        }
    }

    /// Start the turn clock for `seat`, replacing any running one.
    pub fn arm_turn(&mut self, seat: Seat, phase: BiddingPhase) -> u64 {
        self.cancel_turn();
        let token = self.token();
        let handle = self.schedule(self.turn_limit(phase), RoomCommand::TurnExpired { token });
        self.turn = Some(TurnTimer {
            seat,
            timer: Armed { token, handle },
        });
        token
    }

    pub fn cancel_turn(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.timer.handle.abort();
        }
    }

    /// Seat whose turn timer is armed.
    pub fn pending_turn(&self) -> Option<Seat> {
        self.turn.as_ref().map(|t| t.seat)
    }

    /// Claim an expired turn timer. Returns the seat if `token` is still
    /// the armed one.
    pub fn take_turn(&mut self, token: u64) -> Option<Seat> {
        match &self.turn {
            Some(turn) if turn.timer.token == token => self.turn.take().map(|t| t.seat),
            _ => None,
        }
    }

    /// Start the grace period for a disconnected player.
    pub fn start_grace(&mut self, player_id: Uuid) -> Duration {
        self.cancel_grace(player_id);
        let token = self.token();
        let period = self.timers.grace_period;
        let handle = self.schedule(period, RoomCommand::GraceExpired { player_id, token });
        self.grace.insert(player_id, Armed { token, handle });
        period
    }

    /// Returns true if a grace period was running.
    pub fn cancel_grace(&mut self, player_id: Uuid) -> bool {
        match self.grace.remove(&player_id) {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn in_grace(&self, player_id: Uuid) -> bool {
        self.grace.contains_key(&player_id)
    }

    /// Claim an expired grace timer.
    pub fn take_grace(&mut self, player_id: Uuid, token: u64) -> bool {
        match self.grace.get(&player_id) {
            Some(armed) if armed.token == token => {
                self.grace.remove(&player_id);
                true
            }
            _ => false,
        }
    }

    /// Cancel everything.
    pub fn shutdown(&mut self) {
        self.cancel_turn();
        for (_, armed) in self.grace.drain() {
            armed.handle.abort();
        }
    }

    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn schedule(&self, after: Duration, command: RoomCommand) -> JoinHandle<()> {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The room may be gone by now
            let _ = mailbox.send(command).await;
        })
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> (ConnectionSupervisor, mpsc::Receiver<RoomCommand>) {
        let (tx, rx) = mpsc::channel(8);
        let timers = TimerConfig {
            trump_turn: Duration::from_secs(30),
            contract_turn: Duration::from_secs(45),
            grace_period: Duration::from_secs(60),
        };
        (ConnectionSupervisor::new(timers, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_timer_fires_with_token() {
        let (mut supervisor, mut rx) = supervisor();
        let token = supervisor.arm_turn(2, BiddingPhase::TrumpBidding);

        match rx.recv().await {
            Some(RoomCommand::TurnExpired { token: fired }) => assert_eq!(fired, token),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(supervisor.take_turn(token), Some(2));
        assert_eq!(supervisor.take_turn(token), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_makes_old_token_stale() {
        let (mut supervisor, _rx) = supervisor();
        let first = supervisor.arm_turn(0, BiddingPhase::TrumpBidding);
        let second = supervisor.arm_turn(1, BiddingPhase::ContractBidding);
        assert_eq!(supervisor.take_turn(first), None);
        assert_eq!(supervisor.pending_turn(), Some(1));
        assert_eq!(supervisor.take_turn(second), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_grace_never_fires() {
        let (mut supervisor, mut rx) = supervisor();
        let player = Uuid::new_v4();
        supervisor.start_grace(player);
        assert!(supervisor.cancel_grace(player));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
        assert!(!supervisor.in_grace(player));
    }
}
