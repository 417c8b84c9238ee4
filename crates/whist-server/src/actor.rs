//! Per-room actor.
//!
//! Each room is owned by one task that drains a bounded mailbox. Player
//! commands, disconnects and timer expiries all arrive through the same
//! mailbox, so room and game state is only ever touched by that task.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;
use whist_core::{
    BiddingPhase, GameAction, GameConfig, GameError, GameEvent, GamePhase, GameSession,
    ScoreEntry, Seat,
};

use crate::broadcast::EventBroadcaster;
use crate::config::{ServerConfig, TimerConfig};
use crate::protocol::{
    ContractInfo, HighestBid, LeaveReason, PlayerCommand, PlayerRoundResult, RoundComplete,
    RoundSnapshot, ServerEvent, ServerMessage, SessionPhase, Snapshot, Standing, YourTurn,
};
use crate::room::{
    ConnectionStatus, JoinOutcome, PlayerIdentity, Room, RoomCode, RoomError, RoomLifecycle,
};
use crate::supervisor::ConnectionSupervisor;

/// Commands a room actor processes, in arrival order.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        identity: PlayerIdentity,
        connection_id: Uuid,
        outbound: mpsc::UnboundedSender<ServerMessage>,
        reply: oneshot::Sender<Result<Value, RoomError>>,
    },
    Player {
        player_id: Uuid,
        command: PlayerCommand,
        reply: oneshot::Sender<Result<Value, RoomError>>,
    },
    Disconnected {
        player_id: Uuid,
        connection_id: Uuid,
    },
    TurnExpired {
        token: u64,
    },
    GraceExpired {
        player_id: Uuid,
        token: u64,
    },
}

#[derive(Debug, Clone)]
pub struct ActorConfig {
    pub game: GameConfig,
    pub timers: TimerConfig,
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            timers: TimerConfig::default(),
            mailbox_capacity: 64,
        }
    }
}

impl From<&ServerConfig> for ActorConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            game: config.game,
            timers: config.timers,
            ..Self::default()
        }
    }
}

/// Cheap, cloneable address of a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    pub async fn join(
        &self,
        identity: PlayerIdentity,
        connection_id: Uuid,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<Value, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            identity,
            connection_id,
            outbound,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::RoomClosed)?
    }

    pub async fn command(
        &self,
        player_id: Uuid,
        command: PlayerCommand,
    ) -> Result<Value, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Player {
            player_id,
            command,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::RoomClosed)?
    }

    /// Report a closed connection. Ignored if the room is gone.
    pub async fn disconnected(&self, player_id: Uuid, connection_id: Uuid) {
        let _ = self
            .send(RoomCommand::Disconnected {
                player_id,
                connection_id,
            })
            .await;
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RoomError::RoomClosed)
    }
}

pub struct RoomSessionActor {
    room: Room,
    session: Option<GameSession>,
    game_config: GameConfig,
    broadcaster: EventBroadcaster,
    supervisor: ConnectionSupervisor,
    mailbox: mpsc::Receiver<RoomCommand>,
    rng: StdRng,
    /// Set after a state inconsistency; game commands are refused
    halted: bool,
}

impl RoomSessionActor {
    /// Start the actor for `code` on the current runtime.
    pub fn spawn(code: RoomCode, config: ActorConfig) -> (RoomHandle, JoinHandle<()>) {
        let (sender, mailbox) = mpsc::channel(config.mailbox_capacity.max(1));
        let actor = Self::new(code.clone(), &config, sender.clone(), mailbox);
        let task = tokio::spawn(actor.run());
        (RoomHandle { code, sender }, task)
    }

    fn new(
        code: RoomCode,
        config: &ActorConfig,
        sender: mpsc::Sender<RoomCommand>,
        mailbox: mpsc::Receiver<RoomCommand>,
    ) -> Self {
        Self {
            room: Room::new(code),
            session: None,
            game_config: config.game,
            broadcaster: EventBroadcaster::new(),
            supervisor: ConnectionSupervisor::new(config.timers, sender),
            mailbox,
            rng: StdRng::from_entropy(),
            halted: false,
        }
    }

    async fn run(mut self) {
        info!(room = %self.room.code, "room opened");
        while let Some(command) = self.mailbox.recv().await {
            self.handle(command);
            if self.room.lifecycle == RoomLifecycle::Disbanded {
                break;
            }
        }
        self.supervisor.shutdown();
        info!(room = %self.room.code, "room disbanded");
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                identity,
                connection_id,
                outbound,
                reply,
            } => {
                let result = self.handle_join(identity, connection_id, outbound);
                let _ = reply.send(result);
            }
            RoomCommand::Player {
                player_id,
                command,
                reply,
            } => {
                let result = self.handle_player(player_id, command);
                if let Err(e) = &result {
                    debug!(
                        room = %self.room.code,
                        player = %player_id,
                        ?command,
                        error = %e,
                        "command rejected"
                    );
                }
                let _ = reply.send(result);
            }
            RoomCommand::Disconnected {
                player_id,
                connection_id,
            } => self.handle_disconnect(player_id, connection_id),
            RoomCommand::TurnExpired { token } => {
                if let Some(seat) = self.supervisor.take_turn(token) {
                    info!(room = %self.room.code, seat, "turn timed out");
                    self.auto_act(seat);
                }
            }
            RoomCommand::GraceExpired { player_id, token } => {
                if self.supervisor.take_grace(player_id, token) {
                    self.expire_grace(player_id);
                }
            }
        }
    }

    // ==================== Membership ====================

    fn handle_join(
        &mut self,
        identity: PlayerIdentity,
        connection_id: Uuid,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<Value, RoomError> {
        let player_id = identity.id;
        let outcome = self.room.join(identity)?;
        self.broadcaster.subscribe(player_id, connection_id, outbound);

        let (seat, reconnected) = match outcome {
            JoinOutcome::Joined { seat } => (seat, false),
            JoinOutcome::Reconnected { seat } => (seat, true),
        };
        let is_admin = self.room.is_admin(player_id);
        let players = self.room.player_infos();

        self.broadcaster.send_to(
            player_id,
            ServerEvent::RoomJoined {
                room_code: self.room.code.to_string(),
                player_id,
                seat,
                is_admin,
                players: players.clone(),
                phase: self.phase(),
                reconnected,
            },
        );

        if reconnected {
            let was_in_grace = self.supervisor.cancel_grace(player_id);
            info!(room = %self.room.code, player = %player_id, seat, was_in_grace, "player reconnected");
            self.broadcaster
                .broadcast_except(player_id, ServerEvent::PlayerReconnected { player_id, seat });
            self.send_snapshot(player_id);
            if self.current_turn_seat() == Some(seat) {
                self.refresh_turn();
            }
        } else {
            info!(room = %self.room.code, player = %player_id, seat, "player joined");
            if let Some(player) = players.into_iter().find(|p| p.player_id == player_id) {
                self.broadcaster
                    .broadcast_except(player_id, ServerEvent::PlayerJoined { player });
            }
        }

        Ok(json!({
            "room_code": self.room.code.as_str(),
            "seat": seat,
            "is_admin": is_admin,
            "reconnected": reconnected,
        }))
    }

    fn leave(&mut self, player_id: Uuid) -> Result<Value, RoomError> {
        let outcome = self.room.leave(player_id)?;
        self.supervisor.cancel_grace(player_id);
        self.broadcaster.unsubscribe(player_id);
        info!(
            room = %self.room.code,
            player = %player_id,
            disbanded = outcome.disbanded,
            "player left"
        );
        self.broadcaster.broadcast(ServerEvent::PlayerLeft {
            player_id,
            seat: outcome.seat,
            reason: LeaveReason::Left,
            new_admin_id: outcome.new_admin,
        });
        Ok(Value::Null)
    }

    fn handle_disconnect(&mut self, player_id: Uuid, connection_id: Uuid) {
        if !self.broadcaster.is_current(player_id, connection_id) {
            debug!(room = %self.room.code, player = %player_id, "ignoring stale disconnect");
            return;
        }
        self.broadcaster.unsubscribe(player_id);

        match self.room.lifecycle {
            RoomLifecycle::Forming => {
                if let Ok(outcome) = self.room.leave(player_id) {
                    info!(
                        room = %self.room.code,
                        player = %player_id,
                        still_connected = self.broadcaster.open_count(),
                        "player disconnected before start"
                    );
                    self.broadcaster.broadcast(ServerEvent::PlayerLeft {
                        player_id,
                        seat: outcome.seat,
                        reason: LeaveReason::Disconnected,
                        new_admin_id: outcome.new_admin,
                    });
                }
            }
            RoomLifecycle::InGame => {
                let Some(seat) = self.room.seat_of(player_id) else {
                    return;
                };
                self.room.set_status(player_id, ConnectionStatus::GracePeriod);
                let period = self.supervisor.start_grace(player_id);
                info!(
                    room = %self.room.code,
                    player = %player_id,
                    seat,
                    grace_secs = period.as_secs(),
                    still_connected = self.broadcaster.open_count(),
                    "player disconnected"
                );
                self.broadcaster.broadcast(ServerEvent::PlayerDisconnected {
                    player_id,
                    seat,
                    grace_period_seconds: period.as_secs(),
                });
            }
            RoomLifecycle::Disbanded => {}
        }
    }

    fn expire_grace(&mut self, player_id: Uuid) {
        self.room.set_status(player_id, ConnectionStatus::Disconnected);
        let seat = self.room.seat_of(player_id);
        info!(room = %self.room.code, player = %player_id, ?seat, "grace period expired");
        self.broadcaster.broadcast(ServerEvent::PlayerLeft {
            player_id,
            seat,
            reason: LeaveReason::GraceExpired,
            new_admin_id: None,
        });

        if self.room.disband_if_abandoned() {
            return;
        }
        if let Some(seat) = seat {
            if self.current_turn_seat() == Some(seat) {
                self.supervisor.cancel_turn();
                self.auto_act(seat);
            }
        }
    }

    // ==================== Commands ====================

    fn handle_player(&mut self, player_id: Uuid, command: PlayerCommand) -> Result<Value, RoomError> {
        let seat = self.room.seat_of(player_id).ok_or(RoomError::NotInRoom)?;

        match command {
            PlayerCommand::Leave => self.leave(player_id),
            PlayerCommand::Sync => {
                self.send_snapshot(player_id);
                Ok(Value::Null)
            }
            PlayerCommand::Start => self.start(player_id),
            PlayerCommand::RandomizeSeats => {
                self.room.randomize_seats(player_id, &mut self.rng)?;
                self.seats_changed();
                Ok(Value::Null)
            }
            PlayerCommand::ChangeSeat { seat: target } => {
                self.room.change_seat(player_id, target)?;
                self.seats_changed();
                Ok(json!({ "seat": target }))
            }
            PlayerCommand::BidTrump { amount, suit } => {
                self.play(player_id, seat, GameAction::BidTrump { amount, suit })
            }
            PlayerCommand::Pass => self.play(player_id, seat, GameAction::Pass),
            PlayerCommand::BidContract { amount } => {
                self.play(player_id, seat, GameAction::BidContract { amount })
            }
            PlayerCommand::ClaimTrick => self.play(player_id, seat, GameAction::ClaimTrick),
            PlayerCommand::UndoTrick { player_id: target } => {
                if !self.room.is_admin(player_id) {
                    return Err(GameError::Unauthorized.into());
                }
                let target_seat = self.room.seat_of(target).ok_or(RoomError::NotInRoom)?;
                self.play(player_id, seat, GameAction::UndoTrick { seat: target_seat })
            }
        }
    }

    fn start(&mut self, player_id: Uuid) -> Result<Value, RoomError> {
        self.room.start(player_id)?;
        let session = GameSession::new(self.game_config);
        let opening = session.round_started_event();
        self.session = Some(session);

        info!(room = %self.room.code, rounds = self.game_config.total_rounds, "game started");
        self.broadcaster.broadcast(ServerEvent::GameStarting {
            players: self.room.player_infos(),
            total_rounds: self.game_config.total_rounds,
        });

        if let Err(err) = self.publish(&[opening], Some(player_id), false) {
            self.halt(&err);
            return Err(err.into());
        }
        self.refresh_turn();
        Ok(Value::Null)
    }

    fn play(&mut self, player_id: Uuid, seat: Seat, action: GameAction) -> Result<Value, RoomError> {
        if self.halted {
            return Err(GameError::StateInconsistency(
                "room halted after an inconsistency".to_string(),
            )
            .into());
        }
        let is_admin = self.room.is_admin(player_id);
        self.apply(seat, is_admin, action, Some(player_id), false)?;
        Ok(Value::Null)
    }

    /// Apply an action, publish its events, then re-arm the turn clock.
    fn apply(
        &mut self,
        seat: Seat,
        is_admin: bool,
        action: GameAction,
        actor: Option<Uuid>,
        auto: bool,
    ) -> Result<(), GameError> {
        let session = self.session.as_mut().ok_or(GameError::InvalidPhase)?;
        let events = match session.apply_action(seat, is_admin, action) {
            Ok(events) => events,
            Err(err @ GameError::StateInconsistency(_)) => {
                self.halt(&err);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let published = self
            .publish(&events, actor, auto)
            .and_then(|_| self.check_consistency());
        if let Err(err) = published {
            self.halt(&err);
            return Err(err);
        }
        self.refresh_turn();
        Ok(())
    }

    /// Act for the player at `seat` after their time ran out.
    fn auto_act(&mut self, seat: Seat) {
        if self.halted {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };
        let action = match session.auto_action(seat) {
            Ok(action) => action,
            Err(err) => {
                self.halt(&GameError::StateInconsistency(format!(
                    "no automatic action for seat {}: {}",
                    seat, err
                )));
                return;
            }
        };

        info!(room = %self.room.code, seat, ?action, "acting for absent player");
        if let Err(err) = self.apply(seat, false, action, None, true) {
            if !matches!(err, GameError::StateInconsistency(_)) {
                self.halt(&GameError::StateInconsistency(format!(
                    "automatic {:?} for seat {} rejected: {}",
                    action, seat, err
                )));
            }
        }
    }

    fn check_consistency(&self) -> Result<(), GameError> {
        if let Some(session) = &self.session {
            session.check_invariants()?;
            if !self.room.seats.is_full() {
                return Err(GameError::StateInconsistency(
                    "game running with an empty seat".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Stop accepting game commands and force every client to resync.
    fn halt(&mut self, err: &GameError) {
        error!(room = %self.room.code, error = %err, "state inconsistency, halting room");
        self.halted = true;
        self.supervisor.cancel_turn();
        self.broadcaster.broadcast(ServerEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            recoverable: false,
        });
        let snapshot = self.snapshot();
        self.broadcaster
            .broadcast(ServerEvent::SyncState(Box::new(snapshot)));
    }

    /// Arm the turn clock for whoever is on turn and prompt them.
    fn refresh_turn(&mut self) {
        if self.halted {
            self.supervisor.cancel_turn();
            return;
        }
        match self.turn_prompt() {
            Some(prompt) => {
                self.supervisor.arm_turn(prompt.seat, prompt.phase);
                self.broadcaster
                    .send_to(prompt.player_id, ServerEvent::YourTurn(prompt));
            }
            None => self.supervisor.cancel_turn(),
        }
    }

    fn seats_changed(&mut self) {
        self.broadcaster.broadcast(ServerEvent::SeatsChanged {
            players: self.room.player_infos(),
        });
    }

    fn send_snapshot(&mut self, player_id: Uuid) {
        let snapshot = self.snapshot();
        self.broadcaster
            .send_to(player_id, ServerEvent::SyncState(Box::new(snapshot)));
    }

    // ==================== Views ====================

    fn phase(&self) -> SessionPhase {
        match (self.room.lifecycle, &self.session) {
            (RoomLifecycle::Disbanded, _) => SessionPhase::Disbanded,
            (_, None) => SessionPhase::Forming,
            (_, Some(session)) => match session.phase() {
                GamePhase::TrumpBidding => SessionPhase::TrumpBidding,
                GamePhase::ContractBidding => SessionPhase::ContractBidding,
                GamePhase::Playing => SessionPhase::Playing,
                GamePhase::Finished => SessionPhase::Finished,
            },
        }
    }

    fn current_turn_seat(&self) -> Option<Seat> {
        if self.halted {
            return None;
        }
        self.session.as_ref()?.current_turn().map(|(seat, _)| seat)
    }

    fn player_id_at(&self, seat: Seat) -> Result<Uuid, GameError> {
        self.room.seats.player_at(seat).ok_or_else(|| {
            GameError::StateInconsistency(format!("seat {} is empty during a game", seat))
        })
    }

    fn turn_prompt(&self) -> Option<YourTurn> {
        let prompt = self.session.as_ref()?.turn_prompt()?;
        let current_highest = match prompt.current_highest {
            Some((seat, amount, suit)) => Some(HighestBid {
                player_id: self.player_id_at(seat).ok()?,
                seat,
                amount,
                suit,
            }),
            None => None,
        };
        Some(YourTurn {
            player_id: self.player_id_at(prompt.seat).ok()?,
            seat: prompt.seat,
            phase: prompt.phase,
            round_number: prompt.round_number,
            minimum_bid: prompt.minimum_bid,
            current_highest,
            forbidden_amount: prompt.forbidden_amount,
            current_contract_sum: prompt.current_contract_sum,
            is_last_bidder: prompt.is_last_bidder,
            is_trump_winner: prompt.is_trump_winner,
            trump_winning_bid: prompt.trump_winning_bid,
            time_limit_seconds: self.supervisor.turn_limit(prompt.phase).as_secs(),
        })
    }

    fn standing(&self, entry: &ScoreEntry) -> Result<Standing, GameError> {
        Ok(Standing {
            player_id: self.player_id_at(entry.seat)?,
            seat: entry.seat,
            total_score: entry.total,
            position: entry.rank,
        })
    }

    fn snapshot(&self) -> Snapshot {
        let round = self.session.as_ref().map(|session| {
            let round = session.round();
            let contracts = round.contracts.as_ref();
            RoundSnapshot {
                round_number: round.number,
                dealer_seat: round.dealer,
                frisch_count: round.frisch_count(),
                minimum_bid: round.trump.minimum_bid(),
                trump_bids: round.trump.bids().to_vec(),
                trump: round.trump.result(),
                contracts: contracts.map(|c| c.bids().to_vec()).unwrap_or_default(),
                game_type: contracts.and_then(|c| c.game_type()),
                tricks: round.tricks.counts(),
                total_tricks_played: round.tricks.total_played(),
            }
        });

        let standings = match &self.session {
            Some(session) => {
                let board = session.scoreboard();
                let ranks = board.ranks();
                board
                    .leaderboard()
                    .iter()
                    .filter_map(|&seat| {
                        self.standing(&ScoreEntry {
                            seat,
                            round_score: 0,
                            total: board.total(seat),
                            rank: ranks[seat as usize],
                        })
                        .ok()
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let current_bidder_seat = self.current_turn_seat();
        Snapshot {
            room_code: self.room.code.to_string(),
            lifecycle: self.room.lifecycle,
            phase: self.phase(),
            admin_id: self.room.admin,
            players: self.room.player_infos(),
            total_rounds: self.session.as_ref().map(|s| s.config().total_rounds),
            round,
            current_bidder_id: current_bidder_seat.and_then(|seat| self.room.seats.player_at(seat)),
            current_bidder_seat,
            turn: if self.halted { None } else { self.turn_prompt() },
            standings,
            halted: self.halted,
        }
    }

    // ==================== Publishing ====================

    /// Translate and broadcast game events. Nothing is sent unless every
    /// event translates.
    fn publish(
        &mut self,
        events: &[GameEvent],
        actor: Option<Uuid>,
        auto: bool,
    ) -> Result<(), GameError> {
        let outgoing = events
            .iter()
            .map(|event| self.server_event(event, actor, auto))
            .collect::<Result<Vec<_>, _>>()?;
        for event in outgoing {
            self.broadcaster.broadcast(event);
        }
        Ok(())
    }

    fn server_event(
        &self,
        event: &GameEvent,
        actor: Option<Uuid>,
        auto: bool,
    ) -> Result<ServerEvent, GameError> {
        let code = &self.room.code;
        let id = |seat: Seat| self.player_id_at(seat);
        let next_id = |next: Option<Seat>| next.map(|seat| self.player_id_at(seat)).transpose();

        let translated = match *event {
            GameEvent::RoundStarted {
                round_number,
                dealer,
                minimum_bid,
            } => {
                info!(room = %code, round_number, dealer, "round started");
                ServerEvent::RoundStarted {
                    round_number,
                    dealer_id: id(dealer)?,
                    dealer_seat: dealer,
                    minimum_bid,
                }
            }
            GameEvent::TrumpBidPlaced {
                seat,
                amount,
                suit,
                next,
            } => ServerEvent::BidPlaced {
                phase: BiddingPhase::TrumpBidding,
                player_id: id(seat)?,
                seat,
                amount,
                suit: Some(suit),
                next_bidder_id: next_id(next)?,
                next_bidder_seat: next,
                auto,
            },
            GameEvent::TrumpPassed {
                seat,
                consecutive_passes,
                next,
            } => ServerEvent::BidPassed {
                player_id: id(seat)?,
                seat,
                consecutive_passes,
                next_bidder_id: next_id(next)?,
                next_bidder_seat: next,
                auto,
            },
            GameEvent::FrischStarted {
                frisch_count,
                minimum_bid,
                first_bidder,
            } => {
                info!(room = %code, frisch_count, minimum_bid, "all passed, frisch");
                ServerEvent::FrischStarted {
                    frisch_number: frisch_count,
                    new_minimum_bid: minimum_bid,
                    first_bidder_id: id(first_bidder)?,
                    first_bidder_seat: first_bidder,
                }
            }
            GameEvent::TrumpSet {
                winner,
                suit,
                winning_bid,
                frisch_count,
            } => {
                info!(room = %code, winner, %suit, winning_bid, "trump set");
                ServerEvent::TrumpSet {
                    trump_suit: suit,
                    winner_id: id(winner)?,
                    winner_seat: winner,
                    winning_bid,
                    frisch_count,
                }
            }
            GameEvent::ContractPlaced { seat, amount, next } => ServerEvent::BidPlaced {
                phase: BiddingPhase::ContractBidding,
                player_id: id(seat)?,
                seat,
                amount,
                suit: None,
                next_bidder_id: next_id(next)?,
                next_bidder_seat: next,
                auto,
            },
            GameEvent::ContractsSet {
                ref contracts,
                total,
                game_type,
                first_to_act,
            } => {
                info!(room = %code, total, ?game_type, "contracts set");
                let contracts = contracts
                    .iter()
                    .map(|&(seat, amount)| {
                        Ok(ContractInfo {
                            player_id: id(seat)?,
                            seat,
                            amount,
                        })
                    })
                    .collect::<Result<Vec<_>, GameError>>()?;
                ServerEvent::ContractsSet {
                    contracts,
                    total,
                    game_type,
                    first_to_act_id: id(first_to_act)?,
                    first_to_act_seat: first_to_act,
                }
            }
            GameEvent::TrickClaimed {
                seat,
                tricks,
                total_played,
                remaining,
            } => ServerEvent::TrickWon {
                player_id: id(seat)?,
                seat,
                tricks_won: tricks,
                total_played,
                remaining,
            },
            GameEvent::TrickUndone {
                seat,
                tricks,
                total_played,
            } => ServerEvent::TrickUndone {
                player_id: id(seat)?,
                seat,
                tricks_won: tricks,
                total_played,
                undone_by: actor.ok_or_else(|| {
                    GameError::StateInconsistency("trick undone without an admin".to_string())
                })?,
            },
            GameEvent::RoundCompleted(ref summary) => {
                info!(room = %code, round = summary.round_number, "round complete");
                let results = summary
                    .results
                    .iter()
                    .map(|r| {
                        let entry = summary
                            .standings
                            .iter()
                            .find(|e| e.seat == r.seat)
                            .ok_or_else(|| {
                                GameError::StateInconsistency(format!(
                                    "no standing for seat {}",
                                    r.seat
                                ))
                            })?;
                        Ok(PlayerRoundResult {
                            player_id: id(r.seat)?,
                            seat: r.seat,
                            contract: r.contract,
                            tricks_won: r.tricks_won,
                            made: r.made,
                            round_score: r.round_score,
                            total_score: entry.total,
                            position: entry.rank,
                        })
                    })
                    .collect::<Result<Vec<_>, GameError>>()?;
                ServerEvent::RoundComplete(RoundComplete {
                    round_number: summary.round_number,
                    trump_suit: summary.trump_suit,
                    trump_winner_id: id(summary.trump_winner)?,
                    winning_bid: summary.winning_bid,
                    frisch_count: summary.frisch_count,
                    game_type: summary.game_type,
                    results,
                })
            }
            GameEvent::GameFinished { ref standings } => {
                info!(room = %code, "game finished");
                ServerEvent::GameFinished {
                    standings: standings
                        .iter()
                        .map(|e| self.standing(e))
                        .collect::<Result<Vec<_>, _>>()?,
                }
            }
        };
        Ok(translated)
    }
}
