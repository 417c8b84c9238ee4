//! Room membership, seating and admin rules.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;
use whist_core::{is_valid_seat, GameError, Seat, ALL_SEATS, SEAT_COUNT};

use crate::protocol::PlayerInfo;

/// Length of a room code
pub const ROOM_CODE_LEN: usize = 6;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    NotInRoom,

    #[error("Room is closed")]
    RoomClosed,

    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),
}

impl RoomError {
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::Game(e) => e.code(),
            RoomError::RoomNotFound => "ROOM_NOT_FOUND",
            RoomError::RoomFull => "ROOM_FULL",
            RoomError::NotInRoom => "NOT_IN_ROOM",
            RoomError::RoomClosed => "ROOM_CLOSED",
            RoomError::InvalidRoomCode(_) => "INVALID_ROOM_CODE",
        }
    }

    pub fn recoverable(&self) -> bool {
        match self {
            RoomError::Game(e) => e.recoverable(),
            _ => true,
        }
    }
}

/// A validated, uppercase room code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalize and validate a code typed by a player.
    pub fn parse(raw: &str) -> Result<Self, RoomError> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = code.len() == ROOM_CODE_LEN
            && code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !valid {
            return Err(RoomError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a connection belongs to, as resolved by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub id: Uuid,
    pub name: String,
}

/// Which player sits in which of the four seats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatRegistry {
    seats: [Option<Uuid>; 4],
}

impl SeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_at(&self, seat: Seat) -> Option<Uuid> {
        self.seats.get(seat as usize).copied().flatten()
    }

    pub fn seat_of(&self, player: Uuid) -> Option<Seat> {
        ALL_SEATS
            .into_iter()
            .find(|&seat| self.player_at(seat) == Some(player))
    }

    pub fn first_free(&self) -> Option<Seat> {
        ALL_SEATS
            .into_iter()
            .find(|&seat| self.player_at(seat).is_none())
    }

    pub fn occupied(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied() == SEAT_COUNT as usize
    }

    /// Occupied seats in seat order.
    pub fn iter(&self) -> impl Iterator<Item = (Seat, Uuid)> + '_ {
        ALL_SEATS
            .into_iter()
            .filter_map(|seat| self.player_at(seat).map(|player| (seat, player)))
    }

    /// Put `player` in `seat`, vacating any seat they held before.
    pub fn assign_seat(&mut self, player: Uuid, seat: Seat) -> Result<(), GameError> {
        if !is_valid_seat(seat) {
            return Err(GameError::Validation(format!(
                "Seat must be between 0 and {}",
                SEAT_COUNT - 1
            )));
        }
        match self.player_at(seat) {
            Some(occupant) if occupant == player => return Ok(()),
            Some(_) => return Err(GameError::SeatTaken),
            None => {}
        }
        self.remove(player);
        self.seats[seat as usize] = Some(player);
        Ok(())
    }

    /// Free the player's seat. Returns the seat they held.
    pub fn remove(&mut self, player: Uuid) -> Option<Seat> {
        let seat = self.seat_of(player)?;
        self.seats[seat as usize] = None;
        Some(seat)
    }

    /// Shuffle the seated players into seats `0..n`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut players: Vec<Uuid> = self.seats.iter().flatten().copied().collect();
        players.shuffle(rng);
        self.seats = [None; 4];
        for (slot, player) in self.seats.iter_mut().zip(players) {
            *slot = Some(player);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    GracePeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomLifecycle {
    Forming,
    InGame,
    Disbanded,
}

/// A player in a room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub status: ConnectionStatus,
}

impl RoomPlayer {
    pub fn new(identity: PlayerIdentity) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            status: ConnectionStatus::Connected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { seat: Seat },
    /// The player already held a seat here
    Reconnected { seat: Seat },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub seat: Option<Seat>,
    pub new_admin: Option<Uuid>,
    pub disbanded: bool,
}

/// A room of up to four players.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub admin: Option<Uuid>,
    pub seats: SeatRegistry,
    pub players: HashMap<Uuid, RoomPlayer>,
    pub lifecycle: RoomLifecycle,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            admin: None,
            seats: SeatRegistry::new(),
            players: HashMap::new(),
            lifecycle: RoomLifecycle::Forming,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_admin(&self, player: Uuid) -> bool {
        self.admin == Some(player)
    }

    pub fn seat_of(&self, player: Uuid) -> Option<Seat> {
        self.seats.seat_of(player)
    }

    pub fn status_of(&self, player: Uuid) -> Option<ConnectionStatus> {
        self.players.get(&player).map(|p| p.status)
    }

    /// Seat a new player in the lowest free seat, or recognise a returning
    /// one.
    pub fn join(&mut self, identity: PlayerIdentity) -> Result<JoinOutcome, RoomError> {
        if self.lifecycle == RoomLifecycle::Disbanded {
            return Err(RoomError::RoomClosed);
        }
        if let Some(seat) = self.seat_of(identity.id) {
            if let Some(player) = self.players.get_mut(&identity.id) {
                player.status = ConnectionStatus::Connected;
            }
            return Ok(JoinOutcome::Reconnected { seat });
        }
        if self.lifecycle != RoomLifecycle::Forming {
            return Err(RoomError::RoomFull);
        }

        let seat = self.seats.first_free().ok_or(RoomError::RoomFull)?;
        self.seats.assign_seat(identity.id, seat)?;
        if self.admin.is_none() {
            self.admin = Some(identity.id);
        }
        self.players.insert(identity.id, RoomPlayer::new(identity));
        Ok(JoinOutcome::Joined { seat })
    }

    /// Leave the room. While forming the seat is freed; in a game the seat
    /// is kept and the player is marked disconnected.
    pub fn leave(&mut self, player: Uuid) -> Result<LeaveOutcome, RoomError> {
        if !self.players.contains_key(&player) {
            return Err(RoomError::NotInRoom);
        }

        match self.lifecycle {
            RoomLifecycle::Forming => {
                self.players.remove(&player);
                let seat = self.seats.remove(player);

                let mut new_admin = None;
                if self.admin == Some(player) {
                    // Lowest occupied seat inherits admin
                    self.admin = self.seats.iter().next().map(|(_, id)| id);
                    new_admin = self.admin;
                }
                if self.players.is_empty() {
                    self.lifecycle = RoomLifecycle::Disbanded;
                }
                Ok(LeaveOutcome {
                    seat,
                    new_admin,
                    disbanded: self.lifecycle == RoomLifecycle::Disbanded,
                })
            }
            RoomLifecycle::InGame => {
                self.set_status(player, ConnectionStatus::Disconnected);
                self.disband_if_abandoned();
                Ok(LeaveOutcome {
                    seat: self.seat_of(player),
                    new_admin: None,
                    disbanded: self.lifecycle == RoomLifecycle::Disbanded,
                })
            }
            RoomLifecycle::Disbanded => Err(RoomError::RoomClosed),
        }
    }

    pub fn set_status(&mut self, player: Uuid, status: ConnectionStatus) {
        if let Some(p) = self.players.get_mut(&player) {
            p.status = status;
        }
    }

    /// Disband an in-game room once nobody is connected or expected back.
    pub fn disband_if_abandoned(&mut self) -> bool {
        let abandoned = self
            .players
            .values()
            .all(|p| p.status == ConnectionStatus::Disconnected);
        if abandoned && self.lifecycle == RoomLifecycle::InGame {
            self.lifecycle = RoomLifecycle::Disbanded;
        }
        self.lifecycle == RoomLifecycle::Disbanded
    }

    /// Begin the game. Admin only, with all four seats filled.
    pub fn start(&mut self, requester: Uuid) -> Result<(), RoomError> {
        if !self.is_admin(requester) {
            return Err(GameError::Unauthorized.into());
        }
        if self.lifecycle != RoomLifecycle::Forming {
            return Err(GameError::InvalidPhase.into());
        }
        if !self.seats.is_full() {
            return Err(GameError::Validation(format!(
                "Need {} players to start, have {}",
                SEAT_COUNT,
                self.seats.occupied()
            ))
            .into());
        }
        self.lifecycle = RoomLifecycle::InGame;
        Ok(())
    }

    pub fn randomize_seats<R: Rng + ?Sized>(
        &mut self,
        requester: Uuid,
        rng: &mut R,
    ) -> Result<(), RoomError> {
        if !self.is_admin(requester) {
            return Err(GameError::Unauthorized.into());
        }
        if self.lifecycle != RoomLifecycle::Forming {
            return Err(GameError::InvalidPhase.into());
        }
        self.seats.randomize(rng);
        Ok(())
    }

    pub fn change_seat(&mut self, player: Uuid, seat: Seat) -> Result<(), RoomError> {
        if !self.players.contains_key(&player) {
            return Err(RoomError::NotInRoom);
        }
        if self.lifecycle != RoomLifecycle::Forming {
            return Err(GameError::InvalidPhase.into());
        }
        self.seats.assign_seat(player, seat)?;
        Ok(())
    }

    /// Seated players in seat order.
    pub fn player_infos(&self) -> Vec<PlayerInfo> {
        self.seats
            .iter()
            .filter_map(|(seat, id)| {
                self.players.get(&id).map(|p| PlayerInfo {
                    player_id: p.id,
                    name: p.name.clone(),
                    seat,
                    is_admin: self.is_admin(p.id),
                    status: p.status,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn identity(name: &str) -> PlayerIdentity {
        PlayerIdentity {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    fn full_room() -> (Room, Vec<Uuid>) {
        let mut room = Room::new(RoomCode::parse("ABC123").unwrap());
        let ids = (0..4)
            .map(|i| {
                let who = identity(&format!("P{}", i));
                let id = who.id;
                room.join(who).unwrap();
                id
            })
            .collect();
        (room, ids)
    }

    #[test]
    fn test_room_code_normalization() {
        assert_eq!(RoomCode::parse(" ab12cd ").unwrap().as_str(), "AB12CD");
        assert!(matches!(RoomCode::parse("AB12C"), Err(RoomError::InvalidRoomCode(_))));
        assert!(matches!(RoomCode::parse("AB-12C"), Err(RoomError::InvalidRoomCode(_))));
    }

    #[test]
    fn test_join_assigns_lowest_free_seat() {
        let (mut room, ids) = full_room();
        assert_eq!(room.seat_of(ids[2]), Some(2));
        assert!(room.is_admin(ids[0]));

        room.leave(ids[1]).unwrap();
        let late = identity("Late");
        let late_id = late.id;
        assert_eq!(room.join(late).unwrap(), JoinOutcome::Joined { seat: 1 });
        assert_eq!(room.seat_of(late_id), Some(1));

        assert_eq!(room.join(identity("Fifth")), Err(RoomError::RoomFull));
    }

    #[test]
    fn test_rejoin_is_reconnect() {
        let mut room = Room::new(RoomCode::parse("ABC123").unwrap());
        let who = identity("Dana");
        room.join(who.clone()).unwrap();
        assert_eq!(room.join(who).unwrap(), JoinOutcome::Reconnected { seat: 0 });
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn test_seat_taken() {
        let (mut room, ids) = full_room();
        assert_eq!(
            room.change_seat(ids[0], 3),
            Err(RoomError::Game(GameError::SeatTaken))
        );
        room.leave(ids[3]).unwrap();
        room.change_seat(ids[0], 3).unwrap();
        assert_eq!(room.seat_of(ids[0]), Some(3));
        assert_eq!(room.seats.player_at(0), None);

        assert!(matches!(
            room.change_seat(ids[0], 4),
            Err(RoomError::Game(GameError::Validation(_)))
        ));
        assert_eq!(room.seat_of(ids[0]), Some(3));
    }

    #[test]
    fn test_admin_migrates_to_lowest_seat() {
        let (mut room, ids) = full_room();
        let outcome = room.leave(ids[0]).unwrap();
        assert_eq!(outcome.new_admin, Some(ids[1]));
        assert!(room.is_admin(ids[1]));
        assert!(!outcome.disbanded);
    }

    #[test]
    fn test_last_leave_disbands() {
        let mut room = Room::new(RoomCode::parse("ABC123").unwrap());
        let who = identity("Solo");
        let id = who.id;
        room.join(who).unwrap();
        let outcome = room.leave(id).unwrap();
        assert!(outcome.disbanded);
        assert_eq!(room.lifecycle, RoomLifecycle::Disbanded);
        assert_eq!(room.join(identity("Late")), Err(RoomError::RoomClosed));
    }

    #[test]
    fn test_start_rules() {
        let mut room = Room::new(RoomCode::parse("ABC123").unwrap());
        let admin = identity("Admin");
        let admin_id = admin.id;
        room.join(admin).unwrap();
        assert!(matches!(room.start(admin_id), Err(RoomError::Game(GameError::Validation(_)))));

        let (mut room, ids) = full_room();
        assert_eq!(room.start(ids[1]), Err(RoomError::Game(GameError::Unauthorized)));
        room.start(ids[0]).unwrap();
        assert_eq!(room.lifecycle, RoomLifecycle::InGame);
        assert_eq!(room.start(ids[0]), Err(RoomError::Game(GameError::InvalidPhase)));
    }

    #[test]
    fn test_in_game_leave_keeps_seat() {
        let (mut room, ids) = full_room();
        room.start(ids[0]).unwrap();
        let outcome = room.leave(ids[2]).unwrap();
        assert_eq!(outcome.seat, Some(2));
        assert_eq!(room.status_of(ids[2]), Some(ConnectionStatus::Disconnected));
        assert_eq!(room.join(identity("Outsider")), Err(RoomError::RoomFull));

        for id in [ids[0], ids[1], ids[3]] {
            room.leave(id).unwrap();
        }
        assert_eq!(room.lifecycle, RoomLifecycle::Disbanded);
    }

    #[test]
    fn test_randomize_seats() {
        let (mut room, ids) = full_room();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            room.randomize_seats(ids[1], &mut rng),
            Err(RoomError::Game(GameError::Unauthorized))
        );
        room.randomize_seats(ids[0], &mut rng).unwrap();

        let mut seated: Vec<Uuid> = room.seats.iter().map(|(_, id)| id).collect();
        seated.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(seated, expected);

        room.start(ids[0]).unwrap();
        assert_eq!(
            room.randomize_seats(ids[0], &mut rng),
            Err(RoomError::Game(GameError::InvalidPhase))
        );
    }
}
