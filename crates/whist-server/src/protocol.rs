//! WebSocket protocol messages for Whist rooms.
//!
//! Every frame is a JSON object `{"event": ..., "data": ...}`. Client
//! frames may carry an `ack_id`; server frames always carry a timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use whist_core::{
    BiddingPhase, ContractBid, GameType, Seat, Suit, TrumpBid, TrumpResult,
};

use crate::room::{ConnectionStatus, RoomLifecycle};

/// A client frame before its payload is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack_id: Option<u64>,
}

/// A client frame that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameError {
    pub ack_id: Option<u64>,
    pub message: String,
}

/// Payload of commands that carry nothing but the optional room code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomScoped {
    #[serde(default)]
    pub room_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinPayload {
    pub room_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrumpBidPayload {
    pub amount: u8,
    pub suit: Suit,
    #[serde(default)]
    pub room_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractPayload {
    pub amount: u8,
    #[serde(default)]
    pub room_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UndoPayload {
    pub player_id: Uuid,
    #[serde(default)]
    pub room_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeatPayload {
    pub seat: Seat,
    #[serde(default)]
    pub room_code: Option<String>,
}

/// Commands sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientCommand {
    #[serde(rename = "room:join")]
    JoinRoom(JoinPayload),

    #[serde(rename = "room:leave")]
    LeaveRoom(RoomScoped),

    #[serde(rename = "room:start")]
    StartGame(RoomScoped),

    #[serde(rename = "room:randomize_seats")]
    RandomizeSeats(RoomScoped),

    #[serde(rename = "room:change_seat")]
    ChangeSeat(SeatPayload),

    #[serde(rename = "bid:trump")]
    BidTrump(TrumpBidPayload),

    #[serde(rename = "bid:pass")]
    Pass(RoomScoped),

    #[serde(rename = "bid:contract")]
    BidContract(ContractPayload),

    #[serde(rename = "round:claim_trick")]
    ClaimTrick(RoomScoped),

    #[serde(rename = "round:undo_trick")]
    UndoTrick(UndoPayload),

    #[serde(rename = "sync:request")]
    SyncRequest(RoomScoped),
}

impl ClientCommand {
    /// Parse a text frame. Unknown events and payloads with missing or
    /// extra fields are rejected.
    pub fn parse(text: &str) -> Result<(Option<u64>, ClientCommand), FrameError> {
        let raw: RawFrame = serde_json::from_str(text).map_err(|e| FrameError {
            ack_id: None,
            message: format!("Malformed frame: {}", e),
        })?;
        let ack_id = raw.ack_id;

        let data = match raw.data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let tagged = serde_json::json!({ "event": raw.event, "data": data });

        serde_json::from_value(tagged)
            .map(|command| (ack_id, command))
            .map_err(|e| FrameError {
                ack_id,
                message: format!("Invalid {} command: {}", raw.event, e),
            })
    }

    /// Room code the client addressed, if any.
    pub fn room_code(&self) -> Option<&str> {
        match self {
            ClientCommand::JoinRoom(p) => Some(&p.room_code),
            ClientCommand::LeaveRoom(p)
            | ClientCommand::StartGame(p)
            | ClientCommand::RandomizeSeats(p)
            | ClientCommand::Pass(p)
            | ClientCommand::ClaimTrick(p)
            | ClientCommand::SyncRequest(p) => p.room_code.as_deref(),
            ClientCommand::ChangeSeat(p) => p.room_code.as_deref(),
            ClientCommand::BidTrump(p) => p.room_code.as_deref(),
            ClientCommand::BidContract(p) => p.room_code.as_deref(),
            ClientCommand::UndoTrick(p) => p.room_code.as_deref(),
        }
    }

    /// The command as the room actor sees it. `None` for `room:join`,
    /// which the server handles itself.
    pub fn into_player_command(self) -> Option<PlayerCommand> {
        let command = match self {
            ClientCommand::JoinRoom(_) => return None,
            ClientCommand::LeaveRoom(_) => PlayerCommand::Leave,
            ClientCommand::StartGame(_) => PlayerCommand::Start,
            ClientCommand::RandomizeSeats(_) => PlayerCommand::RandomizeSeats,
            ClientCommand::ChangeSeat(p) => PlayerCommand::ChangeSeat { seat: p.seat },
            ClientCommand::BidTrump(p) => PlayerCommand::BidTrump {
                amount: p.amount,
                suit: p.suit,
            },
            ClientCommand::Pass(_) => PlayerCommand::Pass,
            ClientCommand::BidContract(p) => PlayerCommand::BidContract { amount: p.amount },
            ClientCommand::ClaimTrick(_) => PlayerCommand::ClaimTrick,
            ClientCommand::UndoTrick(p) => PlayerCommand::UndoTrick {
                player_id: p.player_id,
            },
            ClientCommand::SyncRequest(_) => PlayerCommand::Sync,
        };
        Some(command)
    }
}

/// A command from a seated player, addressed to their room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Leave,
    Start,
    RandomizeSeats,
    ChangeSeat { seat: Seat },
    BidTrump { amount: u8, suit: Suit },
    Pass,
    BidContract { amount: u8 },
    ClaimTrick,
    UndoTrick { player_id: Uuid },
    Sync,
}

/// Player information in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: Uuid,
    pub name: String,
    pub seat: Seat,
    pub is_admin: bool,
    pub status: ConnectionStatus,
}

/// Combined room and game phase as clients see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Forming,
    TrumpBidding,
    ContractBidding,
    Playing,
    Finished,
    Disbanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    Left,
    Disconnected,
    GraceExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub ack_id: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl Ack {
    pub fn ok(ack_id: u64, data: Value) -> Self {
        Self {
            ack_id,
            success: true,
            data: (!data.is_null()).then_some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn failed(ack_id: u64, code: &str, message: String) -> Self {
        Self {
            ack_id,
            success: false,
            data: None,
            error: Some(message),
            error_code: Some(code.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighestBid {
    pub player_id: Uuid,
    pub seat: Seat,
    pub amount: u8,
    pub suit: Suit,
}

/// Prompt sent to the player whose turn it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YourTurn {
    pub player_id: Uuid,
    pub seat: Seat,
    pub phase: BiddingPhase,
    pub round_number: u8,
    pub minimum_bid: Option<u8>,
    pub current_highest: Option<HighestBid>,
    pub forbidden_amount: Option<u8>,
    pub current_contract_sum: Option<u8>,
    pub is_last_bidder: bool,
    pub is_trump_winner: bool,
    pub trump_winning_bid: Option<u8>,
    pub time_limit_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContractInfo {
    pub player_id: Uuid,
    pub seat: Seat,
    pub amount: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerRoundResult {
    pub player_id: Uuid,
    pub seat: Seat,
    pub contract: u8,
    pub tricks_won: u8,
    pub made: bool,
    pub round_score: i32,
    pub total_score: i64,
    pub position: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundComplete {
    pub round_number: u8,
    pub trump_suit: Suit,
    pub trump_winner_id: Uuid,
    pub winning_bid: u8,
    pub frisch_count: u8,
    pub game_type: GameType,
    pub results: Vec<PlayerRoundResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub player_id: Uuid,
    pub seat: Seat,
    pub total_score: i64,
    pub position: u8,
}

/// Current round as carried in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSnapshot {
    pub round_number: u8,
    pub dealer_seat: Seat,
    pub frisch_count: u8,
    pub minimum_bid: u8,
    pub trump_bids: Vec<TrumpBid>,
    pub trump: Option<TrumpResult>,
    pub contracts: Vec<ContractBid>,
    pub game_type: Option<GameType>,
    pub tricks: [u8; 4],
    pub total_tricks_played: u8,
}

/// Full room state sent on `sync:state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub room_code: String,
    pub lifecycle: RoomLifecycle,
    pub phase: SessionPhase,
    pub admin_id: Option<Uuid>,
    pub players: Vec<PlayerInfo>,
    pub total_rounds: Option<u8>,
    pub round: Option<RoundSnapshot>,
    pub current_bidder_id: Option<Uuid>,
    pub current_bidder_seat: Option<Seat>,
    pub turn: Option<YourTurn>,
    pub standings: Vec<Standing>,
    /// Set once the room stopped accepting game commands
    pub halted: bool,
}

/// Events sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "ack")]
    Ack(Ack),

    #[serde(rename = "session:welcome")]
    Welcome { player_id: Uuid, name: String },

    // ==================== Room ====================
    #[serde(rename = "room:joined")]
    RoomJoined {
        room_code: String,
        player_id: Uuid,
        seat: Seat,
        is_admin: bool,
        players: Vec<PlayerInfo>,
        phase: SessionPhase,
        reconnected: bool,
    },

    #[serde(rename = "room:player_joined")]
    PlayerJoined { player: PlayerInfo },

    #[serde(rename = "room:player_left")]
    PlayerLeft {
        player_id: Uuid,
        seat: Option<Seat>,
        reason: LeaveReason,
        new_admin_id: Option<Uuid>,
    },

    #[serde(rename = "room:player_disconnected")]
    PlayerDisconnected {
        player_id: Uuid,
        seat: Seat,
        grace_period_seconds: u64,
    },

    #[serde(rename = "room:player_reconnected")]
    PlayerReconnected { player_id: Uuid, seat: Seat },

    #[serde(rename = "room:seats_changed")]
    SeatsChanged { players: Vec<PlayerInfo> },

    #[serde(rename = "room:game_starting")]
    GameStarting {
        players: Vec<PlayerInfo>,
        total_rounds: u8,
    },

    // ==================== Bidding ====================
    #[serde(rename = "round:started")]
    RoundStarted {
        round_number: u8,
        dealer_id: Uuid,
        dealer_seat: Seat,
        minimum_bid: u8,
    },

    #[serde(rename = "bid:your_turn")]
    YourTurn(YourTurn),

    #[serde(rename = "bid:placed")]
    BidPlaced {
        phase: BiddingPhase,
        player_id: Uuid,
        seat: Seat,
        amount: u8,
        suit: Option<Suit>,
        next_bidder_id: Option<Uuid>,
        next_bidder_seat: Option<Seat>,
        auto: bool,
    },

    #[serde(rename = "bid:passed")]
    BidPassed {
        player_id: Uuid,
        seat: Seat,
        consecutive_passes: u8,
        next_bidder_id: Option<Uuid>,
        next_bidder_seat: Option<Seat>,
        auto: bool,
    },

    #[serde(rename = "bid:trump_set")]
    TrumpSet {
        trump_suit: Suit,
        winner_id: Uuid,
        winner_seat: Seat,
        winning_bid: u8,
        frisch_count: u8,
    },

    #[serde(rename = "bid:frisch_started")]
    FrischStarted {
        frisch_number: u8,
        new_minimum_bid: u8,
        first_bidder_id: Uuid,
        first_bidder_seat: Seat,
    },

    #[serde(rename = "bid:contracts_set")]
    ContractsSet {
        contracts: Vec<ContractInfo>,
        total: u8,
        game_type: GameType,
        first_to_act_id: Uuid,
        first_to_act_seat: Seat,
    },

    // ==================== Play ====================
    #[serde(rename = "round:trick_won")]
    TrickWon {
        player_id: Uuid,
        seat: Seat,
        tricks_won: u8,
        total_played: u8,
        remaining: u8,
    },

    #[serde(rename = "round:trick_undone")]
    TrickUndone {
        player_id: Uuid,
        seat: Seat,
        tricks_won: u8,
        total_played: u8,
        undone_by: Uuid,
    },

    #[serde(rename = "round:complete")]
    RoundComplete(RoundComplete),

    #[serde(rename = "game:finished")]
    GameFinished { standings: Vec<Standing> },

    // ==================== Sync ====================
    #[serde(rename = "sync:state")]
    SyncState(Box<Snapshot>),

    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
        recoverable: bool,
    },
}

/// A server frame: the event plus the time it was sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerMessage {
    #[serde(flatten)]
    pub event: ServerEvent,
    pub timestamp: DateTime<Utc>,
}

impl ServerMessage {
    pub fn now(event: ServerEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

impl From<ServerEvent> for ServerMessage {
    fn from(event: ServerEvent) -> Self {
        Self::now(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bid_with_ack() {
        let (ack, command) = ClientCommand::parse(
            r#"{"event":"bid:trump","data":{"amount":7,"suit":"hearts"},"ack_id":4}"#,
        )
        .unwrap();
        assert_eq!(ack, Some(4));
        assert_eq!(
            command.into_player_command(),
            Some(PlayerCommand::BidTrump {
                amount: 7,
                suit: Suit::Hearts
            })
        );
    }

    #[test]
    fn test_parse_payloadless_commands() {
        let (_, command) = ClientCommand::parse(r#"{"event":"bid:pass"}"#).unwrap();
        assert_eq!(command, ClientCommand::Pass(RoomScoped::default()));

        let (_, command) =
            ClientCommand::parse(r#"{"event":"sync:request","data":{"room_code":"abc123"}}"#)
                .unwrap();
        assert_eq!(command.room_code(), Some("abc123"));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        let err = ClientCommand::parse(r#"{"event":"bid:contract","data":{},"ack_id":9}"#)
            .unwrap_err();
        assert_eq!(err.ack_id, Some(9));

        assert!(ClientCommand::parse(r#"{"event":"bid:pass","data":{"amount":1}}"#).is_err());
        assert!(ClientCommand::parse(r#"{"event":"bid:contract","data":{"amount":-1}}"#).is_err());
        assert!(ClientCommand::parse(r#"{"event":"chat:send","data":{}}"#).is_err());
        assert!(ClientCommand::parse("not json").is_err());
    }

    #[test]
    fn test_server_frame_shape() {
        let msg = ServerMessage::now(ServerEvent::Error {
            code: "OUT_OF_TURN".into(),
            message: "Not your turn".into(),
            recoverable: true,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["code"], "OUT_OF_TURN");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_ack_shape() {
        let json = serde_json::to_value(ServerMessage::now(ServerEvent::Ack(Ack::failed(
            3,
            "SEAT_TAKEN",
            "Seat is already taken".into(),
        ))))
        .unwrap();
        assert_eq!(json["event"], "ack");
        assert_eq!(json["data"]["ack_id"], 3);
        assert_eq!(json["data"]["success"], false);
        assert_eq!(json["data"]["error_code"], "SEAT_TAKEN");
        assert!(json["data"].get("data").is_none());
    }
}
