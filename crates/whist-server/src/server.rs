//! WebSocket server and connection handling.

use crate::actor::{ActorConfig, RoomHandle, RoomSessionActor};
use crate::config::ServerConfig;
use crate::protocol::{
    Ack, ClientCommand, FrameError, PlayerCommand, ServerEvent, ServerMessage,
};
use crate::room::{PlayerIdentity, RoomCode, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All running rooms by code
    pub rooms: DashMap<RoomCode, RoomHandle>,
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
        }
    }

    pub fn room(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms
            .get(code)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Start an actor for `code`, or return the one already running. The
    /// directory entry is removed when the actor stops.
    pub fn open_room(self: &Arc<Self>, code: RoomCode) -> RoomHandle {
        let mut fresh = None;
        let handle = self
            .rooms
            .entry(code.clone())
            .and_modify(|existing| {
                if existing.is_closed() {
                    let (handle, task) =
                        RoomSessionActor::spawn(code.clone(), ActorConfig::from(&self.config));
                    *existing = handle;
                    fresh = Some(task);
                }
            })
            .or_insert_with(|| {
                let (handle, task) =
                    RoomSessionActor::spawn(code.clone(), ActorConfig::from(&self.config));
                fresh = Some(task);
                handle
            })
            .value()
            .clone();

        if let Some(task) = fresh {
            info!(room = %code, "room created");
            let state = Arc::clone(self);
            let watched = handle.clone();
            tokio::spawn(async move {
                if let Err(e) = task.await {
                    error!(room = %watched.code(), "room actor failed: {}", e);
                }
                state
                    .rooms
                    .remove_if(watched.code(), |_, current| current.same_room(&watched));
            });
        }
        handle
    }

    /// Room a player asked to join. Unknown codes open a new room when
    /// auto-creation is enabled.
    pub fn room_for_join(self: &Arc<Self>, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.room(code) {
            return Ok(handle);
        }
        if self.config.auto_create_rooms {
            Ok(self.open_room(code.clone()))
        } else {
            Err(RoomError::RoomNotFound)
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Run the WebSocket server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = state.config.addr;
    let listener = TcpListener::bind(addr).await?;
    info!("Whist server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Resolve the identity carried in the handshake query string
/// (`?player_id=<uuid>&name=<display name>`).
pub fn identity_from_query(query: Option<&str>) -> PlayerIdentity {
    let mut id = None;
    let mut name = None;
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "player_id" => match Uuid::parse_str(&value) {
                Ok(parsed) => id = Some(parsed),
                Err(_) => warn!("ignoring malformed player_id {:?}", value),
            },
            "name" if !value.trim().is_empty() => name = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let id = id.unwrap_or_else(Uuid::new_v4);
    let name = name.unwrap_or_else(|| format!("Player-{}", &id.simple().to_string()[..4]));
    PlayerIdentity { id, name }
}

/// Per-connection state: who is talking and which room they are in.
struct Connection {
    identity: PlayerIdentity,
    connection_id: Uuid,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    room: Option<RoomHandle>,
}

impl Connection {
    fn send(&self, event: ServerEvent) {
        let _ = self.outbound.send(ServerMessage::now(event));
    }

    fn reply(&self, ack_id: Option<u64>, result: Result<Value, RoomError>) {
        match (ack_id, result) {
            (Some(ack_id), Ok(data)) => self.send(ServerEvent::Ack(Ack::ok(ack_id, data))),
            (Some(ack_id), Err(e)) => {
                self.send(ServerEvent::Ack(Ack::failed(ack_id, e.code(), e.to_string())))
            }
            (None, Ok(_)) => {}
            (None, Err(e)) => self.send_error(&e),
        }
    }

    fn send_error(&self, e: &RoomError) {
        self.send(ServerEvent::Error {
            code: e.code().to_string(),
            message: e.to_string(),
            recoverable: e.recoverable(),
        });
    }

    /// A frame that did not parse always gets an `error` event, and a
    /// failed ack as well when it carried an ack id.
    fn reject_frame(&self, frame: FrameError) {
        let err = RoomError::from(whist_core::GameError::Validation(frame.message));
        self.send_error(&err);
        if frame.ack_id.is_some() {
            self.reply(frame.ack_id, Err(err));
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let mut query = None;
    let ws_stream = accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            query = req.uri().query().map(str::to_owned);
            Ok(resp)
        },
    )
    .await?;

    let identity = identity_from_query(query.as_deref());
    let player_id = identity.id;
    info!(player = %player_id, name = %identity.name, "New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize outgoing message: {}", e),
            }
        }
    });

    let mut conn = Connection {
        identity,
        connection_id: Uuid::new_v4(),
        outbound: tx,
        room: None,
    };
    conn.send(ServerEvent::Welcome {
        player_id,
        name: conn.identity.name.clone(),
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match ClientCommand::parse(&text) {
                Ok((ack_id, command)) => {
                    let result = handle_command(&mut conn, command, &state).await;
                    conn.reply(ack_id, result);
                }
                Err(e) => {
                    warn!(player = %player_id, "Invalid message: {}", e.message);
                    conn.reject_frame(e);
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    if let Some(room) = conn.room.take() {
        room.disconnected(player_id, conn.connection_id).await;
    }
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Route a parsed command to the right room.
async fn handle_command(
    conn: &mut Connection,
    command: ClientCommand,
    state: &Arc<ServerState>,
) -> Result<Value, RoomError> {
    let addressed = command.room_code().map(RoomCode::parse).transpose()?;

    let Some(player_command) = command.into_player_command() else {
        // room:join always names its room
        let code = addressed.ok_or(RoomError::NotInRoom)?;
        return join_room(conn, code, state).await;
    };

    let room = match (&conn.room, addressed) {
        (Some(room), Some(code)) if room.code() != &code => return Err(RoomError::NotInRoom),
        (Some(room), _) => room.clone(),
        (None, _) => return Err(RoomError::NotInRoom),
    };

    debug!(player = %conn.identity.id, room = %room.code(), ?player_command, "command");
    let result = room.command(conn.identity.id, player_command).await;
    if player_command == PlayerCommand::Leave && result.is_ok() {
        conn.room = None;
    }
    result
}

async fn join_room(
    conn: &mut Connection,
    code: RoomCode,
    state: &Arc<ServerState>,
) -> Result<Value, RoomError> {
    if let Some(current) = &conn.room {
        if current.code() != &code {
            return Err(whist_core::GameError::Validation(format!(
                "Already in room {}; leave it first",
                current.code()
            ))
            .into());
        }
    }

    let room = state.room_for_join(&code)?;
    let ack = room
        .join(conn.identity.clone(), conn.connection_id, conn.outbound.clone())
        .await?;
    conn.room = Some(room);
    Ok(ack)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(auto_create_rooms: bool) -> Arc<ServerState> {
        Arc::new(ServerState::new(ServerConfig {
            auto_create_rooms,
            ..ServerConfig::default()
        }))
    }

    #[test]
    fn test_identity_from_query() {
        let id = Uuid::new_v4();
        let query = format!("player_id={}&name=Noa%20Levi", id);
        let identity = identity_from_query(Some(&query));
        assert_eq!(identity.id, id);
        assert_eq!(identity.name, "Noa Levi");

        let anonymous = identity_from_query(None);
        assert!(anonymous.name.starts_with("Player-"));

        let malformed = identity_from_query(Some("player_id=not-a-uuid"));
        assert_ne!(malformed.id, Uuid::nil());
    }

    fn connection() -> (Connection, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection {
            identity: PlayerIdentity {
                id: Uuid::new_v4(),
                name: "Tester".into(),
            },
            connection_id: Uuid::new_v4(),
            outbound: tx,
            room: None,
        };
        (conn, rx)
    }

    #[test]
    fn test_malformed_frame_gets_error_and_failed_ack() {
        let (conn, mut rx) = connection();
        let text = r#"{"event":"bid:contract","data":{"amount":3,"extra":1},"ack_id":7}"#;
        let frame = ClientCommand::parse(text).unwrap_err();
        conn.reject_frame(frame);

        match rx.try_recv().map(|m| m.event) {
            Ok(ServerEvent::Error {
                code, recoverable, ..
            }) => {
                assert_eq!(code, "VALIDATION_ERROR");
                assert!(recoverable);
            }
            other => panic!("expected error event, got {:?}", other),
        }
        match rx.try_recv().map(|m| m.event) {
            Ok(ServerEvent::Ack(ack)) => {
                assert_eq!(ack.ack_id, 7);
                assert!(!ack.success);
                assert_eq!(ack.error_code.as_deref(), Some("VALIDATION_ERROR"));
            }
            other => panic!("expected failed ack, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_malformed_frame_without_ack_id_gets_only_error() {
        let (conn, mut rx) = connection();
        let frame = ClientCommand::parse("not json").unwrap_err();
        conn.reject_frame(frame);

        assert!(matches!(
            rx.try_recv().map(|m| m.event),
            Ok(ServerEvent::Error { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_for_join_respects_auto_create() {
        let code = RoomCode::parse("abc123").unwrap();
        assert!(matches!(
            state(false).room_for_join(&code),
            Err(RoomError::RoomNotFound)
        ));

        let state = state(true);
        let first = state.room_for_join(&code).unwrap();
        let second = state.room_for_join(&code).unwrap();
        assert!(first.same_room(&second));
        assert_eq!(state.room_count(), 1);
    }

    #[tokio::test]
    async fn test_disbanded_room_leaves_directory() {
        let state = state(true);
        let code = RoomCode::parse("ZZZ999").unwrap();
        let room = state.open_room(code.clone());

        let (tx, _rx) = mpsc::unbounded_channel();
        let identity = PlayerIdentity {
            id: Uuid::new_v4(),
            name: "Solo".into(),
        };
        let player = identity.id;
        room.join(identity, Uuid::new_v4(), tx).await.unwrap();
        room.command(player, PlayerCommand::Leave).await.unwrap();

        for _ in 0..50 {
            if state.room_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(state.room_count(), 0);
        assert!(state.room(&code).is_none());
    }
}
