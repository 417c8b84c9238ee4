//! Fan-out of room events to connected players.

use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{ServerEvent, ServerMessage};

struct Subscriber {
    connection_id: Uuid,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

/// Outbound channels of the players currently connected to one room.
///
/// Sends never wait on a socket: each connection drains its own channel,
/// so a slow client cannot hold up the room.
#[derive(Default)]
pub struct EventBroadcaster {
    subscribers: HashMap<Uuid, Subscriber>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player's connection, replacing any older one. The entry
    /// stays until the player unsubscribes or reconnects, even after its
    /// channel closes, so `is_current` keeps recognising that connection.
    pub fn subscribe(
        &mut self,
        player_id: Uuid,
        connection_id: Uuid,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) {
        self.subscribers.insert(
            player_id,
            Subscriber {
                connection_id,
                sender,
            },
        );
    }

    /// Drop the player's channel. Returns false if none was registered.
    pub fn unsubscribe(&mut self, player_id: Uuid) -> bool {
        self.subscribers.remove(&player_id).is_some()
    }

    /// Whether `connection_id` is the player's live connection.
    pub fn is_current(&self, player_id: Uuid, connection_id: Uuid) -> bool {
        self.subscribers
            .get(&player_id)
            .map(|s| s.connection_id == connection_id)
            .unwrap_or(false)
    }

    /// Players whose channel is still open.
    pub fn open_count(&self) -> usize {
        self.subscribers
            .values()
            .filter(|s| !s.sender.is_closed())
            .count()
    }

    /// Send an event to one player.
    pub fn send_to(&self, player_id: Uuid, event: ServerEvent) {
        self.deliver(Some(player_id), None, ServerMessage::now(event));
    }

    /// Send an event to every connected player.
    pub fn broadcast(&self, event: ServerEvent) {
        self.deliver(None, None, ServerMessage::now(event));
    }

    /// Send an event to everyone except one player.
    pub fn broadcast_except(&self, except: Uuid, event: ServerEvent) {
        self.deliver(None, Some(except), ServerMessage::now(event));
    }

    fn deliver(&self, only: Option<Uuid>, except: Option<Uuid>, msg: ServerMessage) {
        for (player_id, subscriber) in &self.subscribers {
            if only.map_or(false, |id| id != *player_id) || except == Some(*player_id) {
                continue;
            }
            if subscriber.sender.is_closed() {
                continue;
            }
            if subscriber.sender.send(msg.clone()).is_err() {
                debug!(player = %player_id, "subscriber channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_event() -> ServerEvent {
        ServerEvent::Error {
            code: "TEST".into(),
            message: "test".into(),
            recoverable: true,
        }
    }

    #[test]
    fn test_broadcast_except() {
        let mut broadcaster = EventBroadcaster::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        broadcaster.subscribe(a, Uuid::new_v4(), tx_a);
        broadcaster.subscribe(b, Uuid::new_v4(), tx_b);

        broadcaster.broadcast_except(a, error_event());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());

        broadcaster.send_to(a, error_event());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_keeps_connection_current() {
        let mut broadcaster = EventBroadcaster::new();
        let (player, other) = (Uuid::new_v4(), Uuid::new_v4());
        let connection = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let (tx_other, mut rx_other) = mpsc::unbounded_channel();
        broadcaster.subscribe(player, connection, tx);
        broadcaster.subscribe(other, Uuid::new_v4(), tx_other);
        drop(rx);

        broadcaster.broadcast(error_event());
        assert!(rx_other.try_recv().is_ok());
        assert_eq!(broadcaster.open_count(), 1);
        assert!(broadcaster.is_current(player, connection));

        assert!(broadcaster.unsubscribe(player));
        assert!(!broadcaster.is_current(player, connection));
    }

    #[test]
    fn test_replaced_connection_is_not_current() {
        let mut broadcaster = EventBroadcaster::new();
        let player = Uuid::new_v4();
        let (old, new) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx, _rx) = mpsc::unbounded_channel();
        broadcaster.subscribe(player, old, tx.clone());
        broadcaster.subscribe(player, new, tx);

        assert!(!broadcaster.is_current(player, old));
        assert!(broadcaster.is_current(player, new));
    }
}
