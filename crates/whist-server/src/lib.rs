//! Whist multiplayer room server.
//!
//! One actor task per room owns seating, the game session and the timers
//! for that room. Connections talk to rooms through [`actor::RoomHandle`].

pub mod actor;
pub mod broadcast;
pub mod config;
pub mod protocol;
pub mod room;
pub mod server;
pub mod supervisor;

pub use actor::{ActorConfig, RoomCommand, RoomHandle, RoomSessionActor};
pub use config::{ServerConfig, TimerConfig};
pub use room::{RoomCode, RoomError};
pub use server::{run_server, ServerState};
