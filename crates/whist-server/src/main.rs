//! Whist multiplayer game server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whist_server::{ServerConfig, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!(
        addr = %config.addr,
        rounds = config.game.total_rounds,
        grace_secs = config.timers.grace_period.as_secs(),
        "Starting Whist server..."
    );

    let state = Arc::new(ServerState::new(config));

    whist_server::run_server(state).await
}
