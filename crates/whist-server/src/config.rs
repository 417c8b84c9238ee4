//! Server configuration from environment variables.

use anyhow::Context;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use whist_core::GameConfig;

/// How long the supervisor waits before acting for an absent player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub trump_turn: Duration,
    pub contract_turn: Duration,
    pub grace_period: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            trump_turn: Duration::from_secs(30),
            contract_turn: Duration::from_secs(45),
            grace_period: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub timers: TimerConfig,
    pub game: GameConfig,
    /// Create a room on first join instead of answering `ROOM_NOT_FOUND`
    pub auto_create_rooms: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            timers: TimerConfig::default(),
            game: GameConfig::default(),
            auto_create_rooms: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "SERVER_ADDR")? {
            config.addr = addr;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "WHIST_TRUMP_TURN_SECS")? {
            config.timers.trump_turn = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "WHIST_CONTRACT_TURN_SECS")? {
            config.timers.contract_turn = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "WHIST_GRACE_PERIOD_SECS")? {
            config.timers.grace_period = Duration::from_secs(secs);
        }
        if let Some(rounds) = parse_var::<u8, _>(&lookup, "WHIST_TOTAL_ROUNDS")? {
            anyhow::ensure!(rounds > 0, "WHIST_TOTAL_ROUNDS must be at least 1");
            config.game.total_rounds = rounds;
        }
        if let Some(max) = parse_var::<u8, _>(&lookup, "WHIST_MAX_FRISCH")? {
            config.game.max_frisch = Some(max);
        }
        if let Some(auto) = parse_var(&lookup, "WHIST_AUTO_CREATE_ROOMS")? {
            config.auto_create_rooms = auto;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        _ => Ok(None),
    }
}
