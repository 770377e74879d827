//! Server configuration.
//!
//! Loaded from `BINGO_*` environment variables with defaults for anything
//! unset. Values that are set but do not parse are rejected rather than
//! silently defaulted.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use bingo_room::RoomConfig;
use bingo_session::SessionConfig;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// A connection that sends nothing for this long is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// How often expired sessions are swept out of their rooms.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Everything a [`BingoServer`](crate::BingoServer) needs to run.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub idle_timeout: Duration,
    pub reap_interval: Duration,
    pub room: RoomConfig,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            reap_interval: DEFAULT_REAP_INTERVAL,
            room: RoomConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map (for testing).
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `BINGO_BIND_ADDR` | `bind_addr` |
    /// | `BINGO_MAX_PLAYERS` | `room.max_players` |
    /// | `BINGO_CARD_POOL_SIZE` | `room.card_pool_size` |
    /// | `BINGO_CALL_INTERVAL_MS` | `room.call_interval` |
    /// | `BINGO_RECONNECT_GRACE_SECS` | `session.reconnect_grace` |
    /// | `BINGO_IDLE_TIMEOUT_SECS` | `idle_timeout` |
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = vars
            .get("BINGO_BIND_ADDR")
            .cloned()
            .unwrap_or(defaults.bind_addr);

        let room = RoomConfig {
            max_players: parse(vars, "BINGO_MAX_PLAYERS", "a positive integer")?
                .unwrap_or(defaults.room.max_players),
            card_pool_size: parse(vars, "BINGO_CARD_POOL_SIZE", "a positive integer")?
                .unwrap_or(defaults.room.card_pool_size),
            call_interval: parse(vars, "BINGO_CALL_INTERVAL_MS", "a number of milliseconds")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.room.call_interval),
        }
        .validated();

        let session = SessionConfig {
            reconnect_grace: parse(vars, "BINGO_RECONNECT_GRACE_SECS", "a number of seconds")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session.reconnect_grace),
        };

        let idle_timeout = parse(vars, "BINGO_IDLE_TIMEOUT_SECS", "a number of seconds")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.idle_timeout);

        Ok(Self {
            bind_addr,
            idle_timeout,
            reap_interval: defaults.reap_interval,
            room,
            session,
        })
    }
}

fn parse<T: FromStr>(
    vars: &HashMap<String, String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    vars.get(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var,
                value: value.clone(),
                expected,
            })
        })
        .transpose()
}
