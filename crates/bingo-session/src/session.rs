//! Session types: the binding between a player and a room.

use std::time::{Duration, Instant};

use bingo_protocol::{GameCode, PlayerId};
use bingo_transport::ConnectionId;

/// Configuration for session management.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a dropped player keeps their seat before being removed
    /// from the room.
    pub reconnect_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(30),
        }
    }
}

/// Connection state of a player's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A live connection speaks for the player.
    Connected { conn: ConnectionId },

    /// The connection dropped at `since`. The player keeps their seat until
    /// the grace period runs out.
    Disconnected { since: Instant },

    /// Grace elapsed; the player is due to be removed from their room.
    Expired,
}

/// A player's seat in one room.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub code: GameCode,
    pub state: SessionState,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected { .. })
    }
}
