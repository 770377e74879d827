//! Error types for the session layer.

use bingo_protocol::PlayerId;
use bingo_transport::ConnectionId;

/// Errors that can occur while binding connections to players.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The claimed identity was rejected by the
    /// [`IdentityValidator`](crate::IdentityValidator).
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The connection has not created or joined a game yet.
    #[error("Not in a game")]
    NotBound(ConnectionId),

    /// The connection is already bound to a player in some game.
    #[error("Already in a game, leave it first")]
    ConnectionInUse(ConnectionId),

    /// Another live connection already speaks for this player.
    #[error("player {0} is already connected")]
    AlreadyConnected(PlayerId),
}
