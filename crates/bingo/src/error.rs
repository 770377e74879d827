//! Unified error type for the bingo coordinator.

use bingo_protocol::ProtocolError;
use bingo_room::RoomError;
use bingo_session::SessionError;
use bingo_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts layer errors automatically. `Display` is transparent: what
/// a client sees in its `error` event is the inner message.
#[derive(Debug, thiserror::Error)]
pub enum BingoError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use bingo_protocol::GameCode;
    use bingo_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let bingo_err: BingoError = err.into();
        assert!(matches!(bingo_err, BingoError::Transport(_)));
        assert!(bingo_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let bingo_err: BingoError = err.into();
        assert!(matches!(bingo_err, BingoError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error_keeps_message() {
        let err = SessionError::NotBound(ConnectionId::new(1));
        let bingo_err: BingoError = err.into();
        assert!(matches!(bingo_err, BingoError::Session(_)));
        assert_eq!(bingo_err.to_string(), "Not in a game");
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let err = RoomError::NotFound(GameCode::new("ABCD1234"));
        let bingo_err: BingoError = err.into();
        assert!(matches!(bingo_err, BingoError::Room(_)));
        assert_eq!(bingo_err.to_string(), "Game not found");

        let err: BingoError = RoomError::AlreadyClaimed.into();
        assert_eq!(err.to_string(), "Your claim is already waiting for review");
    }
}
