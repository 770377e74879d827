//! Error types for the room layer.

use bingo_card::CardError;
use bingo_protocol::{GameCode, GamePhase, PlayerId};

/// Coarse classification of a [`RoomError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    PermissionDenied,
    Conflict,
    ValidationFailed,
    Exhausted,
    /// The room actor is gone.
    Unavailable,
}

/// Errors that can occur during room operations.
///
/// Every error leaves the room unchanged. The `Display` text is what the
/// originating client sees in its `error` event.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Game not found")]
    NotFound(GameCode),

    #[error("Game is full")]
    RoomFull(GameCode),

    /// The player already sits in another room.
    #[error("You are already in game {1}")]
    AlreadyInRoom(PlayerId, GameCode),

    #[error("You are not in this game")]
    NotInRoom(PlayerId),

    /// The message names a different room than the one the connection is in.
    #[error("Game ID does not match your current game")]
    WrongGame { bound: GameCode, requested: GameCode },

    #[error("Cannot {action} while the game is in {phase}")]
    InvalidState {
        action: &'static str,
        phase: GamePhase,
    },

    #[error("Only the host can do that")]
    NotHost,

    #[error("Card {0} does not exist")]
    InvalidCardIndex(usize),

    #[error("Card {0} has already been taken")]
    CardAlreadyTaken(usize),

    #[error("You have already selected a card")]
    CardAlreadySelected,

    #[error("Not all players have selected a card ({waiting} waiting)")]
    NotAllReady { waiting: usize },

    #[error("You have no card this round")]
    NoCard,

    #[error("Cell {0} is out of range")]
    InvalidCell(usize),

    #[error("The FREE space is always marked")]
    FreeCell,

    #[error("Cell {0} is already marked")]
    AlreadyMarked(usize),

    #[error("Number {0} has not been called")]
    NumberNotCalled(u8),

    #[error("No winning pattern on your card")]
    NoWinningPattern,

    #[error("Your claim is already waiting for review")]
    AlreadyClaimed,

    #[error("Player {0} has no pending claim")]
    NoPendingClaim(PlayerId),

    #[error("Chat message is empty")]
    EmptyChat,

    #[error("Chat message is longer than {0} characters")]
    ChatTooLong(usize),

    #[error("Could not allocate a free game code")]
    CodeSpaceExhausted,

    #[error("Could not deal cards: {0}")]
    CardPool(#[from] CardError),

    #[error("Game {0} is unavailable")]
    Unavailable(GameCode),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::NotFound(_) | RoomError::NotInRoom(_) => ErrorKind::NotFound,
            RoomError::RoomFull(_)
            | RoomError::InvalidState { .. }
            | RoomError::NotAllReady { .. }
            | RoomError::NoCard => ErrorKind::InvalidState,
            RoomError::NotHost => ErrorKind::PermissionDenied,
            RoomError::AlreadyInRoom(..)
            | RoomError::CardAlreadyTaken(_)
            | RoomError::CardAlreadySelected
            | RoomError::AlreadyMarked(_)
            | RoomError::AlreadyClaimed => ErrorKind::Conflict,
            RoomError::WrongGame { .. }
            | RoomError::InvalidCardIndex(_)
            | RoomError::InvalidCell(_)
            | RoomError::FreeCell
            | RoomError::NumberNotCalled(_)
            | RoomError::NoWinningPattern
            | RoomError::NoPendingClaim(_)
            | RoomError::EmptyChat
            | RoomError::ChatTooLong(_) => ErrorKind::ValidationFailed,
            RoomError::CodeSpaceExhausted | RoomError::CardPool(_) => ErrorKind::Exhausted,
            RoomError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}
