//! Game rooms for the bingo coordinator.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! [`Game`] and its number-calling clock.
//!
//! # Key types
//!
//! - [`Game`]: the synchronous state machine (lobby, selection, calling, claims)
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomManager`]: allocates codes, tracks rooms and player seats
//! - [`RoomConfig`]: player limit, pool size, call interval

mod config;
mod error;
pub mod game;
mod manager;
mod room;

pub use config::{RoomConfig, can_transition};
pub use error::{ErrorKind, RoomError};
pub use game::{BingoClaim, Game, MAX_CHAT_LEN, Outbox, Player};
pub use manager::{CodeSource, FixedCodes, RandomCodes, RoomManager};
pub use room::{JoinOutcome, LeaveOutcome, PlayerSender, RoomAction, RoomHandle, RoomInfo};
