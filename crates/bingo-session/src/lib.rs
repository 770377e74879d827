//! Player session management for the bingo coordinator.
//!
//! This crate handles the lifecycle of player connections:
//!
//! 1. **Identity**: checking who a player claims to be ([`IdentityValidator`])
//! 2. **Binding**: which connection speaks for which player in which room
//!    ([`SessionManager`])
//! 3. **Reconnection**: keeping a dropped player's seat for a grace period
//!
//! ```text
//! Room Layer (above)     ← told to remove players whose grace ran out
//!     ↕
//! Session Layer (this)   ← connection ↔ (room, player)
//!     ↕
//! Protocol / Transport   ← PlayerId, GameCode, ConnectionId
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod identity;
mod manager;
mod session;

pub use error::SessionError;
pub use identity::{
    DEFAULT_NAME, Identity, IdentityValidator, MAX_NAME_LEN, MAX_PLAYER_ID_LEN, OpenIdentity,
    normalize_name,
};
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
