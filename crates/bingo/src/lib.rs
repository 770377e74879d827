//! # Bingo
//!
//! A server-authoritative coordinator for real-time multiplayer bingo.
//!
//! Clients talk JSON over WebSocket. A host creates a room and shares its
//! code, players join and pick cards from a shared pool, the server calls
//! numbers on a fixed interval, and claims are checked server-side before
//! the host confirms a winner.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bingo::prelude::*;
//!
//! # async fn run() -> Result<(), BingoError> {
//! let config = ServerConfig::from_env()?;
//! let server = BingoServerBuilder::from_config(config)
//!     .build(OpenIdentity)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{
    ConfigError, DEFAULT_BIND_ADDR, DEFAULT_IDLE_TIMEOUT, DEFAULT_REAP_INTERVAL, ServerConfig,
};
pub use error::BingoError;
pub use server::{BingoServer, BingoServerBuilder};

pub mod prelude {
    pub use crate::{BingoError, BingoServer, BingoServerBuilder, ConfigError, ServerConfig};
    pub use bingo_card::{Card, Pattern, WinningPattern};
    pub use bingo_protocol::{
        ClientMessage, Codec, GameCode, GamePhase, JsonCodec, PlayerId, ServerEvent,
    };
    pub use bingo_room::{CodeSource, FixedCodes, MAX_CHAT_LEN, RandomCodes, RoomConfig};
    pub use bingo_session::{Identity, IdentityValidator, OpenIdentity, SessionConfig, SessionError};
}
