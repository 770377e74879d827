//! Wire protocol for the bingo coordinator.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`PlayerId`], [`GameCode`], [`Recipient`], [`GamePhase`])
//! - **Messages** ([`ClientMessage`] inbound, [`ServerEvent`] outbound)
//! - **Codec** ([`Codec`] trait, [`JsonCodec`])
//! - **Errors** ([`ProtocolError`])
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage) → Session → Room
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    ClientMessage, GameOverReason, GameSnapshot, PlayerSummary, PoolCard, ServerEvent, WinnerInfo,
};
pub use types::{GameCode, GamePhase, PlayerId, Recipient};
