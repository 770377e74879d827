//! Identity and addressing types shared by every layer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a player, chosen by the client.
///
/// Embedding apps hand out numeric user ids while browser clients invent
/// string ids, so both forms are accepted on the wire and normalized to a
/// string. Outbound events always carry the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => PlayerId(s),
            RawId::Unsigned(n) => PlayerId(n.to_string()),
            RawId::Signed(n) => PlayerId(n.to_string()),
        })
    }
}

/// Eight-character room code, e.g. `K7QX2M9P`.
///
/// Codes use an alphabet without look-alike characters (no `0`, `O`, `1`,
/// `I`). Whatever the client sends is trimmed and uppercased, so
/// `" k7qx2m9p "` finds the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GameCode(String);

impl GameCode {
    /// Characters codes are drawn from.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Length of a generated code.
    pub const LEN: usize = 8;

    /// Normalizes `code` (trim + uppercase). No alphabet check: an invalid
    /// code simply never matches a room.
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GameCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(GameCode::new(&raw))
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Audience of one outbound event.
///
/// Room logic returns `(Recipient, ServerEvent)` pairs and the room actor
/// resolves each recipient against the roster at delivery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every player in the room.
    All,

    /// One specific player.
    Player(PlayerId),

    /// Whoever is host when the event is delivered.
    Host,

    /// Everyone except the given player.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// Lifecycle phase of a room.
///
/// ```text
/// Lobby → CardSelection → Active ⇄ ClaimPending → Ended → Lobby
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GamePhase {
    Lobby,
    CardSelection,
    Active,
    /// Number calling is paused while the host reviews a claim.
    ClaimPending,
    Ended,
}

impl GamePhase {
    /// Whether numbers are being called or a claim is under review.
    pub fn is_in_progress(self) -> bool {
        matches!(self, GamePhase::Active | GamePhase::ClaimPending)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Lobby => "lobby",
            GamePhase::CardSelection => "card-selection",
            GamePhase::Active => "active",
            GamePhase::ClaimPending => "claim-pending",
            GamePhase::Ended => "ended",
        };
        f.write_str(name)
    }
}
