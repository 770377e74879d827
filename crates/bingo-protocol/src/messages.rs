//! Inbound and outbound messages.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}`. Event
//! names are kebab-case, field names camelCase. Events without a payload
//! omit `data`.

use bingo_card::{Card, CardPreview, WinningPattern};
use serde::{Deserialize, Serialize};

use crate::{GameCode, GamePhase, PlayerId};

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// A message sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    CreateGame {
        player_id: PlayerId,
        #[serde(default)]
        player_name: Option<String>,
    },
    JoinGame {
        game_id: GameCode,
        player_id: PlayerId,
        #[serde(default)]
        player_name: Option<String>,
    },
    StartCardSelection {
        game_id: GameCode,
    },
    SelectCard {
        game_id: GameCode,
        card_id: usize,
    },
    StartGame {
        game_id: GameCode,
    },
    MarkCell {
        game_id: GameCode,
        cell_index: usize,
    },
    ClaimBingo {
        game_id: GameCode,
    },
    VerifyBingo {
        game_id: GameCode,
        /// The claimant being judged.
        player_id: PlayerId,
        is_valid: bool,
    },
    EndGame {
        game_id: GameCode,
    },
    NewRound {
        game_id: GameCode,
    },
    SendChat {
        game_id: GameCode,
        message: String,
    },
    LeaveGame,
    /// Server-wide room and player counts.
    GetStats,
    Ping,
}

impl ClientMessage {
    /// The room this message targets, for messages that name one.
    ///
    /// `create-game` and `join-game` are excluded: they establish the
    /// binding rather than act within it.
    pub fn target_room(&self) -> Option<&GameCode> {
        match self {
            ClientMessage::StartCardSelection { game_id }
            | ClientMessage::SelectCard { game_id, .. }
            | ClientMessage::StartGame { game_id }
            | ClientMessage::MarkCell { game_id, .. }
            | ClientMessage::ClaimBingo { game_id }
            | ClientMessage::VerifyBingo { game_id, .. }
            | ClientMessage::EndGame { game_id }
            | ClientMessage::NewRound { game_id }
            | ClientMessage::SendChat { game_id, .. } => Some(game_id),
            ClientMessage::CreateGame { .. }
            | ClientMessage::JoinGame { .. }
            | ClientMessage::LeaveGame
            | ClientMessage::GetStats
            | ClientMessage::Ping => None,
        }
    }

    /// Event name as it appears on the wire, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::CreateGame { .. } => "create-game",
            ClientMessage::JoinGame { .. } => "join-game",
            ClientMessage::StartCardSelection { .. } => "start-card-selection",
            ClientMessage::SelectCard { .. } => "select-card",
            ClientMessage::StartGame { .. } => "start-game",
            ClientMessage::MarkCell { .. } => "mark-cell",
            ClientMessage::ClaimBingo { .. } => "claim-bingo",
            ClientMessage::VerifyBingo { .. } => "verify-bingo",
            ClientMessage::EndGame { .. } => "end-game",
            ClientMessage::NewRound { .. } => "new-round",
            ClientMessage::SendChat { .. } => "send-chat",
            ClientMessage::LeaveGame => "leave-game",
            ClientMessage::GetStats => "get-stats",
            ClientMessage::Ping => "ping",
        }
    }
}

// ---------------------------------------------------------------------------
// Payload building blocks
// ---------------------------------------------------------------------------

/// Public view of one roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub has_selected_card: bool,
    pub marked_count: usize,
    pub connected: bool,
}

/// Everything a (re)joining player needs to render the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub id: GameCode,
    pub state: GamePhase,
    pub host_id: Option<PlayerId>,
    pub players: Vec<PlayerSummary>,
    pub called_numbers: Vec<u8>,
    pub is_game_active: bool,
}

/// One entry of the selection pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCard {
    pub id: usize,
    pub preview: CardPreview,
    pub taken: bool,
}

/// The verified winner of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerInfo {
    pub id: PlayerId,
    pub name: String,
    pub winning_pattern: Vec<WinningPattern>,
}

/// Why a round ended without a verified winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameOverReason {
    NumbersExhausted,
    EndedByHost,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// An event sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    GameCreated {
        game_id: GameCode,
        message: String,
    },
    GameJoined {
        game: GameSnapshot,
        player: PlayerSummary,
    },
    PlayerJoined {
        player: PlayerSummary,
        players: Vec<PlayerSummary>,
    },
    PlayerLeft {
        player_id: PlayerId,
        player_name: String,
        players: Vec<PlayerSummary>,
    },
    NewHost {
        host_id: PlayerId,
        host_name: String,
    },
    CardPool {
        cards: Vec<PoolCard>,
    },
    /// Full layout of the card a player took, plus their marks (non-empty
    /// only when resent on rejoin). Sent to the owner only.
    CardSelected {
        success: bool,
        card_id: usize,
        card: Card,
        marked_cells: Vec<usize>,
    },
    PlayerCardSelected {
        player_id: PlayerId,
        player_name: String,
        card_id: usize,
    },
    AllPlayersReady,
    GameStarted {
        called_numbers: Vec<u8>,
    },
    NumberCalled {
        number: u8,
        letter: char,
        called_numbers: Vec<u8>,
        total_called: usize,
    },
    CellMarked {
        cell_index: usize,
        can_claim_bingo: bool,
    },
    PlayerMarkedCell {
        player_id: PlayerId,
        marked_count: usize,
    },
    CanClaimBingo,
    BingoClaimed {
        player_id: PlayerId,
        player_name: String,
        /// Milliseconds since the UNIX epoch.
        timestamp: u64,
        marked_count: usize,
    },
    /// Host only: the claim now awaiting a verdict.
    ClaimUnderReview {
        player_id: PlayerId,
        player_name: String,
        marked_count: usize,
        /// Claims waiting behind this one.
        queued: usize,
    },
    BingoVerified {
        player_id: PlayerId,
        is_valid: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<WinnerInfo>,
    },
    /// Host only: the host's verdict disagreed with the server's check.
    VerificationWarning {
        player_id: PlayerId,
        message: String,
    },
    GameOver {
        reason: GameOverReason,
        called_numbers: Vec<u8>,
        total_called: usize,
    },
    RoundReset {
        players: Vec<PlayerSummary>,
    },
    RoundInProgress {
        message: String,
    },
    ChatMessage {
        player_id: PlayerId,
        player_name: String,
        message: String,
        /// Milliseconds since the UNIX epoch.
        timestamp: u64,
    },
    Stats {
        active_games: usize,
        total_players: usize,
    },
    Error {
        message: String,
    },
    Pong,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Event name as it appears on the wire, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::GameCreated { .. } => "game-created",
            ServerEvent::GameJoined { .. } => "game-joined",
            ServerEvent::PlayerJoined { .. } => "player-joined",
            ServerEvent::PlayerLeft { .. } => "player-left",
            ServerEvent::NewHost { .. } => "new-host",
            ServerEvent::CardPool { .. } => "card-pool",
            ServerEvent::CardSelected { .. } => "card-selected",
            ServerEvent::PlayerCardSelected { .. } => "player-card-selected",
            ServerEvent::AllPlayersReady => "all-players-ready",
            ServerEvent::GameStarted { .. } => "game-started",
            ServerEvent::NumberCalled { .. } => "number-called",
            ServerEvent::CellMarked { .. } => "cell-marked",
            ServerEvent::PlayerMarkedCell { .. } => "player-marked-cell",
            ServerEvent::CanClaimBingo => "can-claim-bingo",
            ServerEvent::BingoClaimed { .. } => "bingo-claimed",
            ServerEvent::ClaimUnderReview { .. } => "claim-under-review",
            ServerEvent::BingoVerified { .. } => "bingo-verified",
            ServerEvent::VerificationWarning { .. } => "verification-warning",
            ServerEvent::GameOver { .. } => "game-over",
            ServerEvent::RoundReset { .. } => "round-reset",
            ServerEvent::RoundInProgress { .. } => "round-in-progress",
            ServerEvent::ChatMessage { .. } => "chat-message",
            ServerEvent::Stats { .. } => "stats",
            ServerEvent::Error { .. } => "error",
            ServerEvent::Pong => "pong",
        }
    }
}
