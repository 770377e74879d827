//! Room configuration and lifecycle rules.

use std::time::Duration;

use bingo_protocol::GamePhase;
use bingo_tick::TickConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration shared by every room a server creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Roster limit, host included.
    pub max_players: usize,

    /// Cards offered per selection round. Never fewer than `max_players`,
    /// so every player can always get a card.
    pub card_pool_size: usize,

    /// Time between called numbers.
    pub call_interval: Duration,
}

impl RoomConfig {
    /// Upper bound on `card_pool_size` (and therefore `max_players`).
    pub const MAX_POOL_SIZE: usize = 500;

    /// Clamps out-of-range settings, logging each adjustment.
    pub fn validated(mut self) -> Self {
        if self.max_players == 0 {
            warn!("max_players is 0, clamping to 1");
            self.max_players = 1;
        }
        if self.max_players > Self::MAX_POOL_SIZE {
            warn!(
                max_players = self.max_players,
                limit = Self::MAX_POOL_SIZE,
                "max_players above limit, clamping"
            );
            self.max_players = Self::MAX_POOL_SIZE;
        }
        let pool = self
            .card_pool_size
            .clamp(self.max_players, Self::MAX_POOL_SIZE);
        if pool != self.card_pool_size {
            warn!(
                requested = self.card_pool_size,
                clamped = pool,
                "card_pool_size out of range, clamping"
            );
            self.card_pool_size = pool;
        }
        self.call_interval = TickConfig::every(self.call_interval).validated().interval;
        self
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 20,
            card_pool_size: 20,
            call_interval: Duration::from_secs(3),
        }
    }
}

/// Whether a room may move from `from` to `to`.
///
/// ```text
/// Lobby → CardSelection → Active ⇄ ClaimPending
///              │             │          │
///              └─────────────┴──────────┴──→ Ended → Lobby
/// ```
pub fn can_transition(from: GamePhase, to: GamePhase) -> bool {
    use GamePhase::*;
    matches!(
        (from, to),
        (Lobby, CardSelection)
            | (CardSelection, Active)
            | (Active, ClaimPending)
            | (ClaimPending, Active)
            | (CardSelection | Active | ClaimPending, Ended)
            | (Ended, Lobby)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 20);
        assert_eq!(config.card_pool_size, 20);
        assert_eq!(config.call_interval, Duration::from_secs(3));
        assert_eq!(config.clone().validated(), config);
    }

    #[test]
    fn test_validated_raises_pool_to_max_players() {
        let config = RoomConfig {
            max_players: 30,
            card_pool_size: 10,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.card_pool_size, 30);
    }

    #[test]
    fn test_validated_caps_pool_and_players() {
        let config = RoomConfig {
            max_players: 1_000,
            card_pool_size: 10_000,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.max_players, RoomConfig::MAX_POOL_SIZE);
        assert_eq!(config.card_pool_size, RoomConfig::MAX_POOL_SIZE);
    }

    #[test]
    fn test_validated_clamps_call_interval() {
        let config = RoomConfig {
            call_interval: Duration::from_millis(5),
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.call_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_validated_zero_players_becomes_one() {
        let config = RoomConfig {
            max_players: 0,
            card_pool_size: 0,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.max_players, 1);
        assert_eq!(config.card_pool_size, 1);
    }

    #[test]
    fn test_can_transition_follows_lifecycle() {
        use GamePhase::*;
        assert!(can_transition(Lobby, CardSelection));
        assert!(can_transition(CardSelection, Active));
        assert!(can_transition(Active, ClaimPending));
        assert!(can_transition(ClaimPending, Active));
        assert!(can_transition(ClaimPending, Ended));
        assert!(can_transition(Ended, Lobby));

        assert!(!can_transition(Lobby, Active));
        assert!(!can_transition(Lobby, Ended));
        assert!(!can_transition(Ended, Active));
        assert!(!can_transition(CardSelection, ClaimPending));
    }
}
