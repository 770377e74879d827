//! Room registry: allocates codes, tracks rooms and which player sits where.

use std::collections::{HashMap, VecDeque};

use bingo_protocol::{GameCode, PlayerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::room::{DEFAULT_CHANNEL_SIZE, spawn_room};
use crate::{JoinOutcome, LeaveOutcome, PlayerSender, RoomConfig, RoomError, RoomHandle};

/// Attempts at drawing an unused code before giving up.
const MAX_CODE_ATTEMPTS: usize = 64;

/// Where new room codes come from.
pub trait CodeSource: Send {
    fn next_code(&mut self) -> GameCode;
}

/// Uniform codes over [`GameCode::ALPHABET`].
pub struct RandomCodes {
    rng: StdRng,
}

impl RandomCodes {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomCodes {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeSource for RandomCodes {
    fn next_code(&mut self) -> GameCode {
        let code: String = (0..GameCode::LEN)
            .map(|_| {
                let i = self.rng.random_range(0..GameCode::ALPHABET.len());
                char::from(GameCode::ALPHABET[i])
            })
            .collect();
        GameCode::new(&code)
    }
}

/// Hands out a scripted list of codes, then falls back to random ones.
pub struct FixedCodes {
    codes: VecDeque<GameCode>,
    fallback: RandomCodes,
}

impl FixedCodes {
    pub fn new<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            codes: codes.into_iter().map(GameCode::new).collect(),
            fallback: RandomCodes::seeded(0),
        }
    }
}

impl CodeSource for FixedCodes {
    fn next_code(&mut self) -> GameCode {
        self.codes
            .pop_front()
            .unwrap_or_else(|| self.fallback.next_code())
    }
}

/// Manages all live rooms and tracks which player is in which room.
///
/// A player is in at most one room at a time. The server keeps the manager
/// behind an async mutex and clones handles out of it, so no room is
/// awaited while the lock is held.
pub struct RoomManager {
    rooms: HashMap<GameCode, RoomHandle>,
    player_rooms: HashMap<PlayerId, GameCode>,
    codes: Box<dyn CodeSource>,
    config: RoomConfig,
}

impl RoomManager {
    pub fn new(config: RoomConfig) -> Self {
        Self::with_code_source(config, Box::new(RandomCodes::new()))
    }

    pub fn with_code_source(config: RoomConfig, codes: Box<dyn CodeSource>) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            codes,
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a room with `host_id` as its host and only player.
    ///
    /// The host's `game-created` and `game-joined` events are already on
    /// `sender` when this returns.
    pub fn create(
        &mut self,
        host_id: PlayerId,
        host_name: String,
        sender: PlayerSender,
    ) -> Result<GameCode, RoomError> {
        if let Some(current) = self.player_rooms.get(&host_id) {
            return Err(RoomError::AlreadyInRoom(host_id, current.clone()));
        }

        let code = self.allocate_code()?;
        let handle = spawn_room(
            code.clone(),
            self.config.clone(),
            host_id.clone(),
            host_name,
            sender,
            StdRng::from_os_rng(),
            DEFAULT_CHANNEL_SIZE,
        );
        self.rooms.insert(code.clone(), handle);
        self.player_rooms.insert(host_id.clone(), code.clone());
        info!(%code, host = %host_id, rooms = self.rooms.len(), "room created");
        Ok(code)
    }

    fn allocate_code(&mut self) -> Result<GameCode, RoomError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.codes.next_code();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        warn!(attempts = MAX_CODE_ATTEMPTS, "no free game code found");
        Err(RoomError::CodeSpaceExhausted)
    }

    /// Cloned handle to a live room.
    pub fn get(&self, code: &GameCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Handle for `player_id` to join `code`, enforcing one room per player.
    /// A player already in `code` gets the handle back so they can rejoin.
    pub fn handle_for_join(
        &self,
        code: &GameCode,
        player_id: &PlayerId,
    ) -> Result<RoomHandle, RoomError> {
        match self.player_rooms.get(player_id) {
            Some(current) if current != code => Err(RoomError::AlreadyInRoom(
                player_id.clone(),
                current.clone(),
            )),
            _ => self.get(code),
        }
    }

    /// Records that `player_id` now sits in `code`.
    pub fn register(&mut self, player_id: PlayerId, code: GameCode) {
        self.player_rooms.insert(player_id, code);
    }

    /// Forgets `player_id`'s seat, returning the room it was in.
    pub fn unregister(&mut self, player_id: &PlayerId) -> Option<GameCode> {
        self.player_rooms.remove(player_id)
    }

    /// Drops a room and every seat in it. The actor is not told; use this
    /// once it has exited on its own.
    pub fn remove(&mut self, code: &GameCode) -> Option<RoomHandle> {
        let handle = self.rooms.remove(code)?;
        self.player_rooms.retain(|_, c| c != code);
        info!(%code, rooms = self.rooms.len(), "room removed");
        Some(handle)
    }

    pub fn room_of(&self, player_id: &PlayerId) -> Option<&GameCode> {
        self.player_rooms.get(player_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn codes(&self) -> Vec<GameCode> {
        self.rooms.keys().cloned().collect()
    }

    /// Seats `player_id` in `code`, awaiting the room while holding `&mut
    /// self`. Servers that share the manager use [`Self::handle_for_join`]
    /// and [`Self::register`] instead.
    pub async fn join(
        &mut self,
        code: &GameCode,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        let handle = self.handle_for_join(code, &player_id)?;
        let outcome = handle.join(player_id.clone(), name, sender).await?;
        self.register(player_id, code.clone());
        Ok(outcome)
    }

    /// Removes `player_id` from their room, dropping the room once empty.
    pub async fn leave(&mut self, player_id: &PlayerId) -> Result<LeaveOutcome, RoomError> {
        let code = self
            .player_rooms
            .get(player_id)
            .cloned()
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone()))?;
        let handle = self.get(&code)?;

        let outcome = handle.leave(player_id.clone()).await;
        self.player_rooms.remove(player_id);
        let outcome = outcome?;
        if outcome.remaining == 0 {
            self.remove(&code);
        }
        Ok(outcome)
    }

    /// Shuts a room down and forgets everyone in it.
    pub async fn destroy(&mut self, code: &GameCode) -> Result<(), RoomError> {
        let handle = self
            .remove(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let _ = handle.shutdown().await;
        info!(%code, "room destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_codes_use_alphabet_and_length() {
        let mut codes = RandomCodes::seeded(7);
        for _ in 0..100 {
            let code = codes.next_code();
            assert_eq!(code.as_str().len(), GameCode::LEN);
            assert!(code.as_str().bytes().all(|b| GameCode::ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_fixed_codes_then_random() {
        let mut codes = FixedCodes::new(["abcd1234", "ZZZZ9999"]);
        assert_eq!(codes.next_code(), GameCode::new("ABCD1234"));
        assert_eq!(codes.next_code(), GameCode::new("ZZZZ9999"));
        assert_eq!(codes.next_code().as_str().len(), GameCode::LEN);
    }

    #[tokio::test]
    async fn test_create_retries_on_collision() {
        let mut manager = RoomManager::with_code_source(
            RoomConfig::default(),
            Box::new(FixedCodes::new(["AAAA2222", "AAAA2222", "BBBB3333"])),
        );
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        let first = manager.create(PlayerId::new("a"), "A".into(), tx.clone()).unwrap();
        let second = manager.create(PlayerId::new("b"), "B".into(), tx).unwrap();

        assert_eq!(first, GameCode::new("AAAA2222"));
        assert_eq!(second, GameCode::new("BBBB3333"));
        assert_eq!(manager.room_count(), 2);
    }

    #[tokio::test]
    async fn test_create_exhausted_code_space_returns_error() {
        struct Always;
        impl CodeSource for Always {
            fn next_code(&mut self) -> GameCode {
                GameCode::new("SAME2222")
            }
        }
        let mut manager = RoomManager::with_code_source(RoomConfig::default(), Box::new(Always));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        manager.create(PlayerId::new("a"), "A".into(), tx.clone()).unwrap();

        let result = manager.create(PlayerId::new("b"), "B".into(), tx);

        assert!(matches!(result, Err(RoomError::CodeSpaceExhausted)));
    }

    #[tokio::test]
    async fn test_create_twice_for_same_host_rejected() {
        let mut manager = RoomManager::new(RoomConfig::default());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        manager.create(PlayerId::new("a"), "A".into(), tx.clone()).unwrap();

        let result = manager.create(PlayerId::new("a"), "A".into(), tx);

        assert!(matches!(result, Err(RoomError::AlreadyInRoom(..))));
        assert_eq!(manager.room_count(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_code_returns_not_found() {
        let manager = RoomManager::new(RoomConfig::default());
        assert!(matches!(
            manager.get(&GameCode::new("NOPE2222")),
            Err(RoomError::NotFound(_))
        ));
    }
}
