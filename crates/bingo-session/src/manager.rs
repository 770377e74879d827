//! Session manager: tracks which connection speaks for which player.
//!
//! A player is bound to one room through one live connection. When the
//! connection drops the session enters a grace window; a new connection can
//! pick the seat back up with `join-game` before the window closes.
//!
//! ```text
//! bind() → Connected ──disconnect()──→ Disconnected ──expire_stale()──→ Expired
//!              ↑                            │                               │
//!              └──────────bind()────────────┘                  remove_expired()
//! ```
//!
//! Joining a room means awaiting the room actor, which must not happen under
//! the manager's lock. [`SessionManager::reserve`] claims the player id for
//! the joining connection first; [`SessionManager::bind`] commits it once
//! the room has answered, or [`SessionManager::release`] gives it back.
//! A reserved player is never expired.

use std::collections::HashMap;
use std::time::Instant;

use bingo_protocol::{GameCode, PlayerId};
use bingo_transport::ConnectionId;

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Manages player sessions and connection bindings.
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
    connections: HashMap<ConnectionId, PlayerId>,
    /// Players with a join in flight, and the connection joining for them.
    reserved: HashMap<PlayerId, ConnectionId>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            connections: HashMap::new(),
            reserved: HashMap::new(),
            config,
        }
    }

    /// Binds `conn` to `player_id` in room `code`.
    ///
    /// A disconnected or expired session for the same player is taken over,
    /// and a reservation held by `conn` is consumed.
    ///
    /// # Errors
    /// - [`SessionError::ConnectionInUse`] if `conn` is already bound.
    /// - [`SessionError::AlreadyConnected`] if another live connection
    ///   speaks for `player_id`, or another connection holds its
    ///   reservation.
    pub fn bind(
        &mut self,
        conn: ConnectionId,
        player_id: PlayerId,
        code: GameCode,
    ) -> Result<&Session, SessionError> {
        if self.connections.contains_key(&conn) {
            return Err(SessionError::ConnectionInUse(conn));
        }
        if let Some(existing) = self.sessions.get(&player_id) {
            if existing.is_connected() {
                return Err(SessionError::AlreadyConnected(player_id));
            }
        }
        if let Some(holder) = self.reserved.get(&player_id).copied() {
            if holder != conn {
                return Err(SessionError::AlreadyConnected(player_id));
            }
            self.reserved.remove(&player_id);
        }

        tracing::debug!(%conn, %player_id, %code, "session bound");

        self.connections.insert(conn, player_id.clone());
        let session = Session {
            player_id: player_id.clone(),
            code,
            state: SessionState::Connected { conn },
        };
        Ok(self.sessions.entry(player_id).insert_entry(session).into_mut())
    }

    /// Claims `player_id` for `conn` while a join is in flight.
    ///
    /// # Errors
    /// - [`SessionError::ConnectionInUse`] if `conn` is bound or already
    ///   joining.
    /// - [`SessionError::AlreadyConnected`] if the player is live or being
    ///   joined elsewhere.
    pub fn reserve(
        &mut self,
        conn: ConnectionId,
        player_id: &PlayerId,
    ) -> Result<(), SessionError> {
        if self.connections.contains_key(&conn) || self.reserved.values().any(|c| *c == conn) {
            return Err(SessionError::ConnectionInUse(conn));
        }
        self.check_available(player_id)?;
        self.reserved.insert(player_id.clone(), conn);
        tracing::trace!(%conn, %player_id, "player reserved for join");
        Ok(())
    }

    /// Drops `conn`'s reservation on `player_id` after a failed join.
    pub fn release(&mut self, conn: ConnectionId, player_id: &PlayerId) {
        if self.reserved.get(player_id) == Some(&conn) {
            self.reserved.remove(player_id);
        }
    }

    /// Checks that `player_id` could be bound to a new connection, without
    /// binding it.
    pub fn check_available(&self, player_id: &PlayerId) -> Result<(), SessionError> {
        let live = self
            .sessions
            .get(player_id)
            .is_some_and(Session::is_connected);
        if live || self.reserved.contains_key(player_id) {
            return Err(SessionError::AlreadyConnected(player_id.clone()));
        }
        Ok(())
    }

    /// The live session `conn` speaks for.
    pub fn resolve(&self, conn: ConnectionId) -> Result<&Session, SessionError> {
        self.connections
            .get(&conn)
            .and_then(|player_id| self.sessions.get(player_id))
            .ok_or(SessionError::NotBound(conn))
    }

    /// Marks the session bound to `conn` as disconnected and starts its grace
    /// period. Returns the player that dropped.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Result<PlayerId, SessionError> {
        let player_id = self
            .connections
            .remove(&conn)
            .ok_or(SessionError::NotBound(conn))?;

        if let Some(session) = self.sessions.get_mut(&player_id) {
            session.state = SessionState::Disconnected {
                since: Instant::now(),
            };
            tracing::info!(%conn, %player_id, code = %session.code, "player disconnected, grace period started");
        }
        Ok(player_id)
    }

    /// Drops the binding and the session entirely (the player left).
    pub fn unbind(&mut self, conn: ConnectionId) -> Result<Session, SessionError> {
        let player_id = self
            .connections
            .remove(&conn)
            .ok_or(SessionError::NotBound(conn))?;
        self.sessions
            .remove(&player_id)
            .ok_or(SessionError::NotBound(conn))
    }

    /// Moves every session whose grace period has elapsed to `Expired` and
    /// returns them so the caller can remove the players from their rooms.
    ///
    /// Players with a join in flight are left alone.
    pub fn expire_stale(&mut self) -> Vec<(PlayerId, GameCode)> {
        let grace = self.config.reconnect_grace;
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if self.reserved.contains_key(&session.player_id) {
                continue;
            }
            if let SessionState::Disconnected { since } = session.state {
                if since.elapsed() >= grace {
                    session.state = SessionState::Expired;
                    expired.push((session.player_id.clone(), session.code.clone()));
                    tracing::info!(
                        player_id = %session.player_id,
                        code = %session.code,
                        "session expired (grace period elapsed)"
                    );
                }
            }
        }

        expired
    }

    /// Whether `player_id` is still expired and nobody is rejoining for them.
    ///
    /// The reaper checks this again before each removal, since a rejoin may
    /// land between [`expire_stale`](Self::expire_stale) and the removal.
    pub fn is_expired(&self, player_id: &PlayerId) -> bool {
        !self.reserved.contains_key(player_id)
            && self
                .sessions
                .get(player_id)
                .is_some_and(|s| s.state == SessionState::Expired)
    }

    /// Removes the session if [`is_expired`](Self::is_expired) still holds.
    pub fn remove_expired(&mut self, player_id: &PlayerId) -> Option<Session> {
        if !self.is_expired(player_id) {
            return None;
        }
        self.sessions.remove(player_id)
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Sessions currently tracked, live or within their grace window.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
