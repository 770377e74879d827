//! `BingoServer` builder and server loop.
//!
//! This is the entry point for running a bingo coordinator. It ties
//! together all the layers: transport → protocol → session → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bingo_protocol::{Codec, JsonCodec};
use bingo_room::{CodeSource, RandomCodes, RoomConfig, RoomManager};
use bingo_session::{IdentityValidator, SessionConfig, SessionManager};
use bingo_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::handler::{expire_player, handle_connection};
use crate::{BingoError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Lock order is `sessions` before `rooms`; no path takes them the other
/// way round.
pub(crate) struct ServerState<V: IdentityValidator, C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) identity: V,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a bingo server.
///
/// # Example
///
/// ```rust,no_run
/// use bingo::prelude::*;
///
/// # async fn run() -> Result<(), BingoError> {
/// let server = BingoServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(OpenIdentity)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct BingoServerBuilder {
    config: ServerConfig,
    codes: Box<dyn CodeSource>,
}

impl BingoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            config,
            codes: Box::new(RandomCodes::new()),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.config.reap_interval = interval;
        self
    }

    /// Replaces the random game-code generator.
    pub fn code_source(mut self, codes: impl CodeSource + 'static) -> Self {
        self.codes = Box::new(codes);
        self
    }

    /// Binds the listener with the given identity validator.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<V: IdentityValidator>(
        self,
        identity: V,
    ) -> Result<BingoServer<V, JsonCodec>, BingoError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.config.session.clone())),
            rooms: Mutex::new(RoomManager::with_code_source(self.config.room.clone(), self.codes)),
            identity,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(BingoServer {
            transport,
            state,
            reap_interval: self.config.reap_interval,
        })
    }
}

impl Default for BingoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound bingo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BingoServer<V: IdentityValidator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<V, C>>,
    reap_interval: Duration,
}

impl<V: IdentityValidator, C: Codec> BingoServer<V, C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), BingoError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Spawns a handler task per connection and a reaper that removes
    /// players whose reconnect grace ran out.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BingoError> {
        tracing::info!(addr = ?self.local_addr().ok(), "bingo server running");

        let reaper = tokio::spawn(reap_expired_sessions(
            Arc::clone(&self.state),
            self.reap_interval,
        ));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        reaper.abort();
        Ok(())
    }
}

/// Periodically expires sessions past their grace window and takes those
/// players out of their rooms.
async fn reap_expired_sessions<V: IdentityValidator, C: Codec>(
    state: Arc<ServerState<V, C>>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let expired = state.sessions.lock().await.expire_stale();
        if expired.is_empty() {
            continue;
        }
        for (player_id, code) in &expired {
            if let Err(e) = expire_player(&state, player_id, code).await {
                tracing::debug!(%player_id, %code, error = %e, "expired player already gone");
            }
        }
        tracing::debug!(count = expired.len(), "expired sessions reaped");
    }
}
