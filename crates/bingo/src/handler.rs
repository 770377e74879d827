//! Per-connection handler: decoding, session binding, and routing to rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound channel. Room
//! actors hold a clone of that channel's sender, so their events never wait
//! on network I/O.
//!
//! The flow is:
//!   1. Receive a frame → decode a [`ClientMessage`]
//!   2. `create-game` / `join-game` bind the connection to a (room, player)
//!   3. Everything else resolves that binding and becomes a [`RoomAction`]
//!   4. A failed request is answered with an `error` event to this
//!      connection only

use std::sync::Arc;

use bingo_protocol::{ClientMessage, Codec, GameCode, PlayerId, ServerEvent};
use bingo_room::{JoinOutcome, PlayerSender, RoomAction, RoomError};
use bingo_session::{IdentityValidator, SessionError};
use bingo_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::BingoError;
use crate::server::ServerState;

/// Drop guard that starts the reconnect grace period when the handler
/// exits, however it exits.
///
/// `Drop` is synchronous, so the async cleanup runs on a spawned task.
struct DisconnectGuard<V: IdentityValidator, C: Codec> {
    conn_id: ConnectionId,
    /// Identifies this connection to the room, which ignores the drop if
    /// the player has already rejoined elsewhere.
    sender: PlayerSender,
    state: Arc<ServerState<V, C>>,
}

impl<V: IdentityValidator, C: Codec> Drop for DisconnectGuard<V, C> {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let conn_id = self.conn_id;
        let sender = self.sender.clone();
        let state = Arc::clone(&self.state);
        runtime.spawn(async move {
            let seat = {
                let mut sessions = state.sessions.lock().await;
                sessions.disconnect(conn_id).ok().and_then(|player_id| {
                    let code = sessions.get(&player_id)?.code.clone();
                    Some((player_id, code))
                })
            };
            let Some((player_id, code)) = seat else {
                return;
            };
            let handle = state.rooms.lock().await.get(&code);
            if let Ok(handle) = handle {
                let _ = handle.disconnect(player_id, &sender).await;
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<V, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<V, C>>,
) -> Result<(), BingoError>
where
    V: IdentityValidator,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), rx));
    let _guard = DisconnectGuard {
        conn_id,
        sender: tx.clone(),
        state: Arc::clone(&state),
    };

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                info!(%conn_id, "connection idle for too long, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%conn_id, error = %e, "failed to decode message");
                let _ = tx.send(ServerEvent::error(e.to_string()));
                continue;
            }
        };

        let event = msg.name();
        if let Err(e) = handle_message(&state, conn_id, &tx, msg).await {
            debug!(%conn_id, event, error = %e, "request rejected");
            let _ = tx.send(ServerEvent::error(e.to_string()));
        }
    }

    writer.abort();
    Ok(())
}

/// Drains room events to the socket until every sender is gone or the
/// peer stops accepting frames.
async fn write_events<V: IdentityValidator, C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<V, C>>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let conn_id = conn.id();
    while let Some(event) = rx.recv().await {
        let text = match state.codec.encode(&event) {
            Ok(text) => text,
            Err(e) => {
                warn!(%conn_id, event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

async fn handle_message<V, C>(
    state: &ServerState<V, C>,
    conn_id: ConnectionId,
    tx: &PlayerSender,
    msg: ClientMessage,
) -> Result<(), BingoError>
where
    V: IdentityValidator,
    C: Codec,
{
    let (requested, action) = match msg {
        ClientMessage::Ping => {
            let _ = tx.send(ServerEvent::Pong);
            return Ok(());
        }
        ClientMessage::CreateGame {
            player_id,
            player_name,
        } => return create_game(state, conn_id, tx, player_id, player_name).await,
        ClientMessage::JoinGame {
            game_id,
            player_id,
            player_name,
        } => return join_game(state, conn_id, tx, game_id, player_id, player_name).await,
        ClientMessage::LeaveGame => return leave_game(state, conn_id).await,
        ClientMessage::GetStats => {
            let sessions = state.sessions.lock().await;
            let rooms = state.rooms.lock().await;
            let _ = tx.send(ServerEvent::Stats {
                active_games: rooms.room_count(),
                total_players: sessions.len(),
            });
            return Ok(());
        }

        ClientMessage::StartCardSelection { game_id } => {
            (game_id, RoomAction::StartCardSelection)
        }
        ClientMessage::SelectCard { game_id, card_id } => {
            (game_id, RoomAction::SelectCard { card_id })
        }
        ClientMessage::StartGame { game_id } => (game_id, RoomAction::StartGame),
        ClientMessage::MarkCell {
            game_id,
            cell_index,
        } => (game_id, RoomAction::MarkCell { cell_index }),
        ClientMessage::ClaimBingo { game_id } => (game_id, RoomAction::ClaimBingo),
        ClientMessage::VerifyBingo {
            game_id,
            player_id,
            is_valid,
        } => (
            game_id,
            RoomAction::VerifyClaim {
                target: player_id,
                is_valid,
            },
        ),
        ClientMessage::EndGame { game_id } => (game_id, RoomAction::EndGame),
        ClientMessage::NewRound { game_id } => (game_id, RoomAction::NewRound),
        ClientMessage::SendChat { game_id, message } => {
            (game_id, RoomAction::SendChat { message })
        }
    };

    let (player_id, bound) = {
        let sessions = state.sessions.lock().await;
        let session = sessions.resolve(conn_id)?;
        (session.player_id.clone(), session.code.clone())
    };
    if requested != bound {
        return Err(RoomError::WrongGame { bound, requested }.into());
    }

    // Clone the handle out so the registry lock is not held across the
    // room's reply.
    let handle = state.rooms.lock().await.get(&bound)?;
    handle.act(player_id, action).await?;
    Ok(())
}

async fn create_game<V, C>(
    state: &ServerState<V, C>,
    conn_id: ConnectionId,
    tx: &PlayerSender,
    player_id: PlayerId,
    player_name: Option<String>,
) -> Result<(), BingoError>
where
    V: IdentityValidator,
    C: Codec,
{
    let identity = state.identity.validate(player_id, player_name).await?;

    let mut sessions = state.sessions.lock().await;
    if sessions.resolve(conn_id).is_ok() {
        return Err(SessionError::ConnectionInUse(conn_id).into());
    }
    sessions.check_available(&identity.player_id)?;

    let code = state
        .rooms
        .lock()
        .await
        .create(identity.player_id.clone(), identity.name, tx.clone())?;
    sessions.bind(conn_id, identity.player_id.clone(), code.clone())?;

    info!(%conn_id, player_id = %identity.player_id, %code, "game created");
    Ok(())
}

/// Seats the player, or gives a returning player their seat back.
///
/// The player id is reserved for this connection before the room is asked,
/// and bound once it answers. No lock is held while the room works, and a
/// second connection racing for the same id fails at the reservation.
async fn join_game<V, C>(
    state: &ServerState<V, C>,
    conn_id: ConnectionId,
    tx: &PlayerSender,
    code: GameCode,
    player_id: PlayerId,
    player_name: Option<String>,
) -> Result<(), BingoError>
where
    V: IdentityValidator,
    C: Codec,
{
    let identity = state.identity.validate(player_id, player_name).await?;
    let player_id = identity.player_id;

    state.sessions.lock().await.reserve(conn_id, &player_id)?;

    let handle = state.rooms.lock().await.handle_for_join(&code, &player_id);
    let joined = match handle {
        Ok(handle) => {
            handle
                .join(player_id.clone(), identity.name, tx.clone())
                .await
        }
        Err(e) => Err(e),
    };

    let mut sessions = state.sessions.lock().await;
    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            sessions.release(conn_id, &player_id);
            return Err(e.into());
        }
    };
    state
        .rooms
        .lock()
        .await
        .register(player_id.clone(), code.clone());
    sessions.bind(conn_id, player_id.clone(), code.clone())?;

    match outcome {
        JoinOutcome::Joined => info!(%conn_id, %player_id, %code, "joined game"),
        JoinOutcome::Rejoined => info!(%conn_id, %player_id, %code, "rejoined game"),
    }
    Ok(())
}

async fn leave_game<V, C>(state: &ServerState<V, C>, conn_id: ConnectionId) -> Result<(), BingoError>
where
    V: IdentityValidator,
    C: Codec,
{
    let session = state.sessions.lock().await.unbind(conn_id)?;
    remove_from_room(state, &session.player_id, &session.code).await
}

/// Takes `player_id` out of room `code`, dropping the room once it is empty.
async fn remove_from_room<V, C>(
    state: &ServerState<V, C>,
    player_id: &PlayerId,
    code: &GameCode,
) -> Result<(), BingoError>
where
    V: IdentityValidator,
    C: Codec,
{
    let handle = {
        let mut rooms = state.rooms.lock().await;
        rooms.unregister(player_id);
        rooms.get(code)?
    };

    let outcome = handle.leave(player_id.clone()).await?;
    if outcome.remaining == 0 {
        state.rooms.lock().await.remove(code);
    }
    info!(%player_id, %code, remaining = outcome.remaining, "player removed from game");
    Ok(())
}

/// Removes a player whose grace window ran out from room `code`.
///
/// The room keeps the seat if the player reconnected in the meantime, and
/// the session and registry entries are only dropped if no rejoin has
/// claimed the player since.
pub(crate) async fn expire_player<V, C>(
    state: &ServerState<V, C>,
    player_id: &PlayerId,
    code: &GameCode,
) -> Result<(), BingoError>
where
    V: IdentityValidator,
    C: Codec,
{
    if !state.sessions.lock().await.is_expired(player_id) {
        debug!(%player_id, %code, "player came back before expiry");
        return Ok(());
    }

    let handle = state.rooms.lock().await.get(code);
    let removed = match handle {
        Ok(handle) => handle.expire(player_id.clone()).await,
        Err(e) => Err(e),
    };

    let mut sessions = state.sessions.lock().await;
    let mut rooms = state.rooms.lock().await;
    if let Ok(Some(outcome)) = &removed {
        if outcome.remaining == 0 {
            rooms.remove(code);
        }
    }
    if sessions.is_expired(player_id) {
        if rooms.room_of(player_id) == Some(code) {
            rooms.unregister(player_id);
        }
        sessions.remove_expired(player_id);
    }

    match removed? {
        Some(outcome) => {
            info!(%player_id, %code, remaining = outcome.remaining, "expired player removed from game");
        }
        None => debug!(%player_id, %code, "expired player is back, seat kept"),
    }
    Ok(())
}

// =========================================================================
// Tests
// =========================================================================
