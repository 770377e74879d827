//! Room actor: an isolated Tokio task that owns one [`Game`].
//!
//! Commands arrive over a bounded mpsc channel and are processed one at a
//! time, so every room sees a total order of operations. The calling clock
//! lives in the same `select!` loop; it is started, paused and stopped from
//! the game phase after every command, and dropped with the actor.

use std::collections::HashMap;

use bingo_protocol::{GameCode, GamePhase, PlayerId, Recipient, ServerEvent};
use bingo_tick::{TickConfig, TickScheduler};
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::game::{Game, Outbox};
use crate::{RoomConfig, RoomError};

/// Commands queued per room before senders wait.
pub(crate) const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Channel sender for delivering events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// A player request that is routed to the room's [`Game`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    StartCardSelection,
    SelectCard { card_id: usize },
    StartGame,
    MarkCell { cell_index: usize },
    ClaimBingo,
    VerifyClaim { target: PlayerId, is_valid: bool },
    EndGame,
    NewRound,
    SendChat { message: String },
}

/// How a join request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new seat on the roster.
    Joined,
    /// The player was still seated and got their state resent.
    Rejoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Players left on the roster. At zero the actor has exited.
    pub remaining: usize,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinOutcome, RoomError>>,
    },

    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },

    /// The connection behind `sender` dropped. The player keeps their seat.
    /// Ignored if the player has since rejoined on another connection.
    Disconnect {
        player_id: PlayerId,
        sender: PlayerSender,
    },

    /// The player's grace window ran out. Removes them only if they are
    /// still disconnected; `None` means they came back in time.
    Expire {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<Option<LeaveOutcome>, RoomError>>,
    },

    Action {
        player_id: PlayerId,
        action: RoomAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    GetInfo { reply: oneshot::Sender<RoomInfo> },

    Shutdown,
}

/// Room metadata, without the game state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: GameCode,
    pub phase: GamePhase,
    pub player_count: usize,
    pub max_players: usize,
    pub called_count: usize,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The `RoomManager` holds one per room; callers clone it
/// out and release the registry lock before awaiting.
#[derive(Clone)]
pub struct RoomHandle {
    code: GameCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &GameCode {
        &self.code
    }

    /// Whether the actor has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Seats a player, or restores one who is still seated.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            name,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            player_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Reports that the connection owning `sender` dropped (fire-and-forget).
    pub async fn disconnect(
        &self,
        player_id: PlayerId,
        sender: &PlayerSender,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Disconnect {
            player_id,
            sender: sender.clone(),
        })
        .await
    }

    /// Removes a player whose reconnect grace ran out, unless they have
    /// rejoined in the meantime.
    pub async fn expire(&self, player_id: PlayerId) -> Result<Option<LeaveOutcome>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Expire {
            player_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Runs `action` on behalf of `player_id`. Events are delivered through
    /// the player senders; the reply only carries the error, if any.
    pub async fn act(&self, player_id: PlayerId, action: RoomAction) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Action {
            player_id,
            action,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    game: Game,
    /// Outbound channels of connected players.
    senders: HashMap<PlayerId, PlayerSender>,
    clock: TickScheduler,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        info!(code = %self.game.code(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                _ = self.clock.wait_for_tick() => {
                    let out = self.game.call_next_number();
                    self.dispatch(out);
                }
            }
            self.sync_clock();
        }

        self.clock.stop();
        info!(code = %self.game.code(), "room actor stopped");
    }

    /// Returns `false` when the actor should exit.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(&player_id);
                let emptied = matches!(result, Ok(LeaveOutcome { remaining: 0 }));
                let _ = reply.send(result);
                if emptied {
                    info!(code = %self.game.code(), "last player left, closing room");
                    return false;
                }
            }
            RoomCommand::Disconnect { player_id, sender } => {
                let current = self
                    .senders
                    .get(&player_id)
                    .is_some_and(|s| s.same_channel(&sender));
                if !current {
                    debug!(code = %self.game.code(), %player_id, "stale disconnect ignored");
                } else if self.game.set_connected(&player_id, false) {
                    self.senders.remove(&player_id);
                    debug!(code = %self.game.code(), %player_id, "player disconnected");
                }
            }
            RoomCommand::Expire { player_id, reply } => {
                let result = self.handle_expire(&player_id);
                let emptied = matches!(result, Ok(Some(LeaveOutcome { remaining: 0 })));
                let _ = reply.send(result);
                if emptied {
                    info!(code = %self.game.code(), "last player expired, closing room");
                    return false;
                }
            }
            RoomCommand::Action {
                player_id,
                action,
                reply,
            } => {
                let result = self.handle_action(&player_id, action);
                if let Err(e) = &result {
                    debug!(code = %self.game.code(), %player_id, error = %e, "action rejected");
                }
                let _ = reply.send(result);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                info!(code = %self.game.code(), "room shutting down");
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        let (outcome, out) = if self.game.has_player(&player_id) {
            (JoinOutcome::Rejoined, self.game.rejoin(&player_id)?)
        } else {
            (JoinOutcome::Joined, self.game.join(player_id.clone(), name)?)
        };
        // Replaces the stale sender on rejoin.
        self.senders.insert(player_id, sender);
        self.dispatch(out);
        Ok(outcome)
    }

    fn handle_leave(&mut self, player_id: &PlayerId) -> Result<LeaveOutcome, RoomError> {
        let out = self.game.leave(player_id)?;
        self.senders.remove(player_id);
        self.dispatch(out);
        Ok(LeaveOutcome {
            remaining: self.game.player_count(),
        })
    }

    fn handle_expire(&mut self, player_id: &PlayerId) -> Result<Option<LeaveOutcome>, RoomError> {
        match self.game.player(player_id) {
            Some(player) if player.is_connected() => {
                debug!(code = %self.game.code(), %player_id, "expired player is back, keeping seat");
                Ok(None)
            }
            Some(_) => self.handle_leave(player_id).map(Some),
            None => Err(RoomError::NotInRoom(player_id.clone())),
        }
    }

    fn handle_action(&mut self, player_id: &PlayerId, action: RoomAction) -> Result<(), RoomError> {
        let out = match action {
            RoomAction::StartCardSelection => self.game.start_card_selection(player_id)?,
            RoomAction::SelectCard { card_id } => self.game.select_card(player_id, card_id)?,
            RoomAction::StartGame => self.game.start_game(player_id)?,
            RoomAction::MarkCell { cell_index } => self.game.mark_cell(player_id, cell_index)?,
            RoomAction::ClaimBingo => self.game.claim_bingo(player_id)?,
            RoomAction::VerifyClaim { target, is_valid } => {
                self.game.verify_claim(player_id, &target, is_valid)?
            }
            RoomAction::EndGame => self.game.end_game(player_id)?,
            RoomAction::NewRound => self.game.new_round(player_id)?,
            RoomAction::SendChat { message } => self.game.send_chat(player_id, &message)?,
        };
        self.dispatch(out);
        Ok(())
    }

    /// Keeps the clock in step with the phase: running while `Active`,
    /// paused under review, stopped otherwise.
    fn sync_clock(&mut self) {
        match self.game.phase() {
            GamePhase::Active if self.clock.is_paused() => self.clock.resume(),
            GamePhase::Active if !self.clock.is_running() => self.clock.start(),
            GamePhase::Active => {}
            GamePhase::ClaimPending => self.clock.pause(),
            GamePhase::Lobby | GamePhase::CardSelection | GamePhase::Ended => self.clock.stop(),
        }
    }

    /// Fans events out to the roster. `Host` resolves to whoever holds the
    /// role now.
    fn dispatch(&self, out: Outbox) {
        for (recipient, event) in out {
            match recipient {
                Recipient::All => {
                    for player in self.game.players() {
                        self.send_to(player.id(), event.clone());
                    }
                }
                Recipient::Player(id) => self.send_to(&id, event),
                Recipient::Host => {
                    if let Some(host) = self.game.host_id() {
                        self.send_to(host, event);
                    }
                }
                Recipient::AllExcept(excluded) => {
                    for player in self.game.players().filter(|p| *p.id() != excluded) {
                        self.send_to(player.id(), event.clone());
                    }
                }
            }
        }
    }

    /// Drops the event if the player is disconnected.
    fn send_to(&self, player_id: &PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.game.code().clone(),
            phase: self.game.phase(),
            player_count: self.game.player_count(),
            max_players: self.game.config_max_players(),
            called_count: self.game.called_numbers().len(),
        }
    }
}

/// Creates the room with `host_id` seated, delivers the host's opening
/// events and spawns the actor task.
pub(crate) fn spawn_room(
    code: GameCode,
    config: RoomConfig,
    host_id: PlayerId,
    host_name: String,
    sender: PlayerSender,
    rng: StdRng,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let clock = TickScheduler::new(TickConfig::every(config.call_interval));
    let (game, out) = Game::create(code.clone(), config, host_id.clone(), host_name, rng);

    let mut senders = HashMap::new();
    senders.insert(host_id, sender);
    let actor = RoomActor {
        game,
        senders,
        clock,
        receiver: rx,
    };
    actor.dispatch(out);

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
