//! The authoritative bingo state machine for one room.
//!
//! [`Game`] is plain synchronous data. Every operation validates first and
//! only then mutates, so a returned `Err` means nothing changed. Successful
//! operations return the events to deliver as `(Recipient, ServerEvent)`
//! pairs; the room actor fans them out after the operation commits.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use bingo_card::{
    CARD_CELLS, Card, CardPool, FREE_INDEX, MAX_NUMBER, MarkedCells, WinningPattern,
    generate_pool, has_any_win, letter_for, winning_patterns,
};
use bingo_protocol::{
    GameCode, GameOverReason, GamePhase, GameSnapshot, PlayerId, PlayerSummary, PoolCard,
    Recipient, ServerEvent, WinnerInfo,
};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::can_transition;
use crate::{RoomConfig, RoomError};

/// Events produced by one operation, in delivery order.
pub type Outbox = Vec<(Recipient, ServerEvent)>;

/// Longest chat line relayed, in characters, after trimming.
pub const MAX_CHAT_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Player / BingoClaim
// ---------------------------------------------------------------------------

/// One roster entry.
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    name: String,
    card: Option<usize>,
    marked: MarkedCells,
    can_claim: bool,
    connected: bool,
}

impl Player {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            card: None,
            marked: MarkedCells::new(),
            can_claim: false,
            connected: true,
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pool index of the player's card this round.
    pub fn card_index(&self) -> Option<usize> {
        self.card
    }

    pub fn marked(&self) -> &MarkedCells {
        &self.marked
    }

    /// Cells the player marked themselves (FREE excluded), out of 24.
    pub fn marked_count(&self) -> usize {
        self.marked.len() - 1
    }

    pub fn can_claim(&self) -> bool {
        self.can_claim
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn clear_round(&mut self) {
        self.card = None;
        self.marked = MarkedCells::new();
        self.can_claim = false;
    }
}

/// A queued "Bingo!" awaiting the host's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BingoClaim {
    pub player_id: PlayerId,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
    pub marked_count: usize,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Authoritative state of one room.
pub struct Game {
    code: GameCode,
    config: RoomConfig,
    phase: GamePhase,
    /// Join order; the first entry inherits the host role.
    roster: Vec<Player>,
    host: Option<PlayerId>,
    pool: CardPool,
    taken: HashMap<usize, PlayerId>,
    /// Numbers not yet called this round.
    deck: Vec<u8>,
    called: Vec<u8>,
    called_set: HashSet<u8>,
    claims: VecDeque<BingoClaim>,
    all_ready_announced: bool,
    rng: StdRng,
}

impl Game {
    /// Opens a room in `Lobby` with `host_id` as its only player.
    pub fn create(
        code: GameCode,
        config: RoomConfig,
        host_id: PlayerId,
        host_name: String,
        rng: StdRng,
    ) -> (Self, Outbox) {
        let game = Self {
            code: code.clone(),
            config,
            phase: GamePhase::Lobby,
            roster: vec![Player::new(host_id.clone(), host_name)],
            host: Some(host_id.clone()),
            pool: CardPool::default(),
            taken: HashMap::new(),
            deck: Vec::new(),
            called: Vec::new(),
            called_set: HashSet::new(),
            claims: VecDeque::new(),
            all_ready_announced: false,
            rng,
        };
        let host = game.summary_of(&game.roster[0]);
        let out = vec![
            (
                Recipient::Player(host_id.clone()),
                ServerEvent::GameCreated {
                    game_id: code.clone(),
                    message: format!("Game {code} created. Share the code to invite players."),
                },
            ),
            (
                Recipient::Player(host_id),
                ServerEvent::GameJoined {
                    game: game.snapshot(),
                    player: host,
                },
            ),
        ];
        (game, out)
    }

    // -- Accessors ----------------------------------------------------------

    pub fn code(&self) -> &GameCode {
        &self.code
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn host_id(&self) -> Option<&PlayerId> {
        self.host.as_ref()
    }

    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.roster.iter().any(|p| &p.id == id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.roster.iter().find(|p| &p.id == id)
    }

    /// Roster in join order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.roster.iter()
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn config_max_players(&self) -> usize {
        self.config.max_players
    }

    pub fn called_numbers(&self) -> &[u8] {
        &self.called
    }

    pub fn claims(&self) -> impl Iterator<Item = &BingoClaim> {
        self.claims.iter()
    }

    pub fn pool(&self) -> &CardPool {
        &self.pool
    }

    /// The card `id` holds this round.
    pub fn card_of(&self, id: &PlayerId) -> Option<&Card> {
        self.player(id)?.card.and_then(|i| self.pool.get(i))
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.code.clone(),
            state: self.phase,
            host_id: self.host.clone(),
            players: self.summaries(),
            called_numbers: self.called.clone(),
            is_game_active: self.phase.is_in_progress(),
        }
    }

    // -- Membership ---------------------------------------------------------

    /// Adds a new player. Accepted in every phase; mid-round joiners sit
    /// out until the next round.
    pub fn join(&mut self, id: PlayerId, name: String) -> Result<Outbox, RoomError> {
        if self.has_player(&id) {
            return Err(RoomError::AlreadyInRoom(id, self.code.clone()));
        }
        if self.roster.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        let player = Player::new(id.clone(), name);
        let summary = self.summary_of(&player);
        self.roster.push(player);
        info!(code = %self.code, player_id = %id, players = self.roster.len(), "player joined");

        let mut out = vec![
            (
                Recipient::AllExcept(id.clone()),
                ServerEvent::PlayerJoined {
                    player: summary.clone(),
                    players: self.summaries(),
                },
            ),
            (
                Recipient::Player(id.clone()),
                ServerEvent::GameJoined {
                    game: self.snapshot(),
                    player: summary,
                },
            ),
        ];

        match self.phase {
            GamePhase::Lobby => {}
            GamePhase::CardSelection => {
                // The newcomer has no card yet, so "everyone ready" can fire again.
                self.all_ready_announced = false;
                out.push((
                    Recipient::Player(id),
                    ServerEvent::CardPool {
                        cards: self.pool_cards(),
                    },
                ));
            }
            GamePhase::Active | GamePhase::ClaimPending | GamePhase::Ended => {
                out.push((
                    Recipient::Player(id),
                    ServerEvent::RoundInProgress {
                        message: "A round is in progress. You will get a card next round."
                            .into(),
                    },
                ));
            }
        }
        Ok(out)
    }

    /// Restores a player who is still on the roster (reconnecting within the
    /// grace window) and resends everything they need to resume.
    pub fn rejoin(&mut self, id: &PlayerId) -> Result<Outbox, RoomError> {
        let player = self.player_mut(id)?;
        player.connected = true;
        let card = player.card;
        let can_claim = player.can_claim;
        let marked: Vec<usize> = player.marked.iter().filter(|&i| i != FREE_INDEX).collect();

        let summary = self.summary_for(id)?;
        info!(code = %self.code, player_id = %id, "player rejoined");

        let mut out = vec![
            (
                Recipient::AllExcept(id.clone()),
                ServerEvent::PlayerJoined {
                    player: summary.clone(),
                    players: self.summaries(),
                },
            ),
            (
                Recipient::Player(id.clone()),
                ServerEvent::GameJoined {
                    game: self.snapshot(),
                    player: summary,
                },
            ),
        ];

        if self.phase == GamePhase::CardSelection {
            out.push((
                Recipient::Player(id.clone()),
                ServerEvent::CardPool {
                    cards: self.pool_cards(),
                },
            ));
        }

        match card.and_then(|i| self.pool.get(i).map(|c| (i, c.clone()))) {
            Some((card_id, card)) => {
                out.push((
                    Recipient::Player(id.clone()),
                    ServerEvent::CardSelected {
                        success: true,
                        card_id,
                        card,
                        marked_cells: marked,
                    },
                ));
                if can_claim && self.phase.is_in_progress() {
                    out.push((Recipient::Player(id.clone()), ServerEvent::CanClaimBingo));
                }
            }
            None if self.phase.is_in_progress() => {
                out.push((
                    Recipient::Player(id.clone()),
                    ServerEvent::RoundInProgress {
                        message: "A round is in progress. You will get a card next round."
                            .into(),
                    },
                ));
            }
            None => {}
        }

        // Anything sent to the host while they were away was dropped.
        if self.phase == GamePhase::ClaimPending && self.host.as_ref() == Some(id) {
            out.extend(self.review_head());
        }
        Ok(out)
    }

    /// Flags a player whose connection dropped. They keep their seat.
    pub fn set_connected(&mut self, id: &PlayerId, connected: bool) -> bool {
        match self.player_mut(id) {
            Ok(player) => {
                player.connected = connected;
                true
            }
            Err(_) => false,
        }
    }

    /// Removes a player, handing the host role on and discarding their claim.
    pub fn leave(&mut self, id: &PlayerId) -> Result<Outbox, RoomError> {
        let pos = self
            .roster
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))?;
        let leaver = self.roster.remove(pos);
        self.taken.retain(|_, owner| *owner != *id);

        let was_head = self.claims.front().is_some_and(|c| &c.player_id == id);
        self.claims.retain(|c| &c.player_id != id);

        info!(code = %self.code, player_id = %id, players = self.roster.len(), "player left");

        let mut out = vec![(
            Recipient::All,
            ServerEvent::PlayerLeft {
                player_id: leaver.id.clone(),
                player_name: leaver.name.clone(),
                players: self.summaries(),
            },
        )];

        let host_changed = self.host.as_ref() == Some(id);
        if host_changed {
            self.host = self.roster.first().map(|p| p.id.clone());
            if let Some(next) = self.roster.first() {
                info!(code = %self.code, host = %next.id, "host passed on");
                out.push((
                    Recipient::All,
                    ServerEvent::NewHost {
                        host_id: next.id.clone(),
                        host_name: next.name.clone(),
                    },
                ));
            }
        }

        if self.phase == GamePhase::ClaimPending {
            if self.claims.is_empty() {
                self.set_phase(GamePhase::Active);
            } else if was_head || host_changed {
                out.extend(self.review_head());
            }
        }

        self.announce_if_all_ready(&mut out);
        Ok(out)
    }

    // -- Card selection -----------------------------------------------------

    /// Deals a fresh pool and opens card selection.
    pub fn start_card_selection(&mut self, requester: &PlayerId) -> Result<Outbox, RoomError> {
        self.require_host(requester)?;
        self.require_phase("start card selection", &[GamePhase::Lobby])?;

        let pool = generate_pool(&mut self.rng, self.config.card_pool_size)?;
        self.pool = pool;
        self.taken.clear();
        self.all_ready_announced = false;
        for player in &mut self.roster {
            player.clear_round();
        }
        self.set_phase(GamePhase::CardSelection);

        Ok(vec![(
            Recipient::All,
            ServerEvent::CardPool {
                cards: self.pool_cards(),
            },
        )])
    }

    /// Assigns pool card `index` to `player_id`.
    pub fn select_card(&mut self, player_id: &PlayerId, index: usize) -> Result<Outbox, RoomError> {
        let player = self.player(player_id).ok_or_else(|| RoomError::NotInRoom(player_id.clone()))?;
        self.require_phase("select a card", &[GamePhase::CardSelection])?;
        if player.card.is_some() {
            return Err(RoomError::CardAlreadySelected);
        }
        let card = self
            .pool
            .get(index)
            .cloned()
            .ok_or(RoomError::InvalidCardIndex(index))?;
        if self.taken.contains_key(&index) {
            return Err(RoomError::CardAlreadyTaken(index));
        }

        self.taken.insert(index, player_id.clone());
        let player = self.player_mut(player_id)?;
        player.card = Some(index);
        let name = player.name.clone();
        debug!(code = %self.code, %player_id, card = index, "card selected");

        let mut out = vec![
            (
                Recipient::All,
                ServerEvent::PlayerCardSelected {
                    player_id: player_id.clone(),
                    player_name: name,
                    card_id: index,
                },
            ),
            (
                Recipient::Player(player_id.clone()),
                ServerEvent::CardSelected {
                    success: true,
                    card_id: index,
                    card,
                    marked_cells: Vec::new(),
                },
            ),
        ];
        self.announce_if_all_ready(&mut out);
        Ok(out)
    }

    // -- Play ---------------------------------------------------------------

    /// Starts calling numbers. Every player must hold a card.
    pub fn start_game(&mut self, requester: &PlayerId) -> Result<Outbox, RoomError> {
        self.require_host(requester)?;
        self.require_phase("start the game", &[GamePhase::CardSelection])?;
        let waiting = self.roster.iter().filter(|p| p.card.is_none()).count();
        if waiting > 0 {
            return Err(RoomError::NotAllReady { waiting });
        }

        self.deck = (1..=MAX_NUMBER).collect();
        self.called.clear();
        self.called_set.clear();
        self.claims.clear();
        for player in &mut self.roster {
            player.marked = MarkedCells::new();
            player.can_claim = false;
        }
        self.set_phase(GamePhase::Active);

        Ok(vec![(
            Recipient::All,
            ServerEvent::GameStarted {
                called_numbers: Vec::new(),
            },
        )])
    }

    /// One clock tick: call a number, or end the round if none are left.
    ///
    /// Does nothing outside `Active`.
    pub fn call_next_number(&mut self) -> Outbox {
        if self.phase != GamePhase::Active {
            return Vec::new();
        }

        if self.deck.is_empty() {
            info!(code = %self.code, "all numbers called without a winner");
            self.claims.clear();
            self.set_phase(GamePhase::Ended);
            return vec![(
                Recipient::All,
                ServerEvent::GameOver {
                    reason: GameOverReason::NumbersExhausted,
                    called_numbers: self.called.clone(),
                    total_called: self.called.len(),
                },
            )];
        }

        let pick = self.rng.random_range(0..self.deck.len());
        let number = self.deck.swap_remove(pick);
        self.called.push(number);
        self.called_set.insert(number);
        debug!(code = %self.code, number, total = self.called.len(), "number called");

        vec![(
            Recipient::All,
            ServerEvent::NumberCalled {
                number,
                letter: letter_for(number).unwrap_or('?'),
                called_numbers: self.called.clone(),
                total_called: self.called.len(),
            },
        )]
    }

    /// Marks `cell` on the player's card.
    pub fn mark_cell(&mut self, player_id: &PlayerId, cell: usize) -> Result<Outbox, RoomError> {
        let player = self.player(player_id).ok_or_else(|| RoomError::NotInRoom(player_id.clone()))?;
        self.require_phase("mark a cell", &[GamePhase::Active])?;
        let card = player
            .card
            .and_then(|i| self.pool.get(i))
            .ok_or(RoomError::NoCard)?;
        if cell >= CARD_CELLS {
            return Err(RoomError::InvalidCell(cell));
        }
        if cell == FREE_INDEX {
            return Err(RoomError::FreeCell);
        }
        if player.marked.contains(cell) {
            return Err(RoomError::AlreadyMarked(cell));
        }
        let number = card.number_at(cell).ok_or(RoomError::InvalidCell(cell))?;
        if !self.called_set.contains(&number) {
            return Err(RoomError::NumberNotCalled(number));
        }

        let player = self.player_mut(player_id)?;
        player.marked.insert(cell);
        let was_eligible = player.can_claim;
        player.can_claim = has_any_win(&player.marked);
        let eligible = player.can_claim;
        let marked_count = player.marked_count();

        let mut out = vec![
            (
                Recipient::Player(player_id.clone()),
                ServerEvent::CellMarked {
                    cell_index: cell,
                    can_claim_bingo: eligible,
                },
            ),
            (
                Recipient::All,
                ServerEvent::PlayerMarkedCell {
                    player_id: player_id.clone(),
                    marked_count,
                },
            ),
        ];
        if eligible && !was_eligible {
            out.push((Recipient::Player(player_id.clone()), ServerEvent::CanClaimBingo));
        }
        Ok(out)
    }

    /// Queues a claim after checking it server-side. Pauses calling.
    pub fn claim_bingo(&mut self, player_id: &PlayerId) -> Result<Outbox, RoomError> {
        let player = self.player(player_id).ok_or_else(|| RoomError::NotInRoom(player_id.clone()))?;
        self.require_phase(
            "claim bingo",
            &[GamePhase::Active, GamePhase::ClaimPending],
        )?;
        if player.card.is_none() {
            return Err(RoomError::NoCard);
        }
        if self.claims.iter().any(|c| &c.player_id == player_id) {
            return Err(RoomError::AlreadyClaimed);
        }
        if !has_any_win(&player.marked) {
            return Err(RoomError::NoWinningPattern);
        }

        let claim = BingoClaim {
            player_id: player_id.clone(),
            timestamp: now_millis(),
            marked_count: player.marked_count(),
        };
        let name = player.name.clone();
        let first_in_queue = self.claims.is_empty();
        info!(code = %self.code, %player_id, queued = self.claims.len(), "bingo claimed");

        let mut out = vec![(
            Recipient::All,
            ServerEvent::BingoClaimed {
                player_id: player_id.clone(),
                player_name: name,
                timestamp: claim.timestamp,
                marked_count: claim.marked_count,
            },
        )];
        self.claims.push_back(claim);
        if self.phase == GamePhase::Active {
            self.set_phase(GamePhase::ClaimPending);
        }
        if first_in_queue {
            out.extend(self.review_head());
        }
        Ok(out)
    }

    /// Applies the host's verdict on `target`'s queued claim.
    ///
    /// The claim only wins if the host accepts it *and* the server's own
    /// check agrees. When the two disagree the claim is rejected and the
    /// host is warned.
    pub fn verify_claim(
        &mut self,
        requester: &PlayerId,
        target: &PlayerId,
        host_says_valid: bool,
    ) -> Result<Outbox, RoomError> {
        self.require_host(requester)?;
        let pos = self
            .claims
            .iter()
            .position(|c| &c.player_id == target)
            .ok_or_else(|| RoomError::NoPendingClaim(target.clone()))?;
        let claimant = self
            .player(target)
            .ok_or_else(|| RoomError::NoPendingClaim(target.clone()))?;

        let patterns = winning_patterns(&claimant.marked);
        let server_says_valid = !patterns.is_empty();
        let name = claimant.name.clone();
        let mut out = Vec::new();

        if host_says_valid != server_says_valid {
            warn!(
                code = %self.code,
                claimant = %target,
                host_says_valid,
                server_says_valid,
                "host verdict disagrees with server check, rejecting claim"
            );
            let message = if host_says_valid {
                format!("{name}'s card has no winning pattern. The claim was rejected.")
            } else {
                format!("{name}'s card does have a winning pattern. The claim was rejected as you asked.")
            };
            out.push((
                Recipient::Host,
                ServerEvent::VerificationWarning {
                    player_id: target.clone(),
                    message,
                },
            ));
        }

        if host_says_valid && server_says_valid {
            info!(code = %self.code, winner = %target, "bingo verified");
            self.claims.clear();
            self.set_phase(GamePhase::Ended);
            out.push((
                Recipient::All,
                ServerEvent::BingoVerified {
                    player_id: target.clone(),
                    is_valid: true,
                    message: format!("{name} wins!"),
                    winner: Some(WinnerInfo {
                        id: target.clone(),
                        name,
                        winning_pattern: patterns.into_iter().map(WinningPattern::from).collect(),
                    }),
                },
            ));
            return Ok(out);
        }

        info!(code = %self.code, claimant = %target, "bingo claim rejected");
        self.claims.remove(pos);
        out.push((
            Recipient::All,
            ServerEvent::BingoVerified {
                player_id: target.clone(),
                is_valid: false,
                message: format!("{name}'s claim was rejected"),
                winner: None,
            },
        ));
        if self.claims.is_empty() {
            if self.phase == GamePhase::ClaimPending {
                self.set_phase(GamePhase::Active);
            }
        } else if pos == 0 {
            out.extend(self.review_head());
        }
        Ok(out)
    }

    /// Host stops the round early.
    pub fn end_game(&mut self, requester: &PlayerId) -> Result<Outbox, RoomError> {
        self.require_host(requester)?;
        self.require_phase(
            "end the game",
            &[
                GamePhase::CardSelection,
                GamePhase::Active,
                GamePhase::ClaimPending,
            ],
        )?;

        info!(code = %self.code, "game ended by host");
        self.claims.clear();
        self.set_phase(GamePhase::Ended);
        Ok(vec![(
            Recipient::All,
            ServerEvent::GameOver {
                reason: GameOverReason::EndedByHost,
                called_numbers: self.called.clone(),
                total_called: self.called.len(),
            },
        )])
    }

    /// Returns an ended room to the lobby with a clean slate.
    pub fn new_round(&mut self, requester: &PlayerId) -> Result<Outbox, RoomError> {
        self.require_host(requester)?;
        self.require_phase("start a new round", &[GamePhase::Ended])?;

        for player in &mut self.roster {
            player.clear_round();
        }
        self.pool = CardPool::default();
        self.taken.clear();
        self.deck.clear();
        self.called.clear();
        self.called_set.clear();
        self.claims.clear();
        self.all_ready_announced = false;
        self.set_phase(GamePhase::Lobby);

        Ok(vec![(
            Recipient::All,
            ServerEvent::RoundReset {
                players: self.summaries(),
            },
        )])
    }

    // -- Chat ---------------------------------------------------------------

    /// Relays a chat line to the whole room. Allowed in every phase.
    pub fn send_chat(&self, player_id: &PlayerId, message: &str) -> Result<Outbox, RoomError> {
        let player = self
            .player(player_id)
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone()))?;
        let message = message.trim();
        if message.is_empty() {
            return Err(RoomError::EmptyChat);
        }
        if message.chars().count() > MAX_CHAT_LEN {
            return Err(RoomError::ChatTooLong(MAX_CHAT_LEN));
        }

        Ok(vec![(
            Recipient::All,
            ServerEvent::ChatMessage {
                player_id: player_id.clone(),
                player_name: player.name.clone(),
                message: message.to_string(),
                timestamp: now_millis(),
            },
        )])
    }

    // -- Helpers ------------------------------------------------------------

    fn player_mut(&mut self, id: &PlayerId) -> Result<&mut Player, RoomError> {
        self.roster
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))
    }

    fn require_host(&self, id: &PlayerId) -> Result<(), RoomError> {
        if !self.has_player(id) {
            return Err(RoomError::NotInRoom(id.clone()));
        }
        if self.host.as_ref() != Some(id) {
            return Err(RoomError::NotHost);
        }
        Ok(())
    }

    fn require_phase(&self, action: &'static str, allowed: &[GamePhase]) -> Result<(), RoomError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(RoomError::InvalidState {
                action,
                phase: self.phase,
            })
        }
    }

    fn set_phase(&mut self, to: GamePhase) {
        debug_assert!(
            can_transition(self.phase, to),
            "illegal transition {} -> {to}",
            self.phase
        );
        info!(code = %self.code, from = %self.phase, %to, "phase changed");
        self.phase = to;
    }

    fn announce_if_all_ready(&mut self, out: &mut Outbox) {
        let all_ready = !self.roster.is_empty() && self.roster.iter().all(|p| p.card.is_some());
        if self.phase == GamePhase::CardSelection && all_ready && !self.all_ready_announced {
            self.all_ready_announced = true;
            out.push((Recipient::All, ServerEvent::AllPlayersReady));
        }
    }

    /// Host notice for the claim at the head of the queue.
    fn review_head(&self) -> Option<(Recipient, ServerEvent)> {
        let head = self.claims.front()?;
        let name = self
            .player(&head.player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        Some((
            Recipient::Host,
            ServerEvent::ClaimUnderReview {
                player_id: head.player_id.clone(),
                player_name: name,
                marked_count: head.marked_count,
                queued: self.claims.len() - 1,
            },
        ))
    }

    fn pool_cards(&self) -> Vec<PoolCard> {
        self.pool
            .iter()
            .enumerate()
            .map(|(id, card)| PoolCard {
                id,
                preview: card.preview(),
                taken: self.taken.contains_key(&id),
            })
            .collect()
    }

    fn summary_of(&self, player: &Player) -> PlayerSummary {
        PlayerSummary {
            id: player.id.clone(),
            name: player.name.clone(),
            is_host: self.host.as_ref() == Some(&player.id),
            has_selected_card: player.card.is_some(),
            marked_count: player.marked_count(),
            connected: player.connected,
        }
    }

    fn summary_for(&self, id: &PlayerId) -> Result<PlayerSummary, RoomError> {
        self.player(id)
            .map(|p| self.summary_of(p))
            .ok_or_else(|| RoomError::NotInRoom(id.clone()))
    }

    fn summaries(&self) -> Vec<PlayerSummary> {
        self.roster.iter().map(|p| self.summary_of(p)).collect()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use bingo_card::Pattern;
    use rand::SeedableRng;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn new_game() -> Game {
        let (game, _) = Game::create(
            GameCode::new("ABCD1234"),
            RoomConfig {
                max_players: 4,
                card_pool_size: 6,
                ..RoomConfig::default()
            },
            pid("host"),
            "Host".into(),
            StdRng::seed_from_u64(1),
        );
        game
    }

    /// Lobby with host + the given guests.
    fn game_with(guests: &[&str]) -> Game {
        let mut game = new_game();
        for g in guests {
            game.join(pid(g), g.to_string()).unwrap();
        }
        game
    }

    /// Active round: everyone got card i in join order.
    fn active_game(guests: &[&str]) -> Game {
        let mut game = game_with(guests);
        game.start_card_selection(&pid("host")).unwrap();
        let ids: Vec<PlayerId> = game.players().map(|p| p.id().clone()).collect();
        for (i, id) in ids.iter().enumerate() {
            game.select_card(id, i).unwrap();
        }
        game.start_game(&pid("host")).unwrap();
        game
    }

    /// Calls numbers until every number of row 0 on `id`'s card is out,
    /// then marks the row.
    fn complete_top_row(game: &mut Game, id: &PlayerId) {
        let card = game.card_of(id).unwrap().clone();
        let row: Vec<u8> = (0..5).filter_map(|i| card.number_at(i)).collect();
        while !row.iter().all(|n| game.called_numbers().contains(n)) {
            assert!(!game.call_next_number().is_empty());
        }
        for cell in 0..5 {
            game.mark_cell(id, cell).unwrap();
        }
    }

    fn events_for<'a>(out: &'a Outbox, who: &Recipient) -> Vec<&'a ServerEvent> {
        out.iter().filter(|(r, _)| r == who).map(|(_, e)| e).collect()
    }

    // =====================================================================
    // create() / join()
    // =====================================================================

    #[test]
    fn test_create_sends_created_then_joined_to_host() {
        let (game, out) = Game::create(
            GameCode::new("ABCD1234"),
            RoomConfig::default(),
            pid("host"),
            "Host".into(),
            StdRng::seed_from_u64(1),
        );
        assert_eq!(game.phase(), GamePhase::Lobby);
        assert_eq!(game.host_id(), Some(&pid("host")));
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0].1, ServerEvent::GameCreated { .. }));
        assert!(matches!(&out[1].1, ServerEvent::GameJoined { player, .. } if player.is_host));
    }

    #[test]
    fn test_join_notifies_members_and_joiner() {
        let mut game = new_game();

        let out = game.join(pid("p2"), "Bob".into()).unwrap();

        assert!(matches!(
            &out[0],
            (Recipient::AllExcept(p), ServerEvent::PlayerJoined { players, .. })
                if p == &pid("p2") && players.len() == 2
        ));
        assert!(matches!(
            &out[1],
            (Recipient::Player(p), ServerEvent::GameJoined { game, .. })
                if p == &pid("p2") && game.players.len() == 2
        ));
    }

    #[test]
    fn test_join_full_room_returns_error() {
        let mut game = game_with(&["a", "b", "c"]);
        let result = game.join(pid("d"), "D".into());
        assert!(matches!(result, Err(RoomError::RoomFull(_))));
        assert_eq!(game.player_count(), 4);
    }

    #[test]
    fn test_join_twice_returns_already_in_room() {
        let mut game = game_with(&["a"]);
        assert!(matches!(
            game.join(pid("a"), "A".into()),
            Err(RoomError::AlreadyInRoom(..))
        ));
    }

    #[test]
    fn test_join_during_selection_sends_pool_and_rearms_ready() {
        let mut game = game_with(&["a"]);
        game.start_card_selection(&pid("host")).unwrap();
        game.select_card(&pid("host"), 0).unwrap();
        let out = game.select_card(&pid("a"), 1).unwrap();
        assert!(out.iter().any(|(_, e)| *e == ServerEvent::AllPlayersReady));

        let out = game.join(pid("late"), "Late".into()).unwrap();
        assert!(matches!(
            events_for(&out, &Recipient::Player(pid("late"))).last(),
            Some(ServerEvent::CardPool { cards }) if cards.len() == 6 && cards[0].taken
        ));

        let out = game.select_card(&pid("late"), 2).unwrap();
        assert!(
            out.iter().any(|(_, e)| *e == ServerEvent::AllPlayersReady),
            "all-ready fires again after the late joiner picks"
        );
    }

    #[test]
    fn test_join_mid_round_gets_no_card() {
        let mut game = active_game(&[]);
        let out = game.join(pid("late"), "Late".into()).unwrap();
        assert!(matches!(out.last(), Some((_, ServerEvent::RoundInProgress { .. }))));
        assert!(matches!(
            game.mark_cell(&pid("late"), 0),
            Err(RoomError::NoCard)
        ));
        assert!(matches!(game.claim_bingo(&pid("late")), Err(RoomError::NoCard)));
    }

    #[test]
    fn test_rejoin_resends_card_and_marks() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.set_connected(&pid("a"), false);
        assert!(!game.player(&pid("a")).unwrap().is_connected());

        let out = game.rejoin(&pid("a")).unwrap();

        let mine = events_for(&out, &Recipient::Player(pid("a")));
        assert!(matches!(mine[0], ServerEvent::GameJoined { .. }));
        assert!(matches!(
            mine[1],
            ServerEvent::CardSelected { card_id: 1, marked_cells, .. } if marked_cells == &vec![0, 1, 2, 3, 4]
        ));
        assert_eq!(mine[2], &ServerEvent::CanClaimBingo);
        assert!(game.player(&pid("a")).unwrap().is_connected());
    }

    #[test]
    fn test_rejoin_host_during_claim_review_resends_review() {
        let mut game = active_game(&["a"]);
        game.set_connected(&pid("host"), false);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();
        assert_eq!(game.phase(), GamePhase::ClaimPending);

        let out = game.rejoin(&pid("host")).unwrap();

        let review = events_for(&out, &Recipient::Host);
        assert_eq!(review.len(), 1);
        assert!(matches!(
            review[0],
            ServerEvent::ClaimUnderReview { player_id, marked_count: 5, queued: 0, .. } if player_id == &pid("a")
        ));
    }

    #[test]
    fn test_rejoin_guest_during_claim_review_sends_no_review() {
        let mut game = active_game(&["a", "b"]);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();
        game.set_connected(&pid("b"), false);

        let out = game.rejoin(&pid("b")).unwrap();

        assert!(events_for(&out, &Recipient::Host).is_empty());
    }

    // =====================================================================
    // leave()
    // =====================================================================

    #[test]
    fn test_leave_host_passes_to_next_in_join_order() {
        let mut game = game_with(&["x", "y", "z"]);

        let out = game.leave(&pid("host")).unwrap();

        assert_eq!(game.host_id(), Some(&pid("x")));
        assert!(out.iter().any(|(_, e)| matches!(
            e,
            ServerEvent::NewHost { host_id, .. } if host_id == &pid("x")
        )));
        assert!(matches!(out[0].1, ServerEvent::PlayerLeft { .. }));
    }

    #[test]
    fn test_leave_non_host_keeps_host() {
        let mut game = game_with(&["x", "y"]);
        let out = game.leave(&pid("y")).unwrap();
        assert_eq!(game.host_id(), Some(&pid("host")));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_leave_last_player_empties_roster() {
        let mut game = new_game();
        game.leave(&pid("host")).unwrap();
        assert_eq!(game.player_count(), 0);
        assert_eq!(game.host_id(), None);
    }

    #[test]
    fn test_leave_during_selection_frees_card_and_fires_ready() {
        let mut game = game_with(&["a", "b"]);
        game.start_card_selection(&pid("host")).unwrap();
        game.select_card(&pid("host"), 0).unwrap();
        game.select_card(&pid("a"), 3).unwrap();

        let out = game.leave(&pid("a")).unwrap();
        assert!(!out.iter().any(|(_, e)| *e == ServerEvent::AllPlayersReady));
        game.select_card(&pid("b"), 3).expect("card 3 was released");

        let mut game = game_with(&["a", "b"]);
        game.start_card_selection(&pid("host")).unwrap();
        game.select_card(&pid("host"), 0).unwrap();
        game.select_card(&pid("a"), 1).unwrap();
        let out = game.leave(&pid("b")).unwrap();
        assert!(
            out.iter().any(|(_, e)| *e == ServerEvent::AllPlayersReady),
            "the only player without a card left"
        );
    }

    #[test]
    fn test_leave_under_review_presents_next_claim() {
        let mut game = active_game(&["a", "b"]);
        complete_top_row(&mut game, &pid("a"));
        complete_top_row(&mut game, &pid("b"));
        game.claim_bingo(&pid("a")).unwrap();
        game.claim_bingo(&pid("b")).unwrap();

        let out = game.leave(&pid("a")).unwrap();

        assert!(out.iter().any(|(r, e)| *r == Recipient::Host
            && matches!(e, ServerEvent::ClaimUnderReview { player_id, .. } if player_id == &pid("b"))));
        assert_eq!(game.phase(), GamePhase::ClaimPending);
    }

    #[test]
    fn test_leave_only_claimant_resumes_play() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();

        game.leave(&pid("a")).unwrap();

        assert_eq!(game.phase(), GamePhase::Active);
        assert_eq!(game.claims().count(), 0);
    }

    // =====================================================================
    // Card selection
    // =====================================================================

    #[test]
    fn test_start_card_selection_requires_host() {
        let mut game = game_with(&["a"]);
        assert!(matches!(
            game.start_card_selection(&pid("a")),
            Err(RoomError::NotHost)
        ));
        assert_eq!(game.phase(), GamePhase::Lobby);
    }

    #[test]
    fn test_start_card_selection_broadcasts_distinct_previews() {
        let mut game = new_game();
        let out = game.start_card_selection(&pid("host")).unwrap();
        let ServerEvent::CardPool { cards } = &out[0].1 else {
            panic!("expected card-pool");
        };
        assert_eq!(cards.len(), 6);
        let distinct: HashSet<_> = game.pool().iter().collect();
        assert_eq!(distinct.len(), 6);
        assert_eq!(game.phase(), GamePhase::CardSelection);
    }

    #[test]
    fn test_select_card_taken_returns_conflict() {
        let mut game = game_with(&["a"]);
        game.start_card_selection(&pid("host")).unwrap();
        game.select_card(&pid("host"), 2).unwrap();

        let result = game.select_card(&pid("a"), 2);

        assert!(matches!(result, Err(RoomError::CardAlreadyTaken(2))));
        assert_eq!(game.player(&pid("a")).unwrap().card_index(), None);
    }

    #[test]
    fn test_select_card_twice_returns_already_selected() {
        let mut game = new_game();
        game.start_card_selection(&pid("host")).unwrap();
        game.select_card(&pid("host"), 0).unwrap();
        assert!(matches!(
            game.select_card(&pid("host"), 1),
            Err(RoomError::CardAlreadySelected)
        ));
    }

    #[test]
    fn test_select_card_out_of_range_returns_invalid_index() {
        let mut game = new_game();
        game.start_card_selection(&pid("host")).unwrap();
        assert!(matches!(
            game.select_card(&pid("host"), 6),
            Err(RoomError::InvalidCardIndex(6))
        ));
    }

    #[test]
    fn test_select_card_sends_layout_to_owner_only() {
        let mut game = game_with(&["a"]);
        game.start_card_selection(&pid("host")).unwrap();
        let out = game.select_card(&pid("a"), 4).unwrap();

        assert!(matches!(
            events_for(&out, &Recipient::Player(pid("a")))[0],
            ServerEvent::CardSelected { card_id: 4, .. }
        ));
        assert!(matches!(
            events_for(&out, &Recipient::All)[0],
            ServerEvent::PlayerCardSelected { card_id: 4, .. }
        ));
    }

    #[test]
    fn test_all_players_ready_fires_once() {
        let mut game = game_with(&["a"]);
        game.start_card_selection(&pid("host")).unwrap();
        game.select_card(&pid("host"), 0).unwrap();
        let out = game.select_card(&pid("a"), 1).unwrap();
        let ready = out
            .iter()
            .filter(|(_, e)| *e == ServerEvent::AllPlayersReady)
            .count();
        assert_eq!(ready, 1);
    }

    // =====================================================================
    // start_game() / call_next_number()
    // =====================================================================

    #[test]
    fn test_start_game_not_all_ready_returns_error() {
        let mut game = game_with(&["a", "b"]);
        game.start_card_selection(&pid("host")).unwrap();
        game.select_card(&pid("host"), 0).unwrap();

        let result = game.start_game(&pid("host"));

        assert!(matches!(result, Err(RoomError::NotAllReady { waiting: 2 })));
        assert_eq!(game.phase(), GamePhase::CardSelection);
    }

    #[test]
    fn test_start_game_from_lobby_returns_invalid_state() {
        let mut game = new_game();
        assert!(matches!(
            game.start_game(&pid("host")),
            Err(RoomError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_call_next_number_never_repeats_and_ends_after_75() {
        let mut game = active_game(&[]);
        let mut seen = HashSet::new();

        for expected in 1..=75 {
            let out = game.call_next_number();
            let ServerEvent::NumberCalled {
                number,
                total_called,
                letter,
                ..
            } = &out[0].1
            else {
                panic!("expected number-called");
            };
            assert!(seen.insert(*number), "number {number} called twice");
            assert!((1..=75).contains(number));
            assert_eq!(*total_called, expected);
            assert_eq!(Some(*letter), letter_for(*number));
        }
        assert_eq!(game.phase(), GamePhase::Active, "one last interval for claims");

        let out = game.call_next_number();
        assert!(matches!(
            &out[0].1,
            ServerEvent::GameOver { reason: GameOverReason::NumbersExhausted, total_called: 75, .. }
        ));
        assert_eq!(game.phase(), GamePhase::Ended);
        assert!(game.call_next_number().is_empty());
        assert_eq!(game.called_numbers().len(), 75);
    }

    #[test]
    fn test_call_next_number_outside_active_does_nothing() {
        let mut game = new_game();
        assert!(game.call_next_number().is_empty());
        assert!(game.called_numbers().is_empty());
    }

    // =====================================================================
    // mark_cell()
    // =====================================================================

    #[test]
    fn test_mark_cell_uncalled_number_rejected() {
        let mut game = active_game(&[]);
        let result = game.mark_cell(&pid("host"), 0);
        assert!(matches!(result, Err(RoomError::NumberNotCalled(_))));
        assert_eq!(game.player(&pid("host")).unwrap().marked_count(), 0);
    }

    #[test]
    fn test_mark_cell_free_and_out_of_range_rejected() {
        let mut game = active_game(&[]);
        assert!(matches!(game.mark_cell(&pid("host"), 12), Err(RoomError::FreeCell)));
        assert!(matches!(game.mark_cell(&pid("host"), 25), Err(RoomError::InvalidCell(25))));
    }

    #[test]
    fn test_mark_cell_twice_rejected() {
        let mut game = active_game(&[]);
        complete_top_row(&mut game, &pid("host"));
        assert!(matches!(
            game.mark_cell(&pid("host"), 0),
            Err(RoomError::AlreadyMarked(0))
        ));
    }

    #[test]
    fn test_mark_cell_completing_row_signals_claim_once() {
        let mut game = active_game(&["a"]);
        let card = game.card_of(&pid("a")).unwrap().clone();
        let row: Vec<u8> = (0..5).filter_map(|i| card.number_at(i)).collect();
        while !row.iter().all(|n| game.called_numbers().contains(n)) {
            game.call_next_number();
        }

        for cell in 0..4 {
            let out = game.mark_cell(&pid("a"), cell).unwrap();
            assert!(!out.iter().any(|(_, e)| *e == ServerEvent::CanClaimBingo));
        }
        let out = game.mark_cell(&pid("a"), 4).unwrap();

        assert_eq!(
            events_for(&out, &Recipient::Player(pid("a"))),
            vec![
                &ServerEvent::CellMarked {
                    cell_index: 4,
                    can_claim_bingo: true
                },
                &ServerEvent::CanClaimBingo,
            ]
        );
        assert!(matches!(
            events_for(&out, &Recipient::All)[0],
            ServerEvent::PlayerMarkedCell { marked_count: 5, .. }
        ));
    }

    // =====================================================================
    // claim_bingo() / verify_claim()
    // =====================================================================

    #[test]
    fn test_claim_without_pattern_rejected() {
        let mut game = active_game(&[]);
        assert!(matches!(
            game.claim_bingo(&pid("host")),
            Err(RoomError::NoWinningPattern)
        ));
        assert_eq!(game.phase(), GamePhase::Active);
    }

    #[test]
    fn test_claim_pauses_and_notifies_host() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));

        let out = game.claim_bingo(&pid("a")).unwrap();

        assert_eq!(game.phase(), GamePhase::ClaimPending);
        assert!(matches!(out[0].1, ServerEvent::BingoClaimed { marked_count: 5, .. }));
        assert!(matches!(
            &out[1],
            (Recipient::Host, ServerEvent::ClaimUnderReview { queued: 0, .. })
        ));
        assert!(game.call_next_number().is_empty(), "no calls while reviewing");
    }

    #[test]
    fn test_claim_twice_returns_already_claimed() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();
        assert!(matches!(
            game.claim_bingo(&pid("a")),
            Err(RoomError::AlreadyClaimed)
        ));
    }

    #[test]
    fn test_reject_first_claim_presents_second() {
        let mut game = active_game(&["a", "b"]);
        complete_top_row(&mut game, &pid("a"));
        complete_top_row(&mut game, &pid("b"));
        game.claim_bingo(&pid("a")).unwrap();
        let out = game.claim_bingo(&pid("b")).unwrap();
        assert!(
            !out.iter().any(|(r, _)| *r == Recipient::Host),
            "second claim waits behind the first"
        );

        let out = game.verify_claim(&pid("host"), &pid("a"), false).unwrap();

        assert!(out.iter().any(|(_, e)| matches!(
            e,
            ServerEvent::BingoVerified { is_valid: false, player_id, .. } if player_id == &pid("a")
        )));
        assert!(out.iter().any(|(r, e)| *r == Recipient::Host
            && matches!(e, ServerEvent::ClaimUnderReview { player_id, .. } if player_id == &pid("b"))));
        assert_eq!(game.phase(), GamePhase::ClaimPending);
    }

    #[test]
    fn test_reject_only_claim_resumes_and_allows_reclaim() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();

        game.verify_claim(&pid("host"), &pid("a"), false).unwrap();

        assert_eq!(game.phase(), GamePhase::Active);
        game.claim_bingo(&pid("a")).expect("a rejected claimant may claim again");
    }

    #[test]
    fn test_accept_valid_claim_ends_game_with_winner() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();

        let out = game.verify_claim(&pid("host"), &pid("a"), true).unwrap();

        assert_eq!(game.phase(), GamePhase::Ended);
        let ServerEvent::BingoVerified {
            is_valid: true,
            winner: Some(winner),
            ..
        } = &out[0].1
        else {
            panic!("expected a verified winner, got {out:?}");
        };
        assert_eq!(winner.id, pid("a"));
        assert!(winner
            .winning_pattern
            .iter()
            .any(|w| w.pattern == Pattern::Row(0)));
        assert_eq!(game.claims().count(), 0);
    }

    #[test]
    fn test_verify_by_non_host_returns_not_host() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();
        assert!(matches!(
            game.verify_claim(&pid("a"), &pid("a"), true),
            Err(RoomError::NotHost)
        ));
    }

    #[test]
    fn test_verify_without_claim_returns_no_pending_claim() {
        let mut game = active_game(&["a"]);
        assert!(matches!(
            game.verify_claim(&pid("host"), &pid("a"), true),
            Err(RoomError::NoPendingClaim(_))
        ));
    }

    #[test]
    fn test_host_rejecting_valid_claim_gets_warning() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.claim_bingo(&pid("a")).unwrap();

        let out = game.verify_claim(&pid("host"), &pid("a"), false).unwrap();

        assert!(matches!(
            &out[0],
            (Recipient::Host, ServerEvent::VerificationWarning { .. })
        ));
        assert_ne!(game.phase(), GamePhase::Ended);
    }

    // =====================================================================
    // end_game() / new_round()
    // =====================================================================

    #[test]
    fn test_end_game_by_host_broadcasts_game_over() {
        let mut game = active_game(&[]);
        game.call_next_number();
        let out = game.end_game(&pid("host")).unwrap();
        assert!(matches!(
            &out[0].1,
            ServerEvent::GameOver { reason: GameOverReason::EndedByHost, total_called: 1, .. }
        ));
        assert_eq!(game.phase(), GamePhase::Ended);
    }

    #[test]
    fn test_end_game_in_lobby_returns_invalid_state() {
        let mut game = new_game();
        assert!(matches!(
            game.end_game(&pid("host")),
            Err(RoomError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_new_round_resets_to_lobby() {
        let mut game = active_game(&["a"]);
        complete_top_row(&mut game, &pid("a"));
        game.end_game(&pid("host")).unwrap();

        let out = game.new_round(&pid("host")).unwrap();

        assert_eq!(game.phase(), GamePhase::Lobby);
        assert!(game.called_numbers().is_empty());
        assert!(game.pool().is_empty());
        let a = game.player(&pid("a")).unwrap();
        assert_eq!(a.card_index(), None);
        assert_eq!(a.marked_count(), 0);
        assert!(matches!(&out[0].1, ServerEvent::RoundReset { players } if players.len() == 2));

        game.start_card_selection(&pid("host")).expect("next round can begin");
    }

    // =====================================================================
    // send_chat()
    // =====================================================================

    #[test]
    fn test_send_chat_broadcasts_trimmed_message() {
        let game = game_with(&["a"]);

        let out = game.send_chat(&pid("a"), "  good luck  ").unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, Recipient::All);
        assert!(matches!(
            &out[0].1,
            ServerEvent::ChatMessage { player_id, player_name, message, .. }
                if player_id == &pid("a") && player_name == "a" && message == "good luck"
        ));
    }

    #[test]
    fn test_send_chat_allowed_while_calling() {
        let game = active_game(&["a"]);
        assert!(game.send_chat(&pid("host"), "go").is_ok());
    }

    #[test]
    fn test_send_chat_blank_message_rejected() {
        let game = new_game();
        assert!(matches!(
            game.send_chat(&pid("host"), "   "),
            Err(RoomError::EmptyChat)
        ));
    }

    #[test]
    fn test_send_chat_over_limit_rejected() {
        let game = new_game();
        let exact = "x".repeat(MAX_CHAT_LEN);
        let long = "x".repeat(MAX_CHAT_LEN + 1);

        assert!(game.send_chat(&pid("host"), &exact).is_ok());
        assert!(matches!(
            game.send_chat(&pid("host"), &long),
            Err(RoomError::ChatTooLong(MAX_CHAT_LEN))
        ));
    }

    #[test]
    fn test_send_chat_from_stranger_rejected() {
        let game = new_game();
        assert!(matches!(
            game.send_chat(&pid("ghost"), "hi"),
            Err(RoomError::NotInRoom(_))
        ));
    }
}
