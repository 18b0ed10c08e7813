//! Room actor: one Tokio task per room, owning all of its state.
//!
//! Nothing outside the actor touches a room's players or game. Callers hold
//! a cheap [`RoomHandle`] and send commands over an `mpsc` channel; every
//! command that expects an answer carries a `oneshot` reply channel.
//!
//! ```text
//!   handler ──RoomHandle──▶ mpsc ──▶ RoomActor (owns players + GameState)
//!      ▲                                │
//!      └────── oneshot reply ───────────┘
//!   members ◀── PlayerSender (unbounded) ── room:update / game:correcters
//! ```
//!
//! Commands are processed one at a time with no `.await` between checking
//! a rule and applying the change, so a room never observes a half-applied
//! command.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use conquest_protocol::{Phase, PlayerId, PlayerView, RoomCode, RoomSummary, RoomView};
use conquest_timer::{RoundExpired, RoundTimer};
use tokio::sync::{mpsc, oneshot};

use crate::question::{Dealer, QuestionBank};
use crate::{GameConfig, GameState, RoomError};

/// Member colors, assigned by join position.
pub const PALETTE: [&str; 4] = ["#e74c3c", "#3498db", "#2ecc71", "#f1c40f"];

/// What a room pushes to its members.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOutbound {
    /// The room changed.
    Update(RoomView),
    /// A round was resolved.
    Correcters {
        room: RoomCode,
        winners: Vec<PlayerId>,
        correct_index: usize,
    },
}

/// Per-member outbound queue. Unbounded so that a slow client never stalls
/// the room; the connection handler drains it.
pub type PlayerSender = mpsc::UnboundedSender<RoomOutbound>;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

pub(crate) enum RoomCommand {
    Join {
        player: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: Reply<RoomView>,
    },
    /// Replies with the number of players left.
    Leave {
        player: PlayerId,
        reply: Reply<usize>,
    },
    Start {
        player: PlayerId,
        reply: Reply<()>,
    },
    Answer {
        player: PlayerId,
        index: usize,
        reply: Reply<()>,
    },
    Resolve {
        player: PlayerId,
        reply: Reply<()>,
    },
    Claim {
        player: PlayerId,
        x: i64,
        y: i64,
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<RoomView>,
    },
    Summary {
        reply: Reply<RoomSummary>,
    },
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Sends commands to a running room.
///
/// Cloning is cheap (a channel sender). Every method fails with
/// `RoomError::Unavailable` once the actor has stopped.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Adds `player`, or refreshes their outbound queue if they are
    /// already a member. Returns the room after the join.
    pub async fn join(
        &self,
        player: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomView, RoomError> {
        self.request(|reply| RoomCommand::Join {
            player,
            name,
            sender,
            reply,
        })
        .await
    }

    /// Removes `player`; returns how many players remain. At zero the
    /// actor stops.
    pub async fn leave(&self, player: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { player, reply }).await
    }

    pub async fn start(&self, player: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { player, reply }).await
    }

    /// Succeeds outside the question phase too; the answer is then dropped.
    pub async fn answer(&self, player: PlayerId, index: usize) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Answer {
            player,
            index,
            reply,
        })
        .await
    }

    pub async fn resolve(&self, player: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Resolve { player, reply }).await
    }

    pub async fn claim(&self, player: PlayerId, x: i64, y: i64) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Claim {
            player,
            x,
            y,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<RoomView, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        self.request(|reply| RoomCommand::Summary { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

struct Member {
    id: PlayerId,
    name: String,
    color: &'static str,
}

struct RoomActor {
    code: RoomCode,
    name: String,
    host: PlayerId,
    members: Vec<Member>,
    senders: HashMap<PlayerId, PlayerSender>,
    game: GameState,
    dealer: Dealer,
    config: GameConfig,
    timer: RoundTimer,
    /// Game round the timer was last armed for.
    timed_round: u64,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.code, name = %self.name, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                expired = self.timer.wait() => self.on_round_expired(expired),
            }
            self.sync_timer();
        }

        tracing::info!(room = %self.code, "room actor stopped");
    }

    /// Applies one command. Returns `false` once the room should stop.
    fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player,
                name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player, name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player, reply } => {
                let result = self.handle_leave(player);
                let empty = matches!(result, Ok(0));
                let _ = reply.send(result);
                if empty {
                    return false;
                }
            }
            RoomCommand::Start { player, reply } => {
                let _ = reply.send(self.handle_start(player));
            }
            RoomCommand::Answer {
                player,
                index,
                reply,
            } => {
                let _ = reply.send(self.handle_answer(player, index));
            }
            RoomCommand::Resolve { player, reply } => {
                let result = self.require_member(player).and_then(|()| self.resolve_round());
                let _ = reply.send(result);
            }
            RoomCommand::Claim {
                player,
                x,
                y,
                reply,
            } => {
                let _ = reply.send(self.handle_claim(player, x, y));
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(self.view()));
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(Ok(self.summary()));
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        player: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomView, RoomError> {
        if self.senders.contains_key(&player) {
            self.senders.insert(player, sender);
            tracing::debug!(room = %self.code, %player, "member re-joined, sender refreshed");
        } else {
            if self.members.len() >= self.config.max_players {
                return Err(RoomError::RoomFull(self.code.clone()));
            }
            let color = PALETTE[self.members.len() % PALETTE.len()];
            self.members.push(Member {
                id: player,
                name,
                color,
            });
            self.senders.insert(player, sender);
            tracing::info!(
                room = %self.code,
                %player,
                players = self.members.len(),
                "player joined"
            );
        }
        self.broadcast_update();
        Ok(self.view())
    }

    fn handle_leave(&mut self, player: PlayerId) -> Result<usize, RoomError> {
        let position = self
            .members
            .iter()
            .position(|m| m.id == player)
            .ok_or_else(|| RoomError::NotInRoom(player, self.code.clone()))?;
        self.members.remove(position);
        self.senders.remove(&player);
        let remaining = self.members.len();
        self.game.remove_player(player, position, remaining);

        tracing::info!(room = %self.code, %player, players = remaining, "player left");

        if remaining == 0 {
            return Ok(0);
        }
        if player == self.host {
            self.host = self.members[0].id;
            tracing::info!(room = %self.code, host = %self.host, "host migrated");
        }
        self.broadcast_update();
        Ok(remaining)
    }

    fn handle_start(&mut self, player: PlayerId) -> Result<(), RoomError> {
        self.require_member(player)?;
        if player != self.host {
            return Err(RoomError::Forbidden("only the host can start the game"));
        }
        if self.members.len() < self.config.min_players {
            return Err(RoomError::NotEnoughPlayers {
                needed: self.config.min_players,
                have: self.members.len(),
            });
        }
        self.game.start(&mut self.dealer, now_ms())?;
        tracing::info!(room = %self.code, players = self.members.len(), "game started");
        self.broadcast_update();
        Ok(())
    }

    fn handle_answer(&mut self, player: PlayerId, index: usize) -> Result<(), RoomError> {
        self.require_member(player)?;
        if self.game.submit_answer(player, index, now_ms()) {
            self.broadcast_update();
        } else {
            tracing::debug!(room = %self.code, %player, phase = %self.game.phase(), "answer outside question phase dropped");
        }
        Ok(())
    }

    fn handle_claim(&mut self, player: PlayerId, x: i64, y: i64) -> Result<(), RoomError> {
        self.require_member(player)?;
        let seats = self.seats();
        let outcome = self
            .game
            .claim(player, x, y, &seats, &mut self.dealer, now_ms())?;
        tracing::debug!(room = %self.code, %player, x, y, strength = outcome.cell.strength, "cell claimed");
        if outcome.finished {
            tracing::info!(room = %self.code, "board full, game over");
        }
        self.broadcast_update();
        Ok(())
    }

    /// Resolves the open round and tells everyone who got it right.
    fn resolve_round(&mut self) -> Result<(), RoomError> {
        let seats = self.seats();
        let outcome = self.game.resolve(&seats, &mut self.dealer, now_ms())?;
        tracing::info!(
            room = %self.code,
            correct = outcome.winners.len(),
            next = %self.game.phase(),
            "round resolved"
        );
        self.broadcast(RoomOutbound::Correcters {
            room: self.code.clone(),
            winners: outcome.winners,
            correct_index: outcome.correct_index,
        });
        self.broadcast_update();
        Ok(())
    }

    fn on_round_expired(&mut self, expired: RoundExpired) {
        tracing::debug!(room = %self.code, round = expired.round, "round deadline passed");
        if let Err(e) = self.resolve_round() {
            tracing::warn!(room = %self.code, error = %e, "auto-resolve failed");
        }
    }

    /// Keeps the deadline timer in step with the game when rounds are
    /// server-timed: armed once per question round, disarmed otherwise.
    fn sync_timer(&mut self) {
        if !self.config.auto_resolve {
            return;
        }
        if self.game.phase() == Phase::Question {
            if self.timed_round != self.game.round() {
                self.timer.arm(self.config.round_duration);
                self.timed_round = self.game.round();
            }
        } else {
            self.timer.disarm();
        }
    }

    fn require_member(&self, player: PlayerId) -> Result<(), RoomError> {
        if self.senders.contains_key(&player) {
            Ok(())
        } else {
            Err(RoomError::NotInRoom(player, self.code.clone()))
        }
    }

    fn seats(&self) -> Vec<PlayerId> {
        self.members.iter().map(|m| m.id).collect()
    }

    fn view(&self) -> RoomView {
        RoomView {
            id: self.code.clone(),
            name: self.name.clone(),
            host_id: self.host,
            players: self
                .members
                .iter()
                .map(|m| PlayerView {
                    id: m.id,
                    name: m.name.clone(),
                    color: m.color.to_owned(),
                })
                .collect(),
            state: self.game.view(&self.seats()),
        }
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.code.clone(),
            name: self.name.clone(),
            player_count: self.members.len(),
            phase: self.game.phase(),
        }
    }

    fn broadcast_update(&self) {
        self.broadcast(RoomOutbound::Update(self.view()));
    }

    fn broadcast(&self, msg: RoomOutbound) {
        for sender in self.senders.values() {
            // a closed queue means the member's connection is going away;
            // its leave is already on the way
            let _ = sender.send(msg.clone());
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Spawns an empty room. The registry joins the host right after.
pub(crate) fn spawn_room(
    code: RoomCode,
    name: String,
    host: PlayerId,
    config: GameConfig,
    bank: Arc<QuestionBank>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        code: code.clone(),
        name,
        host,
        members: Vec::new(),
        senders: HashMap::new(),
        game: GameState::new(config.grid_size, config.round_duration),
        dealer: Dealer::new(bank, config.seed),
        config,
        timer: RoundTimer::new(),
        timed_round: 0,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
