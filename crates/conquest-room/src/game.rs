//! The game state machine: question rounds, arbitration, and claims.
//!
//! [`GameState`] is plain data with synchronous methods. It knows nothing
//! about channels or the clock: callers pass the current time (epoch ms)
//! and the room's player order in. That keeps every rule testable without
//! a runtime; the room actor is the only thing that drives it live.

use std::collections::BTreeMap;
use std::time::Duration;

use conquest_protocol::{Cell, GameView, Phase, PlayerId};

use crate::question::{Question, QuestionSource};
use crate::{AnswerArbiter, BoardGrid, RoomError};

/// Result of resolving a question round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Correct players, earliest answer first.
    pub winners: Vec<PlayerId>,
    pub correct_index: usize,
}

/// Result of a successful claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub cell: Cell,
    /// The board filled up and the game is over.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct GameState {
    phase: Phase,
    board: BoardGrid,
    turn_index: usize,
    question: Option<Question>,
    deadline: Option<u64>,
    arbiter: AnswerArbiter,
    claimed: BTreeMap<PlayerId, u32>,
    round_duration: Duration,
    /// Question rounds opened since creation.
    round: u64,
}

impl GameState {
    /// A fresh game in the lobby.
    pub fn new(grid_size: usize, round_duration: Duration) -> Self {
        Self {
            phase: Phase::Lobby,
            board: BoardGrid::new(grid_size),
            turn_index: 0,
            question: None,
            deadline: None,
            arbiter: AnswerArbiter::new(),
            claimed: BTreeMap::new(),
            round_duration,
            round: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn board(&self) -> &BoardGrid {
        &self.board
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    /// The player whose turn it is, if anyone is seated.
    pub fn turn_player(&self, players: &[PlayerId]) -> Option<PlayerId> {
        if players.is_empty() {
            return None;
        }
        Some(players[self.turn_index % players.len()])
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn claimed(&self, player: PlayerId) -> u32 {
        self.claimed.get(&player).copied().unwrap_or(0)
    }

    pub fn answers(&self) -> &AnswerArbiter {
        &self.arbiter
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Starts (or restarts) a game: fresh board, scores, and turn order,
    /// then opens the first question.
    ///
    /// Who may start and with how many players is the room's business;
    /// this only checks the phase.
    ///
    /// # Errors
    /// `InvalidPhase` unless the game is in the lobby or over.
    pub fn start<S>(&mut self, source: &mut S, now: u64) -> Result<(), RoomError>
    where
        S: QuestionSource + ?Sized,
    {
        if !self.phase.can_start() {
            return Err(self.wrong_phase(Phase::Lobby));
        }
        self.board = BoardGrid::new(self.board.size());
        self.turn_index = 0;
        self.claimed.clear();
        self.open_round(source, now);
        Ok(())
    }

    /// Records an answer.
    ///
    /// Returns `false` (and records nothing) outside the question phase;
    /// the caller still acknowledges the command.
    pub fn submit_answer(&mut self, player: PlayerId, index: usize, now: u64) -> bool {
        if self.phase != Phase::Question {
            return false;
        }
        self.arbiter.submit(player, index, now);
        true
    }

    /// Closes the open question.
    ///
    /// With at least one correct answer among current `players`, the
    /// earliest of them gets the turn and the game moves to `claim`.
    /// Otherwise a new question opens and the turn stays where it was.
    ///
    /// # Errors
    /// `InvalidPhase` outside the question phase.
    pub fn resolve<S>(
        &mut self,
        players: &[PlayerId],
        source: &mut S,
        now: u64,
    ) -> Result<RoundOutcome, RoomError>
    where
        S: QuestionSource + ?Sized,
    {
        if self.phase != Phase::Question {
            return Err(self.wrong_phase(Phase::Question));
        }
        let Some(question) = self.question.take() else {
            return Err(self.wrong_phase(Phase::Question));
        };
        self.transition(Phase::Resolve);

        let winners: Vec<PlayerId> = self
            .arbiter
            .resolve_round(question.correct)
            .into_iter()
            .filter(|p| players.contains(p))
            .collect();

        match winners.first().and_then(|w| players.iter().position(|p| p == w)) {
            Some(position) => {
                self.turn_index = position;
                self.deadline = None;
                self.transition(Phase::Claim);
            }
            None => self.open_round(source, now),
        }

        Ok(RoundOutcome {
            winners,
            correct_index: question.correct,
        })
    }

    /// Claims a cell for the player holding the turn.
    ///
    /// Checked in order: phase, turn, bounds. After a successful claim the
    /// game ends if every cell is owned; otherwise the turn passes to the
    /// next seat and a new question opens.
    ///
    /// # Errors
    /// `InvalidPhase`, `Forbidden` (not this player's turn), or
    /// `OutOfBounds`. No state changes on error.
    pub fn claim<S>(
        &mut self,
        player: PlayerId,
        x: i64,
        y: i64,
        players: &[PlayerId],
        source: &mut S,
        now: u64,
    ) -> Result<ClaimOutcome, RoomError>
    where
        S: QuestionSource + ?Sized,
    {
        if self.phase != Phase::Claim {
            return Err(self.wrong_phase(Phase::Claim));
        }
        if self.turn_player(players) != Some(player) {
            return Err(RoomError::Forbidden("not your turn"));
        }

        let cell = self.board.claim(player, x, y)?;
        *self.claimed.entry(player).or_default() += 1;

        let finished = self.board.is_full();
        if finished {
            self.question = None;
            self.deadline = None;
            self.transition(Phase::End);
        } else {
            self.turn_index = (self.turn_index + 1) % players.len();
            self.open_round(source, now);
        }
        Ok(ClaimOutcome { cell, finished })
    }

    /// Forgets a departing player's answer and keeps the turn on the same
    /// person when someone seated before them leaves.
    ///
    /// `position` is the seat the player occupied; `remaining` is the seat
    /// count after removal.
    pub fn remove_player(&mut self, player: PlayerId, position: usize, remaining: usize) {
        self.arbiter.withdraw(player);
        if remaining == 0 {
            self.turn_index = 0;
            return;
        }
        if position < self.turn_index {
            self.turn_index -= 1;
        }
        self.turn_index %= remaining;
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Snapshot for clients. The open question comes without its answer,
    /// and players' picks stay hidden until the round is resolved.
    pub fn view(&self, players: &[PlayerId]) -> GameView {
        GameView {
            phase: self.phase,
            size: self.board.size(),
            grid: self.board.rows(),
            turn_index: self.turn_index,
            turn_player: self.turn_player(players),
            question: self.question.as_ref().map(Question::view),
            deadline: self.deadline,
            answers: self.arbiter.views(self.phase != Phase::Question),
            claimed: self.claimed.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn open_round<S>(&mut self, source: &mut S, now: u64)
    where
        S: QuestionSource + ?Sized,
    {
        self.question = Some(source.next_question());
        let duration = u64::try_from(self.round_duration.as_millis()).unwrap_or(u64::MAX);
        self.deadline = Some(now.saturating_add(duration));
        self.arbiter.clear();
        self.round += 1;
        self.transition(Phase::Question);
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase change {} -> {}",
            self.phase,
            next
        );
        tracing::trace!(from = %self.phase, to = %next, "phase change");
        self.phase = next;
    }

    fn wrong_phase(&self, expected: Phase) -> RoomError {
        RoomError::InvalidPhase {
            expected,
            actual: self.phase,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
