//! Per-room game settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings every room is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Side length of the square board.
    pub grid_size: usize,

    /// Time a question round stays open.
    pub round_duration: Duration,

    /// Players needed before the host may start.
    pub min_players: usize,

    /// Joins beyond this are rejected with `RoomFull`.
    pub max_players: usize,

    /// Resolve rounds automatically when the deadline passes. When off,
    /// the deadline is only advertised to clients and a round stays open
    /// until some member resolves it.
    pub auto_resolve: bool,

    /// Seed for question draws. `None` seeds each room from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 5,
            round_duration: Duration::from_secs(15),
            min_players: 2,
            max_players: 8,
            auto_resolve: false,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Largest board the server will create.
    pub const MAX_GRID_SIZE: usize = 16;

    /// Fewest players a game can start with.
    pub const MIN_PLAYERS: usize = 2;

    /// Clamps out-of-range values, logging each adjustment.
    pub fn validated(mut self) -> Self {
        if self.grid_size == 0 || self.grid_size > Self::MAX_GRID_SIZE {
            let clamped = self.grid_size.clamp(1, Self::MAX_GRID_SIZE);
            warn!(grid_size = self.grid_size, clamped, "grid_size out of range, clamping");
            self.grid_size = clamped;
        }
        if self.min_players < Self::MIN_PLAYERS {
            warn!(
                min_players = self.min_players,
                "a game needs at least {} players, raising",
                Self::MIN_PLAYERS
            );
            self.min_players = Self::MIN_PLAYERS;
        }
        if self.max_players < self.min_players {
            warn!(
                max = self.max_players,
                min = self.min_players,
                "max_players below min_players, raising"
            );
            self.max_players = self.min_players;
        }
        if self.round_duration.is_zero() {
            warn!("round_duration is zero, using 1s");
            self.round_duration = Duration::from_secs(1);
        }
        self
    }
}
