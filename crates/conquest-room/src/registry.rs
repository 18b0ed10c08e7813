//! Creates rooms, routes players to them, and tears empty rooms down.

use std::collections::HashMap;
use std::sync::Arc;

use conquest_protocol::{PlayerId, RoomCode, RoomSummary, RoomView};
use rand::Rng;

use crate::question::QuestionBank;
use crate::room::spawn_room;
use crate::{GameConfig, PlayerSender, RoomError, RoomHandle};

const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Attempts at drawing an unused code before giving up.
const CODE_ATTEMPTS: usize = 64;

const MAX_ROOM_NAME: usize = 40;

/// Every live room plus the player → room index.
///
/// A player is in at most one room: creating or joining another room makes
/// them leave the current one. The registry only holds handles; room state
/// lives in the actors. The server keeps it behind a `tokio::sync::Mutex`,
/// and callers that only need one room clone its handle via [`room`] and
/// release the lock before awaiting.
///
/// [`room`]: RoomRegistry::room
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomCode>,
    config: GameConfig,
    bank: Arc<QuestionBank>,
}

impl RoomRegistry {
    pub fn new(config: GameConfig, bank: Arc<QuestionBank>) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            config: config.validated(),
            bank,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Opens a room with `host` as its only player.
    ///
    /// A blank `name` becomes "`<host_name>`'s room".
    pub async fn create_room(
        &mut self,
        host: PlayerId,
        host_name: &str,
        name: &str,
        sender: PlayerSender,
    ) -> Result<RoomView, RoomError> {
        self.leave_room(host).await?;

        let code = self.generate_unique_code()?;
        let name = room_name(name, host_name);
        let handle = spawn_room(
            code.clone(),
            name,
            host,
            self.config.clone(),
            Arc::clone(&self.bank),
            DEFAULT_CHANNEL_SIZE,
        );
        let view = handle.join(host, host_name.to_owned(), sender).await?;

        self.rooms.insert(code.clone(), handle);
        self.player_rooms.insert(host, code.clone());
        tracing::info!(room = %code, %host, rooms = self.rooms.len(), "room created");
        Ok(view)
    }

    /// Puts `player` into the room named by `code`.
    ///
    /// Re-joining the current room only refreshes the outbound queue. When
    /// the player sits in a different room they leave it once the new room
    /// has accepted them, so a failed join leaves them where they were.
    pub async fn join_room(
        &mut self,
        player: PlayerId,
        name: &str,
        code: &RoomCode,
        sender: PlayerSender,
    ) -> Result<RoomView, RoomError> {
        let handle = self.room(code)?;
        let view = handle.join(player, name.to_owned(), sender).await?;

        if let Some(previous) = self.player_rooms.insert(player, code.clone()) {
            if previous != *code {
                self.leave_specific(player, &previous).await;
            }
        }
        Ok(view)
    }

    /// Takes `player` out of their room, closing it if they were the last
    /// one. Not being in a room is fine.
    pub async fn leave_room(&mut self, player: PlayerId) -> Result<(), RoomError> {
        let Some(code) = self.player_rooms.remove(&player) else {
            return Ok(());
        };
        self.leave_specific(player, &code).await;
        Ok(())
    }

    /// Handle for game commands on `code`.
    pub fn room(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    pub fn player_room(&self, player: &PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(player)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Summaries of every live room, ordered by code.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(summary) = handle.summary().await {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    async fn leave_specific(&mut self, player: PlayerId, code: &RoomCode) {
        let Some(handle) = self.rooms.get(code).cloned() else {
            return;
        };
        match handle.leave(player).await {
            Ok(0) => self.close(code, "last player left"),
            Ok(_) => {}
            Err(RoomError::Unavailable(_)) => self.close(code, "actor gone"),
            Err(e) => {
                tracing::warn!(room = %code, %player, error = %e, "leave rejected by room");
            }
        }
    }

    fn close(&mut self, code: &RoomCode, reason: &'static str) {
        if self.rooms.remove(code).is_some() {
            self.player_rooms.retain(|_, c| c != code);
            tracing::info!(room = %code, reason, rooms = self.rooms.len(), "room closed");
        }
    }

    fn generate_unique_code(&self) -> Result<RoomCode, RoomError> {
        let mut rng = rand::rng();
        for _ in 0..CODE_ATTEMPTS {
            let code = RoomCode::generate(|n| rng.random_range(0..n));
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(RoomError::NoFreeCode)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(GameConfig::default(), Arc::new(QuestionBank::builtin()))
    }
}

fn room_name(requested: &str, host_name: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        format!("{host_name}'s room")
    } else {
        trimmed.chars().take(MAX_ROOM_NAME).collect()
    }
}
