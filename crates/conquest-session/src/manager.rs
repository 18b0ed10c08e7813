//! Tracks which players are connected, and on which connection.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Instant;

use conquest_protocol::PlayerId;
use conquest_transport::ConnectionId;

use crate::{Session, SessionConfig, SessionError, UserProfile};

/// Identity-keyed session table.
///
/// At most one live session per [`PlayerId`]. There is no grace period:
/// when a connection ends its session is removed and the player has left.
/// The manager lives inside the server state, behind the server's lock.
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Registers `profile` as connected on `connection`.
    ///
    /// # Errors
    /// `SessionError::AlreadyConnected` if the player already holds a live
    /// session. The existing session is left untouched.
    pub fn create(
        &mut self,
        profile: UserProfile,
        connection: ConnectionId,
    ) -> Result<&Session, SessionError> {
        let player_id = profile.id;
        match self.sessions.entry(player_id) {
            Entry::Occupied(_) => Err(SessionError::AlreadyConnected(player_id)),
            Entry::Vacant(slot) => {
                tracing::info!(%player_id, %connection, name = %profile.name, "session created");
                Ok(slot.insert(Session {
                    profile,
                    connection,
                    connected_at: Instant::now(),
                }))
            }
        }
    }

    /// Removes the player's session, but only if it still belongs to
    /// `connection`.
    ///
    /// Cleanup for an old connection can run after a new one for the same
    /// player was admitted; the check keeps that late cleanup from evicting
    /// the live session.
    ///
    /// # Errors
    /// `SessionError::NotFound` if the player has no session on
    /// `connection`.
    pub fn remove_if_connection(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> Result<Session, SessionError> {
        match self.sessions.entry(player_id) {
            Entry::Occupied(slot) if slot.get().connection == connection => {
                let session = slot.remove();
                tracing::info!(
                    %player_id,
                    %connection,
                    connected_for = ?session.connected_at.elapsed(),
                    "session removed"
                );
                Ok(session)
            }
            _ => Err(SessionError::NotFound(player_id)),
        }
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    pub fn is_connected(&self, player_id: &PlayerId) -> bool {
        self.sessions.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
