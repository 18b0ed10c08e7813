//! Session-level failures.

use conquest_protocol::PlayerId;

/// Errors raised while authenticating or tracking sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The handshake token was missing or rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The identity already has a live connection.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),

    #[error("session not found for player {0}")]
    NotFound(PlayerId),
}
