//! Session record and timing configuration.

use std::time::{Duration, Instant};

use conquest_transport::ConnectionId;

use crate::UserProfile;

/// Connection timing rules.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a new connection has to send `hello`.
    pub handshake_timeout: Duration,
    /// A connection that sends nothing (not even `ping`) for this long is
    /// dropped and its player leaves their room.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// One authenticated player on one live connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile: UserProfile,
    pub connection: ConnectionId,
    pub connected_at: Instant,
}
