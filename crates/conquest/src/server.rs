//! `ConquestServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → session → rooms.

use std::sync::Arc;

use conquest_protocol::{Codec, JsonCodec};
use conquest_room::{GameConfig, QuestionBank, RoomRegistry};
use conquest_session::{Authenticator, SessionConfig, SessionManager};
use conquest_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::ConquestError;
use crate::handler::handle_connection;

/// State shared by every connection task.
///
/// Owned by the server and handed to handlers behind an `Arc`; there are
/// no process-wide globals.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) auth: A,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Conquest server.
///
/// # Example
///
/// ```rust,no_run
/// use conquest::prelude::*;
///
/// # async fn run() -> Result<(), ConquestError> {
/// let server = ConquestServer::builder()
///     .bind("0.0.0.0:8080")
///     .game_config(GameConfig { grid_size: 6, ..GameConfig::default() })
///     .build(DevTokenAuthenticator)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ConquestServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    game_config: GameConfig,
    question_bank: Option<Arc<QuestionBank>>,
}

impl ConquestServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            game_config: GameConfig::default(),
            question_bank: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Settings every new room is created with.
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game_config = config;
        self
    }

    /// Questions to draw from. Defaults to [`QuestionBank::builtin`].
    pub fn question_bank(mut self, bank: Arc<QuestionBank>) -> Self {
        self.question_bank = Some(bank);
        self
    }

    /// Binds the listener and builds the server with the given
    /// authenticator, using `JsonCodec` over WebSocket.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<ConquestServer<A, JsonCodec>, ConquestError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let bank = self
            .question_bank
            .unwrap_or_else(|| Arc::new(QuestionBank::builtin()));

        tracing::debug!(
            config = ?self.game_config,
            questions = bank.len(),
            "server configured"
        );

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms: Mutex::new(RoomRegistry::new(self.game_config, bank)),
            auth,
            codec: JsonCodec,
        });

        Ok(ConquestServer { transport, state })
    }
}

impl Default for ConquestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Conquest server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ConquestServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl ConquestServer<conquest_session::DevTokenAuthenticator, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ConquestServerBuilder {
        ConquestServerBuilder::new()
    }
}

impl<A, C> ConquestServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, one handler task per connection. Never
    /// returns on its own; stop it by dropping the future.
    pub async fn run(mut self) -> Result<(), ConquestError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "conquest server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
