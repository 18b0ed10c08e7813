//! # Conquest
//!
//! Multiplayer trivia-conquest room server.
//!
//! Players connect over WebSocket, create or join rooms by a short code,
//! answer timed multiple-choice questions, and the fastest correct player
//! claims a cell on the room's board. The game ends when every cell is
//! owned.
//!
//! The crates underneath are re-exported through [`prelude`]:
//!
//! - `conquest-transport`: WebSocket connections
//! - `conquest-protocol`: wire messages, room views, `JsonCodec`
//! - `conquest-session`: authentication and live sessions
//! - `conquest-room`: room actors, registry, game rules, questions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conquest::prelude::*;
//!
//! # async fn run() -> Result<(), ConquestError> {
//! let server = ConquestServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(DevTokenAuthenticator)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
pub mod logging;
mod server;

pub use config::{Args, ServerConfig};
pub use error::ConquestError;
pub use server::{ConquestServer, ConquestServerBuilder};

pub mod prelude {
    pub use crate::{ConquestError, ConquestServer, ConquestServerBuilder, ServerConfig};
    pub use conquest_protocol::{
        ClientFrame, Command, GameView, PROTOCOL_VERSION, Phase, PlayerId, RoomCode,
        RoomSummary, RoomView, ServerMessage,
    };
    pub use conquest_room::{GameConfig, Question, QuestionBank};
    pub use conquest_session::{
        Authenticator, DevTokenAuthenticator, SessionConfig, SessionError, UserProfile,
    };
}
