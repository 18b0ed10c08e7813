//! Player sessions for the Conquest room server.
//!
//! A session binds a stable [`PlayerId`](conquest_protocol::PlayerId) to
//! the transport connection currently carrying it. The connection id is a
//! volatile attribute: rooms and the registry only ever see the player id.
//!
//! Tokens are checked by an [`Authenticator`]; the server is generic over
//! it so that real deployments can plug in their own identity provider.

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::{Authenticator, DevTokenAuthenticator, UserProfile};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig};
