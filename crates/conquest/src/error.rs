//! Unified error type for the Conquest server.

use conquest_protocol::ProtocolError;
use conquest_room::{QuestionBankError, RoomError};
use conquest_session::SessionError;
use conquest_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Each variant converts from its sub-crate error with `?`, so the handler
/// and the binary only ever deal with this one type.
#[derive(Debug, thiserror::Error)]
pub enum ConquestError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Frame encoding or decoding failure, or a handshake violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Authentication or duplicate-session failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    /// The question file given at startup could not be used.
    #[error(transparent)]
    QuestionBank(#[from] QuestionBankError),
}
