//! Error types for the room layer.
//!
//! Every variant is a rejected command. The server reports it in the
//! command's ack; none of them close a connection.

use conquest_protocol::{Phase, PlayerId, RoomCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The caller is a member but may not do this right now (not the host,
    /// not their turn).
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("expected phase {expected}, room is in {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },

    #[error("cell ({x}, {y}) is outside the {size}x{size} board")]
    OutOfBounds { x: i64, y: i64, size: usize },

    #[error("need at least {needed} players, room has {have}")]
    NotEnoughPlayers { needed: usize, have: usize },

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("player {0} is not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// Every generated code collided with a live room.
    #[error("no free room code available")]
    NoFreeCode,

    /// The room's actor stopped or its queue is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
