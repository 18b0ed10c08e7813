//! Wire protocol for the Conquest room server.
//!
//! - [`types`]: identities plus the [`ClientFrame`] / [`ServerMessage`]
//!   envelopes.
//! - [`view`]: sanitized snapshots of a room ([`RoomView`]) and the
//!   [`Phase`] state machine's transition table.
//! - [`codec`]: the [`Codec`] trait and [`JsonCodec`].
//!
//! # Feature Flags
//!
//! - `json` (default): enables [`JsonCodec`] via `serde_json`

mod codec;
mod error;
pub mod types;
pub mod view;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientFrame, Command, CommandTag, FrameHeader, PROTOCOL_VERSION, PlayerId, RoomCode,
    ServerMessage,
};
pub use view::{
    AnswerView, Cell, GameView, Phase, PlayerView, QuestionView, RoomSummary, RoomView,
};
