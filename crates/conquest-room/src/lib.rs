//! The Conquest room engine.
//!
//! Each room runs as an isolated Tokio task (actor) that owns its players
//! and its [`GameState`]. The [`RoomRegistry`] creates rooms, keeps the
//! player → room index, and closes rooms when the last player leaves.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: create / join / leave, room lookup
//! - [`RoomHandle`]: send game commands to a running room
//! - [`GameState`]: the phase machine (`lobby → question → resolve →
//!   claim → … → end`), pure and synchronous
//! - [`BoardGrid`]: square board and the claim rules
//! - [`AnswerArbiter`]: per-round answers and winner ordering
//! - [`QuestionBank`] / [`Dealer`]: where questions come from
//! - [`GameConfig`]: board size, round length, player limits

mod arbiter;
mod board;
mod config;
mod error;
mod game;
pub mod question;
mod registry;
mod room;

pub use arbiter::AnswerArbiter;
pub use board::BoardGrid;
pub use config::GameConfig;
pub use error::RoomError;
pub use game::{ClaimOutcome, GameState, RoundOutcome};
pub use question::{Dealer, Question, QuestionBank, QuestionBankError, QuestionSource};
pub use registry::RoomRegistry;
pub use room::{PALETTE, PlayerSender, RoomHandle, RoomOutbound};
