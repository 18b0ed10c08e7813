//! Identity types and the wire messages exchanged with clients.
//!
//! Every inbound frame is a [`ClientFrame`]: a request id plus a tagged
//! [`Command`]. Every outbound frame is a [`ServerMessage`]. Field names are
//! camelCase on the wire because the clients are browsers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;
use crate::view::{RoomSummary, RoomView};

/// Protocol version clients must announce in `hello`.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Stable identity of an authenticated player.
///
/// Survives reconnects; the transport's connection id does not. Serialized
/// as a bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Short human-typable room code, e.g. `"K7QD"`.
///
/// Codes are generated from [`RoomCode::ALPHABET`], which leaves out the
/// characters people confuse when reading a code aloud (`0/O`, `1/I/L`).
/// Input is case-insensitive: `"k7qd"` and `" K7QD "` name the same room.
///
/// On the wire any string is accepted and only normalized: a code that was
/// never generated names no room, and the registry says so in the ack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Characters a generated code is drawn from.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

    /// Length of a generated code.
    pub const LEN: usize = 4;

    /// Longest input accepted by [`RoomCode::parse`].
    const MAX_INPUT: usize = 16;

    /// Builds a fresh code. `pick(n)` must return an index below `n`; the
    /// caller supplies its own randomness.
    pub fn generate(mut pick: impl FnMut(usize) -> usize) -> Self {
        let code = (0..Self::LEN)
            .map(|_| {
                let i = pick(Self::ALPHABET.len()) % Self::ALPHABET.len();
                char::from(Self::ALPHABET[i])
            })
            .collect();
        Self(code)
    }

    /// Normalizes user input into a code.
    ///
    /// Trims whitespace and uppercases. Codes that do not name a live room
    /// are still accepted here; the registry answers those with "not found".
    ///
    /// # Errors
    /// `ProtocolError::InvalidMessage` if the input is empty, too long, or
    /// not alphanumeric.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::InvalidMessage("empty room code".into()));
        }
        if trimmed.len() > Self::MAX_INPUT
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidMessage(format!(
                "malformed room code {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(value: String) -> Self {
        Self(value.trim().to_ascii_uppercase())
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// One inbound frame.
///
/// `id` correlates the command with its [`ServerMessage::Ack`]. It defaults
/// to 0 when the client leaves it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub id: u64,
    pub command: Command,
}

/// The part of a frame that is still readable when its command is not:
/// enough to reject the request in an ack instead of leaving it unanswered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameHeader {
    #[serde(default)]
    pub id: u64,
    pub command: CommandTag,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandTag {
    #[serde(rename = "type")]
    pub kind: String,
}

impl FrameHeader {
    /// True when the frame names a command that is answered with an ack.
    /// `ping` and unknown types are not.
    pub fn expects_ack(&self) -> bool {
        let kind = self.command.kind.as_str();
        kind != "ping" && Command::KINDS.contains(&kind)
    }
}

/// Everything a client can ask for.
///
/// Internally tagged: `{"type":"game:claim","roomId":"K7QD","x":1,"y":2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Command {
    /// Handshake. Must be the first frame on a connection.
    #[serde(rename = "hello")]
    Hello {
        version: u32,
        #[serde(default)]
        token: Option<String>,
    },

    #[serde(rename = "room:create")]
    CreateRoom { name: String },

    #[serde(rename = "room:join")]
    JoinRoom { room_code: RoomCode },

    #[serde(rename = "room:leave")]
    LeaveRoom,

    /// Lists open rooms (code, name, head count, phase).
    #[serde(rename = "room:list")]
    ListRooms,

    #[serde(rename = "game:start")]
    StartGame { room_id: RoomCode },

    #[serde(rename = "game:answer")]
    SubmitAnswer { room_id: RoomCode, answer_index: usize },

    #[serde(rename = "game:resolve")]
    ResolveRound { room_id: RoomCode },

    /// Coordinates are signed so that negative input reaches the board and
    /// comes back as an out-of-bounds ack instead of a decode error.
    #[serde(rename = "game:claim")]
    Claim { room_id: RoomCode, x: i64, y: i64 },

    /// Keep-alive. Answered with [`ServerMessage::Pong`], not an ack.
    #[serde(rename = "ping")]
    Ping {
        #[serde(default)]
        client_time: u64,
    },
}

impl Command {
    /// Every wire tag, in declaration order.
    pub const KINDS: [&'static str; 10] = [
        "hello",
        "room:create",
        "room:join",
        "room:leave",
        "room:list",
        "game:start",
        "game:answer",
        "game:resolve",
        "game:claim",
        "ping",
    ];

    /// Wire name of the command, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::CreateRoom { .. } => "room:create",
            Self::JoinRoom { .. } => "room:join",
            Self::LeaveRoom => "room:leave",
            Self::ListRooms => "room:list",
            Self::StartGame { .. } => "game:start",
            Self::SubmitAnswer { .. } => "game:answer",
            Self::ResolveRound { .. } => "game:resolve",
            Self::Claim { .. } => "game:claim",
            Self::Ping { .. } => "ping",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Handshake accepted.
    #[serde(rename = "welcome")]
    Welcome { player_id: PlayerId, server_time: u64 },

    /// Reply to exactly one command, matched by `id`.
    #[serde(rename = "ack")]
    Ack {
        id: u64,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<RoomView>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rooms: Option<Vec<RoomSummary>>,
    },

    /// The room changed; carries the full sanitized state.
    #[serde(rename = "room:update")]
    RoomUpdate { room: RoomView },

    /// Outcome of a resolve: who answered correctly (earliest first) and
    /// which option was right.
    #[serde(rename = "game:correcters")]
    Correcters {
        room_id: RoomCode,
        user_ids: Vec<PlayerId>,
        correct_index: usize,
    },

    #[serde(rename = "pong")]
    Pong { client_time: u64, server_time: u64 },

    /// Connection-level failure (handshake, malformed frame). Game errors
    /// travel in acks instead.
    #[serde(rename = "error")]
    Error { code: u16, message: String },
}

impl ServerMessage {
    /// `{ok:true}`.
    pub fn ack_ok(id: u64) -> Self {
        Self::Ack {
            id,
            ok: true,
            error: None,
            room: None,
            rooms: None,
        }
    }

    /// `{ok:true, room}`.
    pub fn ack_room(id: u64, room: RoomView) -> Self {
        Self::Ack {
            id,
            ok: true,
            error: None,
            room: Some(room),
            rooms: None,
        }
    }

    /// `{ok:true, rooms}`.
    pub fn ack_rooms(id: u64, rooms: Vec<RoomSummary>) -> Self {
        Self::Ack {
            id,
            ok: true,
            error: None,
            room: None,
            rooms: Some(rooms),
        }
    }

    /// `{ok:false, error}`.
    pub fn ack_err(id: u64, error: impl Into<String>) -> Self {
        Self::Ack {
            id,
            ok: false,
            error: Some(error.into()),
            room: None,
            rooms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
