//! Sanitized room state as clients see it.
//!
//! These are snapshots built by the room actor after every change and pushed
//! to members in `room:update`. Nothing here refers to a connection, and
//! [`QuestionView`] deliberately has no correct-answer field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{PlayerId, RoomCode};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Phase of a room's game.
///
/// ```text
///           start                resolve (someone right)
///   Lobby ────────▶ Question ──▶ Resolve ──────────────▶ Claim
///                      ▲            │                       │
///                      └────────────┘ (nobody right)        │
///                      ▲                                    │
///                      └──────── claim, cells left ─────────┤
///                                                           ▼
///   End ◀──────────────────────── claim, board full ────────┘
///    │
///    └── start ──▶ Question
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Lobby,
    Question,
    Resolve,
    Claim,
    End,
}

impl Phase {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Lobby, Question)
                | (Question, Resolve)
                | (Resolve, Question)
                | (Resolve, Claim)
                | (Claim, Question)
                | (Claim, End)
                | (End, Question)
        )
    }

    /// Phases from which a host may start a game.
    pub fn can_start(self) -> bool {
        matches!(self, Phase::Lobby | Phase::End)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Lobby => "lobby",
            Phase::Question => "question",
            Phase::Resolve => "resolve",
            Phase::Claim => "claim",
            Phase::End => "end",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// One grid cell. `strength` is 0 only while `owner` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub owner: Option<PlayerId>,
    pub strength: u8,
}

impl Cell {
    /// Highest strength a cell can reach.
    pub const MAX_STRENGTH: u8 = 3;

    pub const EMPTY: Cell = Cell {
        owner: None,
        strength: 0,
    };

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }
}

// ---------------------------------------------------------------------------
// Room snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    /// Hex color such as `"#e74c3c"`.
    pub color: String,
}

/// The open question, without its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    /// Chosen option. Left out while the question is still open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Epoch milliseconds at which the server received the answer.
    pub submitted_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub phase: Phase,
    pub size: usize,
    /// Rows of cells: `grid[y][x]`.
    pub grid: Vec<Vec<Cell>>,
    pub turn_index: usize,
    /// Player whose turn `turn_index` currently points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_player: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// Round deadline in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,
    pub answers: BTreeMap<PlayerId, AnswerView>,
    pub claimed: BTreeMap<PlayerId, u32>,
}

/// Full room snapshot sent in acks and `room:update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: RoomCode,
    pub name: String,
    pub host_id: PlayerId,
    pub players: Vec<PlayerView>,
    pub state: GameView,
}

impl RoomView {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// One line of a room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomCode,
    pub name: String,
    pub player_count: usize,
    pub phase: Phase,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legal_transitions() {
        use Phase::*;
        assert!(Lobby.can_transition_to(Question));
        assert!(Question.can_transition_to(Resolve));
        assert!(Resolve.can_transition_to(Claim));
        assert!(Resolve.can_transition_to(Question));
        assert!(Claim.can_transition_to(Question));
        assert!(Claim.can_transition_to(End));
        assert!(End.can_transition_to(Question));
    }

    #[test]
    fn test_illegal_transitions() {
        use Phase::*;
        assert!(!Lobby.can_transition_to(Claim));
        assert!(!Question.can_transition_to(Claim));
        assert!(!Question.can_transition_to(End));
        assert!(!End.can_transition_to(Lobby));
        assert!(!Claim.can_transition_to(Resolve));
        for p in [Lobby, Question, Resolve, Claim, End] {
            assert!(!p.can_transition_to(p), "{p} -> {p}");
        }
    }

    #[test]
    fn test_only_lobby_and_end_can_start() {
        assert!(Phase::Lobby.can_start());
        assert!(Phase::End.can_start());
        assert!(!Phase::Question.can_start());
        assert!(!Phase::Claim.can_start());
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Phase::Question).unwrap(), json!("question"));
        assert_eq!(Phase::End.to_string(), "end");
    }

    #[test]
    fn test_empty_cell_serialization() {
        assert_eq!(
            serde_json::to_value(Cell::EMPTY).unwrap(),
            json!({"owner": null, "strength": 0})
        );
    }

    #[test]
    fn test_game_view_keys_and_hidden_answer() {
        let mut answers = BTreeMap::new();
        answers.insert(PlayerId(1), AnswerView { index: None, submitted_at: 10 });
        let view = GameView {
            phase: Phase::Question,
            size: 1,
            grid: vec![vec![Cell::EMPTY]],
            turn_index: 0,
            turn_player: Some(PlayerId(1)),
            question: Some(QuestionView {
                prompt: "2+2*2=?".into(),
                options: vec!["6".into(), "8".into()],
            }),
            deadline: Some(15_000),
            answers,
            claimed: BTreeMap::new(),
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["turnIndex"], 0);
        assert_eq!(value["answers"]["1"]["submittedAt"], 10);
        assert!(value["answers"]["1"].get("index").is_none());
        assert!(value["question"].get("correct").is_none());

        let back: GameView = serde_json::from_value(value).unwrap();
        assert_eq!(back, view);
    }
}
