//! Collects answers for one question round and decides who was right.

use std::collections::{BTreeMap, HashMap};

use conquest_protocol::{AnswerView, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Submission {
    index: usize,
    /// Server receive time, epoch ms.
    at: u64,
    /// Receipt order; breaks ties on equal `at`.
    seq: u64,
}

/// Answers of the current round, one per player.
#[derive(Debug, Clone, Default)]
pub struct AnswerArbiter {
    submissions: HashMap<PlayerId, Submission>,
    next_seq: u64,
}

impl AnswerArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `player`'s answer. A later submission replaces an earlier
    /// one, time and all.
    pub fn submit(&mut self, player: PlayerId, index: usize, at: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.submissions.insert(player, Submission { index, at, seq });
    }

    /// Drops `player`'s answer, e.g. when they leave the room.
    pub fn withdraw(&mut self, player: PlayerId) {
        self.submissions.remove(&player);
    }

    /// Forgets every answer. Called when a new question opens.
    pub fn clear(&mut self) {
        self.submissions.clear();
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Players who picked `correct`, earliest first.
    ///
    /// Equal timestamps keep the order the answers were received in.
    pub fn resolve_round(&self, correct: usize) -> Vec<PlayerId> {
        let mut right: Vec<_> = self
            .submissions
            .iter()
            .filter(|(_, s)| s.index == correct)
            .map(|(player, s)| (s.at, s.seq, *player))
            .collect();
        right.sort_unstable();
        right.into_iter().map(|(_, _, player)| player).collect()
    }

    /// Who answered and when. The chosen index only with `reveal`.
    pub fn views(&self, reveal: bool) -> BTreeMap<PlayerId, AnswerView> {
        self.submissions
            .iter()
            .map(|(player, s)| {
                (
                    *player,
                    AnswerView {
                        index: reveal.then_some(s.index),
                        submitted_at: s.at,
                    },
                )
            })
            .collect()
    }
}
