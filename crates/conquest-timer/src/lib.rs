//! Cancellable round deadline for a single room.
//!
//! Each room actor owns one [`RoundTimer`]. When a question round opens the
//! actor arms it; when the round is resolved (explicitly or because the
//! timer fired) or the game leaves the question phase, the actor disarms
//! it. The actor polls [`RoundTimer::wait`] as one branch of its
//! `tokio::select!` loop:
//!
//! ```rust,no_run
//! # async fn demo() {
//! use std::time::Duration;
//! use conquest_timer::RoundTimer;
//!
//! let mut timer = RoundTimer::new();
//! timer.arm(Duration::from_secs(15));
//! loop {
//!     tokio::select! {
//!         expired = timer.wait() => {
//!             // resolve round `expired.round`
//!             # break;
//!         }
//!     }
//! }
//! # }
//! ```
//!
//! A disarmed timer's `wait` never completes, so the branch simply stays
//! quiet until the next round is armed.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// Emitted when an armed deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundExpired {
    /// The arm counter value the deadline belonged to.
    pub round: u64,
    /// How far past the deadline the timer actually fired.
    pub late_by: Duration,
}

/// A one-shot, re-armable deadline.
#[derive(Debug, Default)]
pub struct RoundTimer {
    deadline: Option<Instant>,
    round: u64,
}

impl RoundTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer to fire `after` from now, replacing any pending
    /// deadline. Returns the new round number.
    pub fn arm(&mut self, after: Duration) -> u64 {
        self.round += 1;
        self.deadline = Some(Instant::now() + after);
        debug!(round = self.round, after_ms = after.as_millis() as u64, "round timer armed");
        self.round
    }

    /// Cancels the pending deadline, if any.
    pub fn disarm(&mut self) {
        if self.deadline.take().is_some() {
            debug!(round = self.round, "round timer disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Number of times the timer has been armed.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Time left before the deadline; `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Completes when the armed deadline passes, then disarms.
    ///
    /// Pends forever while disarmed. Cancel-safe: dropping the future
    /// (because another `select!` branch won) leaves the deadline armed.
    pub async fn wait(&mut self) -> RoundExpired {
        let Some(deadline) = self.deadline else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        self.deadline = None;
        let late_by = Instant::now().saturating_duration_since(deadline);
        trace!(round = self.round, late_ms = late_by.as_millis() as u64, "round timer fired");

        RoundExpired {
            round: self.round,
            late_by,
        }
    }
}
