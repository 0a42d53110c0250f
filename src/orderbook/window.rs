//! Time window around a target timestamp
//!
//! The selector drives a [`BookReplayer`] and keeps candidates whose
//! `event_time` lies in `[target - before_ms, target + after_ms]`. It peeks at
//! the next event and stops before applying anything past the upper bound.

use crate::error::Result;
use crate::orderbook::events::IntoBookEvent;
use crate::orderbook::replay::{BookReplayer, CandidateState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Window offsets relative to the target time (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayWindow {
    pub before_ms: i64,
    pub after_ms: i64,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self {
            before_ms: 1_000,
            after_ms: 1_000,
        }
    }
}

impl ReplayWindow {
    pub fn new(before_ms: i64, after_ms: i64) -> Self {
        Self {
            before_ms,
            after_ms,
        }
    }

    /// Lower bound for `target`
    pub fn lower_bound(&self, target: i64) -> i64 {
        target.saturating_sub(self.before_ms)
    }

    /// Upper bound for `target`
    pub fn upper_bound(&self, target: i64) -> i64 {
        target.saturating_add(self.after_ms)
    }
}

/// Why a window produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyWindowReason {
    /// The event log ended before the target time
    ReplayExhausted,

    /// Events reached the target, but none fell inside the window
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    Candidates(Vec<CandidateState>),
    Empty(EmptyWindowReason),
}

impl WindowOutcome {
    pub fn candidates(&self) -> &[CandidateState] {
        match self {
            WindowOutcome::Candidates(c) => c,
            WindowOutcome::Empty(_) => &[],
        }
    }
}

/// Bounded window for one target time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSelector {
    pub target: i64,
    pub lower_bound: i64,
    pub upper_bound: i64,
}

impl WindowSelector {
    pub fn new(target: i64, window: ReplayWindow) -> Self {
        Self {
            target,
            lower_bound: window.lower_bound(target),
            upper_bound: window.upper_bound(target),
        }
    }

    pub fn contains(&self, event_time: i64) -> bool {
        (self.lower_bound..=self.upper_bound).contains(&event_time)
    }

    /// Drive the replay and collect candidates inside the window.
    ///
    /// Replay errors propagate; nothing past the upper bound is applied.
    pub fn select<I>(&self, replayer: &mut BookReplayer<I>) -> Result<WindowOutcome>
    where
        I: Iterator,
        I::Item: IntoBookEvent,
    {
        let mut candidates = Vec::new();
        let mut reached_target = replayer.last_event_time() >= self.target;

        loop {
            match replayer.peek_event_time()? {
                None => break,
                Some(t) if t > self.upper_bound => {
                    reached_target = true;
                    break;
                }
                Some(_) => {}
            }

            let Some(candidate) = replayer.next().transpose()? else {
                break;
            };
            if candidate.event_time >= self.target {
                reached_target = true;
            }
            if candidate.event_time >= self.lower_bound {
                candidates.push(candidate);
            }
        }

        debug!(
            target_time = self.target,
            lower_bound = self.lower_bound,
            upper_bound = self.upper_bound,
            applied = replayer.applied(),
            candidates = candidates.len(),
            "Window selection finished"
        );

        if !reached_target {
            return Ok(WindowOutcome::Empty(EmptyWindowReason::ReplayExhausted));
        }
        if candidates.is_empty() {
            return Ok(WindowOutcome::Empty(EmptyWindowReason::NoCandidates));
        }
        Ok(WindowOutcome::Candidates(candidates))
    }
}
