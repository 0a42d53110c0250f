//! Minimum-distance candidate selection
//!
//! For each side, every window candidate is scored against the remote
//! snapshot and the closest one wins. Ties keep the earliest `event_time`.

use crate::analytics::distance::{side_distance, DistanceMetric};
use crate::orderbook::replay::CandidateState;
use crate::orderbook::types::{OrderBook, RemoteSnapshot, Side};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Winning candidate for one side of one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceResult {
    pub instrument_id: String,

    pub side: Side,

    /// Minimum distance across the window (0 when there were no candidates)
    pub distance: f64,

    /// False when the window was empty; distance is then 0 but not a match
    pub had_candidates: bool,

    /// Event time of the winning candidate
    pub event_time: Option<i64>,

    /// |live levels(local) - levels(remote)| for the winning candidate
    pub depth_difference: usize,

    /// Winning book (empty when there were no candidates)
    pub chosen_state: OrderBook,
}

impl DivergenceResult {
    /// Result for a window with no candidates
    pub fn empty(instrument_id: &str, side: Side) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            side,
            distance: 0.0,
            had_candidates: false,
            event_time: None,
            depth_difference: 0,
            chosen_state: OrderBook::new(),
        }
    }
}

/// Pick the closest candidate for `side`
pub fn select_minimum(
    instrument_id: &str,
    side: Side,
    candidates: &[CandidateState],
    remote: &RemoteSnapshot,
    metric: DistanceMetric,
) -> DivergenceResult {
    let mut best: Option<(f64, &CandidateState)> = None;

    for candidate in candidates {
        let distance = side_distance(&candidate.book, remote, side, metric);
        // Strict comparison keeps the earliest candidate on ties; NaN never wins
        let closer = match best {
            Some((best_distance, _)) => {
                distance < best_distance || (best_distance.is_nan() && !distance.is_nan())
            }
            None => true,
        };
        if closer {
            best = Some((distance, candidate));
        }
    }

    let Some((distance, winner)) = best else {
        return DivergenceResult::empty(instrument_id, side);
    };

    let remote_depth = remote.ordered_levels(side).len();
    let depth_difference = winner.book.depth(side).abs_diff(remote_depth);

    debug!(
        instrument_id = %instrument_id,
        side = %side,
        distance,
        event_time = winner.event_time,
        candidates = candidates.len(),
        "Selected closest candidate"
    );

    DivergenceResult {
        instrument_id: instrument_id.to_string(),
        side,
        distance,
        had_candidates: true,
        event_time: Some(winner.event_time),
        depth_difference,
        chosen_state: winner.book.clone(),
    }
}
