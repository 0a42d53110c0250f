// Cycle report module
//
// One report per polling cycle: per-instrument divergence results plus the
// cross-instrument statistics, serializable to JSON and renderable as markdown.

pub mod formatter;
pub mod generator;
pub mod sections;

// Re-export main entry points
pub use generator::{render_json, render_markdown};

use crate::analytics::engine::InstrumentDivergence;
use crate::analytics::{DistanceMetric, PercentileSet, SideStatistics};
use crate::error::DivergenceError;
use crate::orderbook::ReplayWindow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of one instrument within a cycle
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstrumentReport {
    Scored(InstrumentDivergence),
    Failed {
        instrument_id: String,
        error_type: String,
        message: String,
    },
}

impl InstrumentReport {
    pub fn failed(instrument_id: &str, error: &DivergenceError) -> Self {
        InstrumentReport::Failed {
            instrument_id: instrument_id.to_string(),
            error_type: error.error_type().to_string(),
            message: error.to_string(),
        }
    }

    pub fn instrument_id(&self) -> &str {
        match self {
            InstrumentReport::Scored(divergence) => &divergence.instrument_id,
            InstrumentReport::Failed { instrument_id, .. } => instrument_id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, InstrumentReport::Failed { .. })
    }
}

/// Everything one completed cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,

    pub window: ReplayWindow,

    pub metric: DistanceMetric,

    pub percentile_set: PercentileSet,

    /// In the order instruments were requested
    pub instruments: Vec<InstrumentReport>,

    pub bids: SideStatistics,

    pub asks: SideStatistics,

    /// Instruments with a scored result
    pub scored: usize,

    /// Scored instruments whose window held no candidate on some side
    pub empty_windows: usize,

    pub failed: usize,
}

impl CycleReport {
    /// Result for one instrument, if it was part of the cycle
    pub fn instrument(&self, instrument_id: &str) -> Option<&InstrumentReport> {
        self.instruments
            .iter()
            .find(|report| report.instrument_id() == instrument_id)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}
