//! Divergence analytics
//!
//! Scores reconstructed books against remote snapshots and aggregates the
//! distances across instruments:
//! - **distance**: rank-by-rank metric between two books, per side
//! - **selector**: closest window candidate per side
//! - **stats**: moments and percentiles across instruments
//! - **engine**: collaborator fetches, bounded parallel scoring, cycle reports

pub mod distance;
pub mod engine;
pub mod selector;
pub mod stats;

pub use distance::{ordered_distance, side_distance, DistanceMetric};
pub use engine::{
    score_event_log, DivergenceEngine, EngineSettings, InstrumentDivergence, InstrumentTarget,
};
pub use selector::{select_minimum, DivergenceResult};
pub use stats::{
    summarize_distances, CycleStatistics, DistanceAggregator, DistributionSummary, Percentile,
    PercentileSet, SideStatistics,
};
