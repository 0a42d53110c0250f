// Unit tests for book-divergence components
//
// Organized by component:
// - replay: determinism, delta/trade inverses, bounded replay work
// - distance: metric properties across both aggregations
// - stats: aggregation across instruments
// - report: markdown and JSON rendering

mod distance_tests;
mod replay_tests;
mod report_tests;
mod stats_tests;
