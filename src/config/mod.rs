//! Configuration Management
//!
//! This module loads the divergence service configuration from the environment.

pub mod analytics;

// Re-export
pub use analytics::AnalyticsConfig;
