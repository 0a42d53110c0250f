//! Divergence Service Configuration
//!
//! Configuration for instruments, replay windows and collaborators.

use crate::analytics::{DistanceMetric, PercentileSet};
use crate::error::{DivergenceError, Result};
use crate::orderbook::ReplayWindow;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Analytics service configuration
///
/// ## Environment Variables
///
/// - `DIVERGENCE_INSTRUMENTS`: Comma-separated instrument ids (required)
/// - `DIVERGENCE_WINDOW_BEFORE_MS`: Window start before the target time (default: 1000)
/// - `DIVERGENCE_WINDOW_AFTER_MS`: Window end after the target time (default: 1000)
/// - `DIVERGENCE_POLL_INTERVAL_SECS`: Seconds between cycles (default: 4)
/// - `DIVERGENCE_SETTLE_MS`: Wait past the window end before reading events (default: 500)
/// - `DIVERGENCE_WORKERS`: Instruments evaluated concurrently (default: available cores)
/// - `DIVERGENCE_METRIC`: `attenuated` or `plain` (default: attenuated)
/// - `DIVERGENCE_PERCENTILES`: `canonical` or `extended` (default: canonical)
/// - `EVENT_STORE_PATH`: RocksDB event store directory (default: ./data/events)
/// - `EVENT_RETENTION_SECS`: Age after which stored events are pruned (default: 604800, 7 days)
/// - `REMOTE_BOOKS_URL`: Remote books API (default: https://clob.polymarket.com)
/// - `REMOTE_REQUESTS_PER_SECOND`: Client-side request rate (default: 5)
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub instruments: Vec<String>,

    pub window: ReplayWindow,

    /// Delay between two cycles
    pub poll_interval: Duration,

    /// Wait past the window's upper bound so late events reach the log
    pub settle: Duration,

    /// Upper bound on concurrently evaluated instruments
    pub workers: usize,

    pub metric: DistanceMetric,

    pub percentiles: PercentileSet,

    pub event_store_path: PathBuf,

    /// Stored events older than this are pruned
    pub retention: Duration,

    pub remote_books_url: String,

    pub requests_per_second: u32,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| DivergenceError::Config(format!("{}: {}", key, e))),
        _ => Ok(default),
    }
}

impl AnalyticsConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `Config` if DIVERGENCE_INSTRUMENTS is missing or a value does
    /// not parse
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instruments: Vec<String> = lookup("DIVERGENCE_INSTRUMENTS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if instruments.is_empty() {
            return Err(DivergenceError::Config(
                "DIVERGENCE_INSTRUMENTS environment variable is required".to_string(),
            ));
        }

        let before_ms: i64 = parse_or(&lookup, "DIVERGENCE_WINDOW_BEFORE_MS", 1000)?;
        let after_ms: i64 = parse_or(&lookup, "DIVERGENCE_WINDOW_AFTER_MS", 1000)?;
        if before_ms < 0 || after_ms < 0 {
            return Err(DivergenceError::Config(
                "window bounds must not be negative".to_string(),
            ));
        }

        let poll_secs: u64 = parse_or(&lookup, "DIVERGENCE_POLL_INTERVAL_SECS", 4)?;
        let settle_ms: u64 = parse_or(&lookup, "DIVERGENCE_SETTLE_MS", 500)?;
        let workers: usize = parse_or(&lookup, "DIVERGENCE_WORKERS", default_workers())?;
        let retention_secs: u64 = parse_or(&lookup, "EVENT_RETENTION_SECS", 7 * 24 * 60 * 60)?;

        Ok(Self {
            instruments,
            window: ReplayWindow::new(before_ms, after_ms),
            poll_interval: Duration::from_secs(poll_secs.max(1)),
            settle: Duration::from_millis(settle_ms),
            workers: workers.max(1),
            metric: parse_or(&lookup, "DIVERGENCE_METRIC", DistanceMetric::default())?,
            percentiles: parse_or(&lookup, "DIVERGENCE_PERCENTILES", PercentileSet::default())?,
            event_store_path: lookup("EVENT_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/events")),
            retention: Duration::from_secs(retention_secs.max(1)),
            remote_books_url: lookup("REMOTE_BOOKS_URL")
                .unwrap_or_else(|| "https://clob.polymarket.com".to_string()),
            requests_per_second: parse_or(&lookup, "REMOTE_REQUESTS_PER_SECOND", 5)?,
        })
    }
}
