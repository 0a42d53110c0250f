//! Divergence metric between two books
//!
//! Each side is put in market order (bids descending, asks ascending) and the
//! two sequences are compared rank by rank. At rank `i`:
//!
//! ```text
//! d(i) = (|price_local - price_remote| + |size_local - size_remote|) / 2
//! ```
//!
//! and 0 if either book has no level at that rank. The side distance sums
//! `d(i)` over all ranks, attenuated as `d(i)^(1/(i+1))` unless the plain
//! metric is selected.

use crate::orderbook::types::{OrderBook, PriceLevel, RemoteSnapshot, Side};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Aggregation applied to per-rank distances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Σ d(i)^(1/(i+1)): deep mismatches weigh progressively less
    #[default]
    Attenuated,

    /// Σ d(i): every rank weighs the same
    Plain,
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attenuated" => Ok(DistanceMetric::Attenuated),
            "plain" => Ok(DistanceMetric::Plain),
            other => Err(format!(
                "unknown distance metric {:?} (expected attenuated or plain)",
                other
            )),
        }
    }
}

/// Distance between two levels at rank `i`, before aggregation
///
/// Exact in Decimal when the terms fit, otherwise computed in f64.
fn level_distance(local: &PriceLevel, remote: &PriceLevel) -> f64 {
    let exact = local
        .price
        .checked_sub(remote.price)
        .zip(local.size.checked_sub(remote.size))
        .and_then(|(dp, ds)| dp.abs().checked_add(ds.abs()))
        .map(|sum| sum / Decimal::TWO);

    match exact {
        Some(raw) => raw.to_f64().unwrap_or_else(|| {
            warn!(distance = %raw, "level distance not representable as f64");
            f64::NAN
        }),
        None => {
            let dp = to_f64_lossy(local.price) - to_f64_lossy(remote.price);
            let ds = to_f64_lossy(local.size) - to_f64_lossy(remote.size);
            (dp.abs() + ds.abs()) / 2.0
        }
    }
}

fn to_f64_lossy(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Distance between two ordered level sequences
pub fn ordered_distance(
    local: &[PriceLevel],
    remote: &[PriceLevel],
    metric: DistanceMetric,
) -> f64 {
    // Ranks missing on either side contribute 0, so zip covers every non-zero term
    local
        .iter()
        .zip(remote.iter())
        .enumerate()
        .map(|(rank, (l, r))| {
            let d = level_distance(l, r);
            match metric {
                DistanceMetric::Attenuated => d.powf(1.0 / (rank as f64 + 1.0)),
                DistanceMetric::Plain => d,
            }
        })
        .sum()
}

/// Distance for one side of a local book against the remote snapshot
pub fn side_distance(
    local: &OrderBook,
    remote: &RemoteSnapshot,
    side: Side,
    metric: DistanceMetric,
) -> f64 {
    ordered_distance(
        &local.ordered_levels(side),
        &remote.ordered_levels(side),
        metric,
    )
}
