//! Cross-instrument distance statistics
//!
//! Collects one bid and one ask distance per instrument per cycle and reduces
//! them to moments and percentiles. Quantiles use statrs' estimator
//! (R-8, median-unbiased). An empty side reports `NoData`.

use crate::analytics::selector::DivergenceResult;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::str::FromStr;

/// Octile percentiles reported every cycle
const CANONICAL_PERCENTILES: [f64; 7] = [12.5, 25.0, 37.5, 50.0, 62.5, 75.0, 87.5];

/// Decile-and-tail percentiles of the alternate report layout
const LEGACY_PERCENTILES: [f64; 11] = [
    10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 97.5,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentileSet {
    /// 12.5 … 87.5 in steps of 12.5
    #[default]
    Canonical,

    /// Canonical plus 10 … 90, 95 and 97.5
    Extended,
}

impl PercentileSet {
    /// Percentiles in ascending order, without duplicates
    pub fn points(&self) -> Vec<f64> {
        let mut points = CANONICAL_PERCENTILES.to_vec();
        if *self == PercentileSet::Extended {
            points.extend_from_slice(&LEGACY_PERCENTILES);
        }
        points.sort_by(f64::total_cmp);
        points.dedup();
        points
    }
}

impl FromStr for PercentileSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canonical" => Ok(PercentileSet::Canonical),
            "extended" => Ok(PercentileSet::Extended),
            other => Err(format!(
                "unknown percentile set {:?} (expected canonical or extended)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    pub percentile: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    /// Second central moment (population variance)
    pub variance: f64,
    pub third_central_moment: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Vec<Percentile>,
}

impl DistributionSummary {
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|p| p.percentile == percentile)
            .map(|p| p.value)
    }
}

/// Statistics for one side; `NoData` when nothing was scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SideStatistics {
    NoData,
    Summary(DistributionSummary),
}

impl SideStatistics {
    pub fn summary(&self) -> Option<&DistributionSummary> {
        match self {
            SideStatistics::Summary(s) => Some(s),
            SideStatistics::NoData => None,
        }
    }
}

/// Reduce a set of distances to descriptive statistics
pub fn summarize_distances(values: &[f64], percentiles: PercentileSet) -> SideStatistics {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return SideStatistics::NoData;
    }

    let count = finite.len();
    let mean = Statistics::mean(finite.iter());
    let variance = Statistics::population_variance(finite.iter());
    let third_central_moment =
        finite.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / count as f64;
    let min = Statistics::min(finite.iter());
    let max = Statistics::max(finite.iter());

    let mut data = Data::new(finite);
    let percentiles = percentiles
        .points()
        .into_iter()
        .map(|p| Percentile {
            percentile: p,
            value: data.quantile(p / 100.0),
        })
        .collect();

    SideStatistics::Summary(DistributionSummary {
        count,
        mean,
        variance,
        third_central_moment,
        min,
        max,
        percentiles,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatistics {
    pub bids: SideStatistics,
    pub asks: SideStatistics,
    /// Instruments whose window held no candidate state
    pub empty_windows: usize,
}

/// Cycle-scoped, single-writer collection of per-instrument distances
#[derive(Debug, Clone, Default)]
pub struct DistanceAggregator {
    percentiles: PercentileSet,
    bids: Vec<f64>,
    asks: Vec<f64>,
    empty_windows: usize,
}

impl DistanceAggregator {
    pub fn new(percentiles: PercentileSet) -> Self {
        Self {
            percentiles,
            ..Default::default()
        }
    }

    /// Record one instrument's pair of results.
    ///
    /// Sides without candidates are counted, not averaged in as zeros.
    pub fn record(&mut self, bids: &DivergenceResult, asks: &DivergenceResult) {
        if bids.had_candidates {
            self.bids.push(bids.distance);
        }
        if asks.had_candidates {
            self.asks.push(asks.distance);
        }
        if !bids.had_candidates || !asks.had_candidates {
            self.empty_windows += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.bids.len().max(self.asks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn summarize(&self) -> CycleStatistics {
        CycleStatistics {
            bids: summarize_distances(&self.bids, self.percentiles),
            asks: summarize_distances(&self.asks, self.percentiles),
            empty_windows: self.empty_windows,
        }
    }
}
