//! Per-cycle divergence engine
//!
//! Each cycle fetches every remote book in one batch, waits until the events
//! of each window can have been recorded, then per instrument loads the event
//! log from just before the window, replays into the window and scores both
//! sides. Instruments run on a bounded pool; statistics are computed once
//! every instrument of the cycle has finished.

use crate::analytics::distance::DistanceMetric;
use crate::analytics::selector::{select_minimum, DivergenceResult};
use crate::analytics::stats::{DistanceAggregator, PercentileSet};
use crate::collector::{EventLog, EventLogSource, RemoteSnapshotSource};
use crate::config::AnalyticsConfig;
use crate::error::{DivergenceError, Result, SourceError};
use crate::orderbook::{
    BookReplayer, EmptyWindowReason, RemoteSnapshot, ReplayWindow, Side, WindowOutcome,
    WindowSelector,
};
use crate::report::{CycleReport, InstrumentReport};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default settle delay past the window's upper bound
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Engine knobs that stay fixed across cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub window: ReplayWindow,
    pub metric: DistanceMetric,
    pub percentiles: PercentileSet,
    /// Instruments evaluated concurrently
    pub workers: usize,
    /// Extra wait past the window's upper bound before reading the event log
    pub settle: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            window: ReplayWindow::default(),
            metric: DistanceMetric::default(),
            percentiles: PercentileSet::default(),
            workers: 4,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

impl From<&AnalyticsConfig> for EngineSettings {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            window: config.window,
            metric: config.metric,
            percentiles: config.percentiles,
            workers: config.workers.max(1),
            settle: config.settle,
        }
    }
}

/// Instrument to evaluate, optionally at a fixed target time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentTarget {
    pub instrument_id: String,
    /// Defaults to the remote snapshot's capture time
    pub target_time: Option<i64>,
}

impl InstrumentTarget {
    pub fn new(instrument_id: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            target_time: None,
        }
    }

    pub fn at(instrument_id: impl Into<String>, target_time: i64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            target_time: Some(target_time),
        }
    }
}

/// Both sides of one instrument's evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentDivergence {
    pub instrument_id: String,
    pub target_time: i64,
    pub bids: DivergenceResult,
    pub asks: DivergenceResult,
    /// Set when the window produced no candidates
    pub empty_reason: Option<EmptyWindowReason>,
    /// Events applied during replay, peeked-only events excluded
    pub events_applied: usize,
}

impl InstrumentDivergence {
    pub fn result(&self, side: Side) -> &DivergenceResult {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

/// Replay `log` into the window around `target_time` and score it against `remote`.
///
/// Pure CPU work. Malformed or out-of-order events fail the whole evaluation.
pub fn score_event_log(
    instrument_id: &str,
    log: EventLog,
    remote: &RemoteSnapshot,
    target_time: i64,
    window: ReplayWindow,
    metric: DistanceMetric,
) -> Result<InstrumentDivergence> {
    let selector = WindowSelector::new(target_time, window);
    let mut replayer = BookReplayer::new(log.base, log.events);
    let outcome = selector.select(&mut replayer)?;

    let (bids, asks, empty_reason) = match &outcome {
        WindowOutcome::Candidates(candidates) => (
            select_minimum(instrument_id, Side::Bid, candidates, remote, metric),
            select_minimum(instrument_id, Side::Ask, candidates, remote, metric),
            None,
        ),
        WindowOutcome::Empty(reason) => (
            DivergenceResult::empty(instrument_id, Side::Bid),
            DivergenceResult::empty(instrument_id, Side::Ask),
            Some(*reason),
        ),
    };

    Ok(InstrumentDivergence {
        instrument_id: instrument_id.to_string(),
        target_time,
        bids,
        asks,
        empty_reason,
        events_applied: replayer.applied(),
    })
}

pub struct DivergenceEngine<E, R> {
    events: Arc<E>,
    remote: Arc<R>,
    settings: EngineSettings,
}

impl<E, R> Clone for DivergenceEngine<E, R> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            remote: Arc::clone(&self.remote),
            settings: self.settings,
        }
    }
}

impl<E, R> DivergenceEngine<E, R>
where
    E: EventLogSource,
    R: RemoteSnapshotSource,
{
    pub fn new(events: Arc<E>, remote: Arc<R>, settings: EngineSettings) -> Self {
        Self {
            events,
            remote,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Evaluate one instrument with the engine's window
    pub async fn evaluate_instrument(
        &self,
        target: &InstrumentTarget,
    ) -> Result<InstrumentDivergence> {
        self.score_instrument(&target.instrument_id, target.target_time, self.settings.window)
            .await
    }

    /// Evaluate one instrument with an explicit window.
    ///
    /// Collaborator failures come back as `Collaborator` errors for this
    /// instrument only.
    pub async fn score_instrument(
        &self,
        instrument_id: &str,
        target_time: Option<i64>,
        window: ReplayWindow,
    ) -> Result<InstrumentDivergence> {
        let remote = self
            .remote
            .remote_snapshot(instrument_id)
            .await
            .map_err(|e| DivergenceError::collaborator(instrument_id, e))?;

        let target_time = target_time.unwrap_or(remote.captured_at);
        self.wait_for_window(target_time, window).await;
        self.score_with_remote(instrument_id, target_time, window, remote)
            .await
    }

    /// How long to wait before the events up to the window's upper bound
    /// (plus the settle delay) can be expected in the log. Capped at
    /// `after_ms + settle` so a skewed capture time cannot stall a cycle.
    pub fn settle_delay(&self, target_time: i64, window: ReplayWindow) -> Duration {
        let settle_ms = i64::try_from(self.settings.settle.as_millis()).unwrap_or(i64::MAX);
        let ready_at = window.upper_bound(target_time).saturating_add(settle_ms);
        let wait_ms = ready_at
            .saturating_sub(Utc::now().timestamp_millis())
            .clamp(0, window.after_ms.max(0).saturating_add(settle_ms));
        Duration::from_millis(wait_ms as u64)
    }

    async fn wait_for_window(&self, target_time: i64, window: ReplayWindow) {
        let delay = self.settle_delay(target_time, window);
        if !delay.is_zero() {
            debug!(
                target_time,
                delay_ms = delay.as_millis() as u64,
                "Waiting for window events to settle"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Load the event log for an already fetched remote book and score it
    async fn score_with_remote(
        &self,
        instrument_id: &str,
        target_time: i64,
        window: ReplayWindow,
        remote: RemoteSnapshot,
    ) -> Result<InstrumentDivergence> {
        let since_time = window.lower_bound(target_time);

        let log = self
            .events
            .base_snapshot_and_events_since(instrument_id, since_time)
            .await
            .map_err(|e| DivergenceError::collaborator(instrument_id, e))?;

        debug!(
            instrument_id,
            target_time,
            snapshot_time = log.base.snapshot_time,
            events = log.events.len(),
            "Scoring instrument"
        );

        let id = instrument_id.to_string();
        let metric = self.settings.metric;
        tokio::task::spawn_blocking(move || {
            score_event_log(&id, log, &remote, target_time, window, metric)
        })
        .await
        .map_err(|e| DivergenceError::Internal(format!("scoring task failed: {}", e)))?
    }

    /// All remote books of the cycle in one request, keyed by instrument
    async fn fetch_remote_books(
        &self,
        targets: &[InstrumentTarget],
    ) -> std::result::Result<HashMap<String, RemoteSnapshot>, SourceError> {
        let mut ids: Vec<String> = targets.iter().map(|t| t.instrument_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let books = self.remote.remote_snapshots(&ids).await.map_err(|e| {
            warn!(instruments = ids.len(), error = %e, "Remote books fetch failed");
            e
        })?;
        Ok(books
            .into_iter()
            .map(|book| (book.instrument_id.clone(), book))
            .collect())
    }

    /// Run one cycle over `targets`.
    ///
    /// Per-instrument failures are reported, not propagated. Cancellation
    /// discards every partial result and returns `Cancelled`.
    pub async fn run_cycle(
        &self,
        targets: &[InstrumentTarget],
        cancel: &CancellationToken,
    ) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%cycle_id, instruments = targets.len(), "Starting divergence cycle");

        let window = self.settings.window;
        let evaluations = async {
            let books = self.fetch_remote_books(targets).await;

            // One wait for the whole cycle: until the latest window has settled
            let delay = match &books {
                Ok(books) => targets
                    .iter()
                    .filter_map(|target| {
                        let remote = books.get(&target.instrument_id)?;
                        let target_time = target.target_time.unwrap_or(remote.captured_at);
                        Some(self.settle_delay(target_time, window))
                    })
                    .max()
                    .unwrap_or_default(),
                Err(_) => Duration::ZERO,
            };
            if !delay.is_zero() {
                debug!(
                    %cycle_id,
                    delay_ms = delay.as_millis() as u64,
                    "Waiting for window events to settle"
                );
                tokio::time::sleep(delay).await;
            }

            let books = &books;
            stream::iter(targets.iter().enumerate())
                .map(|(index, target)| async move {
                    let id = target.instrument_id.as_str();
                    let remote = match books {
                        Ok(books) => books.get(id).cloned().ok_or_else(|| {
                            SourceError::NotFound(format!("no remote book for {}", id))
                        }),
                        Err(e) => Err(e.clone()),
                    };
                    let result = match remote {
                        Ok(remote) => {
                            let target_time = target.target_time.unwrap_or(remote.captured_at);
                            self.score_with_remote(id, target_time, window, remote).await
                        }
                        Err(e) => Err(DivergenceError::collaborator(id, e)),
                    };
                    (index, result)
                })
                .buffer_unordered(self.settings.workers.max(1))
                .collect::<Vec<_>>()
                .await
        };

        let mut results = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(%cycle_id, "Divergence cycle cancelled, discarding partial results");
                return Err(DivergenceError::Cancelled);
            }
            results = evaluations => results,
        };
        results.sort_by_key(|(index, _)| *index);

        // Every instrument has finished; aggregate in a single pass
        let mut aggregator = DistanceAggregator::new(self.settings.percentiles);
        let mut instruments = Vec::with_capacity(targets.len());
        let mut scored = 0;
        let mut failed = 0;

        for (target, (_, result)) in targets.iter().zip(results) {
            match result {
                Ok(divergence) => {
                    aggregator.record(&divergence.bids, &divergence.asks);
                    scored += 1;
                    instruments.push(InstrumentReport::Scored(divergence));
                }
                Err(e) => {
                    warn!(
                        %cycle_id,
                        instrument_id = %target.instrument_id,
                        error_type = e.error_type(),
                        error = %e,
                        "Instrument evaluation failed"
                    );
                    failed += 1;
                    instruments.push(InstrumentReport::failed(&target.instrument_id, &e));
                }
            }
        }

        let statistics = aggregator.summarize();
        let completed_at = Utc::now();
        info!(
            %cycle_id,
            scored,
            failed,
            empty_windows = statistics.empty_windows,
            duration_ms = (completed_at - started_at).num_milliseconds(),
            "Divergence cycle complete"
        );

        Ok(CycleReport {
            cycle_id,
            started_at,
            completed_at,
            window: self.settings.window,
            metric: self.settings.metric,
            percentile_set: self.settings.percentiles,
            instruments,
            bids: statistics.bids,
            asks: statistics.asks,
            scored,
            empty_windows: statistics.empty_windows,
            failed,
        })
    }
}
