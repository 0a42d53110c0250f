//! Collaborators feeding the divergence engine
//!
//! - `EventLogSource`: base snapshot plus recorded events per instrument
//! - `RemoteSnapshotSource`: authoritative book fetched out-of-band
//!
//! Implementations: an in-memory log, a RocksDB event store and an HTTP
//! client for the remote books API.

pub mod memory;

#[cfg(feature = "event_store")]
pub mod storage;

#[cfg(feature = "remote_books")]
pub mod client;

#[cfg(feature = "remote_books")]
pub mod rate_limiter;

#[cfg(feature = "remote_books")]
pub mod types;

use crate::error::SourceError;
use crate::orderbook::{BaseSnapshot, RawEvent, RemoteSnapshot};
use std::future::Future;

pub use memory::MemoryEventLog;

#[cfg(feature = "event_store")]
pub use storage::RocksEventStore;

#[cfg(feature = "remote_books")]
pub use client::BooksClient;

/// Base snapshot and the events recorded after it, in server-time order
#[derive(Debug, Clone)]
pub struct EventLog {
    pub base: BaseSnapshot,
    pub events: Vec<RawEvent>,
}

pub trait EventLogSource: Send + Sync {
    /// Newest snapshot at or before `since_time` (the earliest one if all are
    /// later) and every event recorded after it.
    fn base_snapshot_and_events_since(
        &self,
        instrument_id: &str,
        since_time: i64,
    ) -> impl Future<Output = Result<EventLog, SourceError>> + Send;
}

pub trait RemoteSnapshotSource: Send + Sync {
    fn remote_snapshot(
        &self,
        instrument_id: &str,
    ) -> impl Future<Output = Result<RemoteSnapshot, SourceError>> + Send;

    /// Books for several instruments in one round trip. Instruments the
    /// source has no book for are left out of the result.
    fn remote_snapshots(
        &self,
        instrument_ids: &[String],
    ) -> impl Future<Output = Result<Vec<RemoteSnapshot>, SourceError>> + Send;
}
