//! In-memory event log and remote snapshot table
//!
//! Records are kept per instrument in arrival order, the way a collector
//! writes them. Used by tests and when embedding the engine.

use crate::collector::{EventLog, EventLogSource, RemoteSnapshotSource};
use crate::error::SourceError;
use crate::orderbook::{BaseSnapshot, RawEvent, RemoteSnapshot};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryEventLog {
    records: RwLock<HashMap<String, Vec<RawEvent>>>,
    remote: RwLock<HashMap<String, RemoteSnapshot>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record (book, price change or trade) for an instrument
    pub async fn record(&self, instrument_id: &str, event: RawEvent) {
        self.records
            .write()
            .await
            .entry(instrument_id.to_string())
            .or_default()
            .push(event);
    }

    pub async fn record_all(
        &self,
        instrument_id: &str,
        events: impl IntoIterator<Item = RawEvent>,
    ) {
        let mut records = self.records.write().await;
        records
            .entry(instrument_id.to_string())
            .or_default()
            .extend(events);
    }

    /// Set the snapshot returned as the authoritative remote book
    pub async fn set_remote(&self, snapshot: RemoteSnapshot) {
        self.remote
            .write()
            .await
            .insert(snapshot.instrument_id.clone(), snapshot);
    }
}

/// Index of the base snapshot record for `since_time`
fn base_index(records: &[RawEvent], since_time: i64) -> Option<usize> {
    let books = || {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_book() && r.server_time.is_some())
    };
    books()
        .filter(|(_, r)| r.server_time.is_some_and(|t| t <= since_time))
        .last()
        .or_else(|| books().next())
        .map(|(i, _)| i)
}

impl EventLogSource for MemoryEventLog {
    async fn base_snapshot_and_events_since(
        &self,
        instrument_id: &str,
        since_time: i64,
    ) -> Result<EventLog, SourceError> {
        let records = self.records.read().await;
        let log = records
            .get(instrument_id)
            .ok_or_else(|| SourceError::NotFound(format!("no events for {}", instrument_id)))?;

        let index = base_index(log, since_time).ok_or_else(|| {
            SourceError::NotFound(format!("no snapshot recorded for {}", instrument_id))
        })?;
        let base_record = &log[index];
        let book = base_record
            .decode_book()
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        let snapshot_time = base_record.server_time.unwrap_or_default();

        Ok(EventLog {
            base: BaseSnapshot {
                snapshot_time,
                book,
            },
            events: log[index + 1..].to_vec(),
        })
    }
}

impl RemoteSnapshotSource for MemoryEventLog {
    async fn remote_snapshot(&self, instrument_id: &str) -> Result<RemoteSnapshot, SourceError> {
        self.remote
            .read()
            .await
            .get(instrument_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("no remote book for {}", instrument_id)))
    }

    async fn remote_snapshots(
        &self,
        instrument_ids: &[String],
    ) -> Result<Vec<RemoteSnapshot>, SourceError> {
        let remote = self.remote.read().await;
        Ok(instrument_ids
            .iter()
            .filter_map(|id| remote.get(id).cloned())
            .collect())
    }
}
