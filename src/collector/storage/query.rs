//! Base snapshot lookup and event range scans
//!
//! Both scans stay inside one instrument's key prefix and stop as soon as
//! they leave it.

use super::{
    decode, instrument_prefix, parse_key, record_key, RocksEventStore, BOOK_PREFIX, EVENT_PREFIX,
};
use crate::collector::{EventLog, EventLogSource};
use crate::error::SourceError;
use crate::orderbook::{BaseSnapshot, RawEvent};
use anyhow::{Context, Result};
use rocksdb::{Direction, IteratorMode, DB};
use tracing::debug;

/// Key position and record of the snapshot a replay should start from
struct BaseRecord {
    server_time: i64,
    seq: u64,
    event: RawEvent,
}

type ScannedLog = (BaseRecord, Vec<RawEvent>);

/// Newest snapshot at or before `since_time`, else the earliest one
fn find_base(db: &DB, instrument_id: &str, since_time: i64) -> Result<Option<BaseRecord>> {
    let prefix = instrument_prefix(BOOK_PREFIX, instrument_id);

    if since_time >= 0 {
        let seek = record_key(BOOK_PREFIX, instrument_id, since_time, u64::MAX);
        let mode = IteratorMode::From(seek.as_bytes(), Direction::Reverse);
        if let Some(base) = first_in_prefix(db, mode, &prefix)? {
            return Ok(Some(base));
        }
    }

    // Every snapshot is later than since_time
    first_in_prefix(db, IteratorMode::From(prefix.as_bytes(), Direction::Forward), &prefix)
}

/// First snapshot the iterator yields, if it belongs to `prefix`
fn first_in_prefix(db: &DB, mode: IteratorMode<'_>, prefix: &str) -> Result<Option<BaseRecord>> {
    let Some(item) = db.iterator(mode).next() else {
        return Ok(None);
    };
    let (key, value) = item?;
    let key_str = String::from_utf8_lossy(&key);
    if !key_str.starts_with(prefix) {
        return Ok(None);
    }
    let Some((server_time, seq)) = parse_key(&key_str) else {
        return Ok(None);
    };

    Ok(Some(BaseRecord {
        server_time,
        seq,
        event: decode(&value).with_context(|| format!("Corrupt snapshot at {}", key_str))?,
    }))
}

/// Every record after the base key, in key order
fn events_after(db: &DB, instrument_id: &str, server_time: i64, seq: u64) -> Result<Vec<RawEvent>> {
    let prefix = instrument_prefix(EVENT_PREFIX, instrument_id);
    let start = record_key(EVENT_PREFIX, instrument_id, server_time, seq);
    let mode = IteratorMode::From(start.as_bytes(), Direction::Forward);

    let mut events = Vec::new();
    for item in db.iterator(mode) {
        let (key, value) = item?;
        let key_str = String::from_utf8_lossy(&key);
        if !key_str.starts_with(&prefix) {
            break;
        }
        if key_str == start {
            continue;
        }
        events.push(decode(&value).with_context(|| format!("Corrupt record at {}", key_str))?);
    }
    Ok(events)
}

impl EventLogSource for RocksEventStore {
    async fn base_snapshot_and_events_since(
        &self,
        instrument_id: &str,
        since_time: i64,
    ) -> Result<EventLog, SourceError> {
        let db = self.db().clone();
        let id = instrument_id.to_string();

        let scanned = tokio::task::spawn_blocking(move || -> Result<Option<ScannedLog>> {
            let Some(base) = find_base(&db, &id, since_time)? else {
                return Ok(None);
            };
            let events = events_after(&db, &id, base.server_time, base.seq)?;
            Ok(Some((base, events)))
        })
        .await
        .map_err(|e| SourceError::Storage(format!("event scan task failed: {}", e)))?
        .map_err(|e| SourceError::Storage(format!("{:#}", e)))?;

        let (base, events) = scanned.ok_or_else(|| {
            SourceError::NotFound(format!("no snapshot recorded for {}", instrument_id))
        })?;
        let book = base
            .event
            .decode_book()
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        debug!(
            instrument_id,
            snapshot_time = base.server_time,
            events = events.len(),
            "Loaded event log from store"
        );

        Ok(EventLog {
            base: BaseSnapshot {
                snapshot_time: base.server_time,
                book,
            },
            events,
        })
    }
}
