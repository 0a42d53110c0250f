//! Event log storage using RocksDB
//!
//! Storage design:
//! - **Event keys**: `evt:{instrument}:{server_time:020}:{seq:020}`, every record
//! - **Snapshot index**: `book:{instrument}:{server_time:020}:{seq:020}`, book records only
//! - **Value format**: MessagePack-serialized `RawEvent`
//! - **Ordering**: zero-padded times sort lexicographically; `seq` keeps arrival
//!   order for equal times
//! - **Compression**: Zstd
//! - **Retention**: `prune_before` drops records older than a cutoff but keeps
//!   each instrument's newest snapshot at or before it, so replay from the
//!   cutoff still has a base

pub mod query;

use crate::orderbook::RawEvent;
use anyhow::{Context, Result};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) const EVENT_PREFIX: &str = "evt";
pub(crate) const BOOK_PREFIX: &str = "book";

pub(crate) fn record_key(kind: &str, instrument_id: &str, server_time: i64, seq: u64) -> String {
    format!("{}:{}:{:020}:{:020}", kind, instrument_id, server_time, seq)
}

pub(crate) fn instrument_prefix(kind: &str, instrument_id: &str) -> String {
    format!("{}:{}:", kind, instrument_id)
}

/// Parse `(server_time, seq)` from a record key
pub(crate) fn parse_key(key: &str) -> Option<(i64, u64)> {
    parse_record_key(key).map(|(_, _, time, seq)| (time, seq))
}

/// Parse `(kind, instrument, server_time, seq)` from a record key
pub(crate) fn parse_record_key(key: &str) -> Option<(&str, &str, i64, u64)> {
    let (kind, rest) = key.split_once(':')?;
    let mut parts = rest.rsplitn(3, ':');
    let seq = parts.next()?.parse().ok()?;
    let time = parts.next()?.parse().ok()?;
    let instrument = parts.next()?;
    Some((kind, instrument, time, seq))
}

pub(crate) fn encode(event: &RawEvent) -> Result<Vec<u8>> {
    rmp_serde::to_vec(event).context("Failed to serialize event to MessagePack")
}

pub(crate) fn decode(data: &[u8]) -> Result<RawEvent> {
    rmp_serde::from_slice(data).context("Failed to deserialize event from MessagePack")
}

/// RocksDB handle for recorded book events
#[derive(Clone)]
pub struct RocksEventStore {
    db: Arc<DB>,
    seq: Arc<AtomicU64>,
}

impl RocksEventStore {
    /// Open (or create) the store.
    ///
    /// Sequence numbers start from the current time in microseconds so records
    /// written after a restart still sort after earlier ones with the same time.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);

        let db = DB::open(&opts, path).context("Failed to open RocksDB event store")?;
        let start = chrono::Utc::now().timestamp_micros().max(0) as u64;

        Ok(Self {
            db: Arc::new(db),
            seq: Arc::new(AtomicU64::new(start)),
        })
    }

    /// Append one record for an instrument.
    ///
    /// Records need a non-negative `server_time` to be keyed.
    pub async fn append(&self, instrument_id: &str, event: &RawEvent) -> Result<()> {
        let server_time = event
            .server_time
            .filter(|t| *t >= 0)
            .with_context(|| format!("{} record without a valid server_time", event.event_type))?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let value = encode(event)?;

        let mut batch = WriteBatch::default();
        batch.put(record_key(EVENT_PREFIX, instrument_id, server_time, seq), &value);
        if event.is_book() {
            batch.put(record_key(BOOK_PREFIX, instrument_id, server_time, seq), &value);
        }

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            db.write(batch).context("Failed to write event to RocksDB")
        })
        .await??;

        Ok(())
    }

    /// Delete records older than `cutoff_time` (milliseconds).
    ///
    /// Per instrument, the newest snapshot at or before the cutoff and every
    /// record after it survive. Instruments with no such snapshot lose
    /// everything older than the cutoff.
    ///
    /// Run by the service's hourly retention task.
    pub async fn prune_before(&self, cutoff_time: i64) -> Result<usize> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || {
            // (time, seq) of the snapshot replay would start from at the cutoff
            let mut keep_from: HashMap<String, (i64, u64)> = HashMap::new();
            let book_prefix = format!("{}:", BOOK_PREFIX);
            let books = IteratorMode::From(book_prefix.as_bytes(), Direction::Forward);
            for item in db.iterator(books) {
                let (key, _) = item?;
                let key_str = String::from_utf8_lossy(&key);
                if !key_str.starts_with(&book_prefix) {
                    break;
                }
                if let Some((_, instrument, time, seq)) = parse_record_key(&key_str) {
                    if time <= cutoff_time {
                        keep_from.insert(instrument.to_string(), (time, seq));
                    }
                }
            }

            let mut batch = WriteBatch::default();
            let mut deleted = 0;

            for item in db.iterator(IteratorMode::Start) {
                let (key, _) = item?;
                let key_str = String::from_utf8_lossy(&key);
                let Some((_, instrument, time, seq)) = parse_record_key(&key_str) else {
                    continue;
                };
                let expired = match keep_from.get(instrument) {
                    Some(boundary) => (time, seq) < *boundary,
                    None => time < cutoff_time,
                };
                if expired {
                    batch.delete(&key);
                    deleted += 1;
                }
            }

            if deleted > 0 {
                db.write(batch).context("Failed to delete old events")?;
            }
            Ok(deleted)
        })
        .await?
    }

    pub(crate) fn db(&self) -> &Arc<DB> {
        &self.db
    }
}
