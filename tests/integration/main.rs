// Integration tests for divergence cycles
//
// These tests drive the engine end to end through its collaborators:
// - Replay, window selection and scoring against a known remote book
// - Empty windows versus genuine matches
// - Waiting for late events and fetching remote books in one batch
// - Per-instrument failures that leave the rest of the cycle intact
// - Cancellation discarding partial results
// - The RocksDB event store as the event log source


#[cfg(feature = "event_store")]
mod event_store_tests;
