// Divergence cycles backed by the RocksDB event store

use book_divergence::analytics::{DivergenceEngine, EngineSettings, InstrumentTarget};
use book_divergence::collector::{MemoryEventLog, RocksEventStore};
use book_divergence::orderbook::{
    BookEvent, PriceLevel, RawEvent, RawLevel, RemoteSnapshot, ReplayWindow, Side,
};
use book_divergence::report::InstrumentReport;
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

#[tokio::test]
async fn test_cycle_over_persisted_events() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(RocksEventStore::new(temp_dir.path())?);

    let events = [
        BookEvent::snapshot(
            vec![PriceLevel::new(d(10), d(5))],
            vec![PriceLevel::new(d(11), d(2))],
            0,
        ),
        BookEvent::delta(Side::Bid, d(10), d(3), 100),
        BookEvent::trade(Side::Bid, d(10), d(2), 105),
        BookEvent::delta(Side::Ask, d(11), d(1), 400),
    ];
    for event in &events {
        store.append("tok", &RawEvent::from(event)).await?;
    }
    // later snapshot of an unrelated instrument sharing a key prefix
    store
        .append(
            "tok2",
            &RawEvent::book(
                vec![RawLevel {
                    price: "1".to_string(),
                    size: "1".to_string(),
                }],
                vec![],
                50,
            ),
        )
        .await?;

    let remote = Arc::new(MemoryEventLog::new());
    remote
        .set_remote(RemoteSnapshot {
            instrument_id: "tok".to_string(),
            captured_at: 105,
            bids: vec![PriceLevel::new(d(10), d(6))],
            asks: vec![PriceLevel::new(d(11), d(2))],
        })
        .await;

    let settings = EngineSettings {
        window: ReplayWindow::new(10, 10),
        ..EngineSettings::default()
    };
    let engine = DivergenceEngine::new(store, remote, settings);
    let report = engine
        .run_cycle(&[InstrumentTarget::new("tok")], &CancellationToken::new())
        .await?;

    let InstrumentReport::Scored(divergence) = &report.instruments[0] else {
        panic!("expected a scored instrument");
    };
    assert_eq!(divergence.bids.distance, 0.0);
    assert_eq!(divergence.bids.event_time, Some(105));
    assert_eq!(divergence.asks.distance, 0.0);
    // the ask delta at 400 is beyond the window
    assert_eq!(divergence.events_applied, 2);
    Ok(())
}
