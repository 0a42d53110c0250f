// Cycle report rendering

use book_divergence::analytics::{
    summarize_distances, DistanceMetric, DivergenceResult, InstrumentDivergence, PercentileSet,
    SideStatistics,
};
use book_divergence::orderbook::{EmptyWindowReason, ReplayWindow, Side};
use book_divergence::report::{render_json, render_markdown, CycleReport, InstrumentReport};
use book_divergence::DivergenceError;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

fn divergence(instrument_id: &str, bid: Option<f64>) -> InstrumentDivergence {
    let mut bids = DivergenceResult::empty(instrument_id, Side::Bid);
    let mut asks = DivergenceResult::empty(instrument_id, Side::Ask);
    if let Some(distance) = bid {
        bids.had_candidates = true;
        bids.distance = distance;
        bids.event_time = Some(1_000);
        asks.had_candidates = true;
        asks.event_time = Some(1_000);
    }
    InstrumentDivergence {
        instrument_id: instrument_id.to_string(),
        target_time: 1_000,
        bids,
        asks,
        empty_reason: bid.is_none().then_some(EmptyWindowReason::NoCandidates),
        events_applied: 3,
    }
}

fn sample_report() -> CycleReport {
    let failure = DivergenceError::OutOfOrderEvent {
        previous: 20,
        received: 10,
    };
    CycleReport {
        cycle_id: Uuid::nil(),
        started_at: Utc.timestamp_millis_opt(0).unwrap(),
        completed_at: Utc.timestamp_millis_opt(250).unwrap(),
        window: ReplayWindow::new(1000, 1000),
        metric: DistanceMetric::Attenuated,
        percentile_set: PercentileSet::Canonical,
        instruments: vec![
            InstrumentReport::Scored(divergence("alpha", Some(0.5))),
            InstrumentReport::Scored(divergence("beta", None)),
            InstrumentReport::failed("gamma", &failure),
        ],
        bids: summarize_distances(&[0.5], PercentileSet::Canonical),
        asks: SideStatistics::NoData,
        scored: 2,
        empty_windows: 1,
        failed: 1,
    }
}

#[test]
fn test_markdown_contains_every_section() {
    let markdown = render_markdown(&sample_report());

    assert!(markdown.starts_with("# Divergence Cycle\n"));
    assert!(markdown.contains("| Duration | 250 ms |"));
    assert!(markdown.contains("| Metric | attenuated |"));
    assert!(markdown.contains("2 scored, 1 empty windows, 1 failed"));
    assert!(markdown.contains("## Distance Statistics: bids"));
    assert!(markdown.contains("## Distance Statistics: asks"));
    assert!(markdown.contains("No data"));
    assert!(markdown.contains("| alpha | scored |"));
    assert!(markdown.contains("| no candidates | no candidates |"));
    assert!(markdown.contains("| gamma | failed (out_of_order_event) |"));
}

#[test]
fn test_json_report_shape() {
    let report = sample_report();
    let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

    assert_eq!(json["metric"], "attenuated");
    assert_eq!(json["asks"]["status"], "no_data");
    assert_eq!(json["bids"]["status"], "summary");
    assert_eq!(json["bids"]["count"], 1);

    let instruments = json["instruments"].as_array().unwrap();
    assert_eq!(instruments.len(), 3);
    assert_eq!(instruments[0]["status"], "scored");
    assert_eq!(instruments[0]["bids"]["had_candidates"], true);
    assert_eq!(instruments[1]["empty_reason"], "no_candidates");
    assert_eq!(instruments[2]["status"], "failed");
    assert_eq!(instruments[2]["error_type"], "out_of_order_event");
}

#[test]
fn test_report_lookup_by_instrument() {
    let report = sample_report();
    assert!(report.instrument("gamma").unwrap().is_failed());
    assert!(!report.instrument("alpha").unwrap().is_failed());
    assert!(report.instrument("delta").is_none());
}
