// Cross-instrument aggregation

use book_divergence::analytics::{
    DistanceAggregator, DivergenceResult, PercentileSet, SideStatistics,
};
use book_divergence::orderbook::Side;

fn scored(instrument_id: &str, side: Side, distance: f64) -> DivergenceResult {
    let mut result = DivergenceResult::empty(instrument_id, side);
    result.had_candidates = true;
    result.distance = distance;
    result
}

#[test]
fn test_many_instruments_reduce_to_one_summary_per_side() {
    let mut aggregator = DistanceAggregator::new(PercentileSet::Canonical);
    for i in 0..1_000 {
        let id = format!("tok-{}", i);
        aggregator.record(
            &scored(&id, Side::Bid, (i % 10) as f64),
            &scored(&id, Side::Ask, 1.0),
        );
    }

    let stats = aggregator.summarize();
    let bids = stats.bids.summary().unwrap();
    let asks = stats.asks.summary().unwrap();

    assert_eq!(bids.count, 1_000);
    assert!((bids.mean - 4.5).abs() < 1e-9);
    assert!((bids.variance - 8.25).abs() < 1e-9);
    assert!(bids.third_central_moment.abs() < 1e-9);
    assert_eq!(bids.min, 0.0);
    assert_eq!(bids.max, 9.0);

    // constant sample: no spread
    assert_eq!(asks.variance, 0.0);
    assert!(asks.percentiles.iter().all(|p| p.value == 1.0));
    assert_eq!(stats.empty_windows, 0);
}

#[test]
fn test_only_empty_windows_is_no_data() {
    let mut aggregator = DistanceAggregator::new(PercentileSet::Extended);
    aggregator.record(
        &DivergenceResult::empty("a", Side::Bid),
        &DivergenceResult::empty("a", Side::Ask),
    );

    let stats = aggregator.summarize();
    assert!(aggregator.is_empty());
    assert_eq!(stats.bids, SideStatistics::NoData);
    assert_eq!(stats.asks, SideStatistics::NoData);
    assert_eq!(stats.empty_windows, 1);
}

#[test]
fn test_one_sided_window_counts_as_empty() {
    let mut aggregator = DistanceAggregator::new(PercentileSet::Canonical);
    aggregator.record(&scored("a", Side::Bid, 0.5), &DivergenceResult::empty("a", Side::Ask));

    let stats = aggregator.summarize();
    assert_eq!(stats.bids.summary().unwrap().count, 1);
    assert_eq!(stats.asks, SideStatistics::NoData);
    assert_eq!(stats.empty_windows, 1);
}
