// Distance metric properties

use book_divergence::analytics::{ordered_distance, side_distance, DistanceMetric};
use book_divergence::orderbook::{OrderBook, PriceLevel, RemoteSnapshot, Side};
use rust_decimal::Decimal;
use std::str::FromStr;

const METRICS: [DistanceMetric; 2] = [DistanceMetric::Attenuated, DistanceMetric::Plain];

fn lv(price: &str, size: &str) -> PriceLevel {
    PriceLevel::new(Decimal::from_str(price).unwrap(), Decimal::from_str(size).unwrap())
}

fn ladders() -> Vec<Vec<PriceLevel>> {
    vec![
        vec![],
        vec![lv("0.50", "10")],
        vec![lv("0.50", "10"), lv("0.49", "4"), lv("0.45", "100")],
        vec![lv("0.51", "3"), lv("0.49", "4.5"), lv("0.40", "1")],
    ]
}

#[test]
fn test_distance_is_non_negative_and_symmetric() {
    for metric in METRICS {
        for a in ladders() {
            for b in ladders() {
                let ab = ordered_distance(&a, &b, metric);
                let ba = ordered_distance(&b, &a, metric);
                assert!(ab >= 0.0);
                assert_eq!(ab, ba);
            }
        }
    }
}

#[test]
fn test_equal_length_distance_is_zero_only_when_identical() {
    let a = vec![lv("0.50", "10"), lv("0.49", "4")];
    let b = vec![lv("0.50", "10"), lv("0.49", "5")];

    for metric in METRICS {
        assert_eq!(ordered_distance(&a, &a, metric), 0.0);
        assert!(ordered_distance(&a, &b, metric) > 0.0);
    }
}

#[test]
fn test_attenuation_takes_root_by_rank() {
    // d = 0.25 at rank 0 and at rank 3
    let top = (
        vec![lv("1", "1.5"), lv("0.9", "1"), lv("0.8", "1"), lv("0.7", "1")],
        vec![lv("1", "1"), lv("0.9", "1"), lv("0.8", "1"), lv("0.7", "1")],
    );
    let deep = (
        vec![lv("1", "1"), lv("0.9", "1"), lv("0.8", "1"), lv("0.7", "1.5")],
        vec![lv("1", "1"), lv("0.9", "1"), lv("0.8", "1"), lv("0.7", "1")],
    );

    let plain_top = ordered_distance(&top.0, &top.1, DistanceMetric::Plain);
    let plain_deep = ordered_distance(&deep.0, &deep.1, DistanceMetric::Plain);
    assert_eq!(plain_top, plain_deep);

    // rank i contributes d^(1/(i+1))
    let att_top = ordered_distance(&top.0, &top.1, DistanceMetric::Attenuated);
    let att_deep = ordered_distance(&deep.0, &deep.1, DistanceMetric::Attenuated);
    assert!((att_top - 0.25).abs() < 1e-12);
    assert!((att_deep - 0.25f64.powf(0.25)).abs() < 1e-12);
}

#[test]
fn test_side_distance_ignores_depleted_local_levels() {
    let mut local = OrderBook::from_levels(&[lv("0.50", "10"), lv("0.49", "4")], &[]);
    local
        .apply_delta(Side::Bid, Decimal::from_str("0.55").unwrap(), Decimal::from(-2))
        .unwrap();

    let remote = RemoteSnapshot {
        instrument_id: "tok".to_string(),
        captured_at: 0,
        bids: vec![lv("0.49", "4"), lv("0.50", "10")],
        asks: vec![],
    };

    for metric in METRICS {
        assert_eq!(side_distance(&local, &remote, Side::Bid, metric), 0.0);
        assert_eq!(side_distance(&local, &remote, Side::Ask, metric), 0.0);
    }
}
