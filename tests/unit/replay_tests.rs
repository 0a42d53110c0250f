// Replay and window selection properties

use book_divergence::orderbook::*;
use book_divergence::DivergenceError;
use rust_decimal::Decimal;
use std::cell::Cell;
use std::rc::Rc;

fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

fn base() -> BaseSnapshot {
    BaseSnapshot {
        snapshot_time: 0,
        book: OrderBook::from_levels(
            &[PriceLevel::new(d(10), d(5)), PriceLevel::new(d(9), d(2))],
            &[PriceLevel::new(d(11), d(4))],
        ),
    }
}

fn sample_events() -> Vec<BookEvent> {
    vec![
        BookEvent::delta(Side::Bid, d(10), d(3), 10),
        BookEvent::trade(Side::Ask, d(11), d(1), 20),
        BookEvent::delta(Side::Bid, d(8), d(7), 20),
        BookEvent::trade(Side::Bid, d(9), d(2), 35),
        BookEvent::delta(Side::Ask, d(12), d(6), 50),
    ]
}

/// Source that counts how many events were pulled from it
struct CountingSource {
    events: std::vec::IntoIter<BookEvent>,
    pulled: Rc<Cell<usize>>,
}

impl Iterator for CountingSource {
    type Item = BookEvent;

    fn next(&mut self) -> Option<BookEvent> {
        let next = self.events.next();
        if next.is_some() {
            self.pulled.set(self.pulled.get() + 1);
        }
        next
    }
}

#[test]
fn test_replay_is_deterministic() {
    let first: Vec<_> = BookReplayer::new(base(), sample_events())
        .collect::<Result<_, _>>()
        .unwrap();
    let second: Vec<CandidateState> = BookReplayer::new(base(), sample_events())
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[test]
fn test_delta_then_trade_restores_book() {
    let events = vec![
        BookEvent::delta(Side::Bid, d(10), d(4), 10),
        BookEvent::trade(Side::Bid, d(10), d(4), 11),
    ];
    let states: Vec<_> = BookReplayer::new(base(), events)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(states[1].book, base().book);
}

#[test]
fn test_candidates_are_independent_copies() {
    let states: Vec<_> = BookReplayer::new(base(), sample_events())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    // first candidate only saw the first delta
    assert_eq!(states[0].book.level(Side::Bid, d(10)), Some(d(8)));
    assert_eq!(states[0].book.level(Side::Bid, d(8)), None);
    assert_eq!(states[4].book.level(Side::Ask, d(12)), Some(d(6)));
}

#[test]
fn test_replay_stops_at_first_out_of_order_event() {
    let events = vec![
        BookEvent::delta(Side::Bid, d(10), d(1), 30),
        BookEvent::delta(Side::Bid, d(10), d(1), 20),
        BookEvent::delta(Side::Bid, d(10), d(1), 40),
    ];
    let mut replayer = BookReplayer::new(base(), events);

    assert!(replayer.next().unwrap().is_ok());
    assert!(matches!(
        replayer.next(),
        Some(Err(DivergenceError::OutOfOrderEvent {
            previous: 30,
            received: 20
        }))
    ));
    assert!(replayer.next().is_none());
    assert_eq!(replayer.applied(), 1);
}

#[test]
fn test_window_selection_bounds_work() {
    let pulled = Rc::new(Cell::new(0));
    let mut events: Vec<BookEvent> = (1..=1000)
        .map(|t| BookEvent::delta(Side::Bid, d(10), d(1), t * 10))
        .collect();
    events.push(BookEvent::delta(Side::Bid, d(10), d(1), 100_000));

    let source = CountingSource {
        events: events.into_iter(),
        pulled: Rc::clone(&pulled),
    };
    let mut replayer = BookReplayer::new(base(), source);
    let selector = WindowSelector::new(100, ReplayWindow::new(20, 20));
    let outcome = selector.select(&mut replayer).unwrap();

    // events at 80..=120 fall in the window; 130 is peeked, never applied
    assert_eq!(outcome.candidates().len(), 5);
    assert_eq!(replayer.applied(), 12);
    assert_eq!(pulled.get(), 13);
}

#[test]
fn test_window_outcomes_are_distinguished() {
    let selector = WindowSelector::new(100, ReplayWindow::new(5, 5));

    let early = vec![BookEvent::delta(Side::Bid, d(10), d(1), 10)];
    let mut exhausted = BookReplayer::new(base(), early);
    assert_eq!(
        selector.select(&mut exhausted).unwrap(),
        WindowOutcome::Empty(EmptyWindowReason::ReplayExhausted)
    );

    let mut gap = BookReplayer::new(
        base(),
        vec![
            BookEvent::delta(Side::Bid, d(10), d(1), 10),
            BookEvent::delta(Side::Bid, d(10), d(1), 500),
        ],
    );
    assert_eq!(
        selector.select(&mut gap).unwrap(),
        WindowOutcome::Empty(EmptyWindowReason::NoCandidates)
    );
}
