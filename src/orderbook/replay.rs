//! Lazy order book replay
//!
//! Starting from a base snapshot, events are applied strictly in `event_time`
//! order and a deep copy of the book is yielded after every event. Equal
//! timestamps keep arrival order and each still yields its own candidate.

use crate::error::{DivergenceError, Result};
use crate::orderbook::events::{BookEvent, IntoBookEvent};
use crate::orderbook::types::{BaseSnapshot, OrderBook};
use tracing::debug;

/// Book state captured right after one event was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateState {
    pub event_time: i64,
    pub book: OrderBook,
}

/// Single-pass replay over an ordered event source.
///
/// Iterating yields `Ok(CandidateState)` per applied event. The first error
/// (malformed or out-of-order event) is yielded once and the replay then ends.
pub struct BookReplayer<I> {
    book: OrderBook,
    source: I,
    pending: Option<BookEvent>,
    last_event_time: i64,
    applied: usize,
    finished: bool,
}

impl<I> BookReplayer<I>
where
    I: Iterator,
    I::Item: IntoBookEvent,
{
    pub fn new<S>(base: BaseSnapshot, events: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            book: base.book,
            source: events.into_iter(),
            pending: None,
            last_event_time: base.snapshot_time,
            applied: 0,
            finished: false,
        }
    }

    /// Time of the next event without applying it.
    ///
    /// Decodes (but does not apply) at most one event from the source.
    pub fn peek_event_time(&mut self) -> Result<Option<i64>> {
        if self.finished {
            return Ok(None);
        }
        if self.pending.is_none() {
            match self.source.next() {
                Some(raw) => match raw.into_book_event() {
                    Ok(event) => self.pending = Some(event),
                    Err(e) => {
                        self.finished = true;
                        return Err(e);
                    }
                },
                None => return Ok(None),
            }
        }
        Ok(self.pending.as_ref().map(|e| e.event_time))
    }

    /// Current working book
    pub fn current(&self) -> &OrderBook {
        &self.book
    }

    /// Number of events applied so far
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Time of the last applied event, or the base snapshot time
    pub fn last_event_time(&self) -> i64 {
        self.last_event_time
    }

    fn step(&mut self) -> Result<Option<CandidateState>> {
        if self.peek_event_time()?.is_none() {
            return Ok(None);
        }
        let Some(event) = self.pending.take() else {
            return Ok(None);
        };

        if event.event_time < self.last_event_time {
            return Err(DivergenceError::OutOfOrderEvent {
                previous: self.last_event_time,
                received: event.event_time,
            });
        }

        event.apply(&mut self.book)?;
        self.last_event_time = event.event_time;
        self.applied += 1;

        debug!(
            event_time = event.event_time,
            applied = self.applied,
            "Applied book event"
        );

        Ok(Some(CandidateState {
            event_time: event.event_time,
            book: self.book.clone(),
        }))
    }
}

impl<I> Iterator for BookReplayer<I>
where
    I: Iterator,
    I::Item: IntoBookEvent,
{
    type Item = Result<CandidateState>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.step() {
            Ok(Some(candidate)) => Some(Ok(candidate)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
