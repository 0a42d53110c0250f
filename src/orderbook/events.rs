//! Book events as recorded by the collector
//!
//! `RawEvent` is the stored form (strings straight from the market feed).
//! `BookEvent` is the validated form the replayer applies. Decoding is done
//! lazily, one event at a time, so a malformed record aborts replay exactly
//! where it is met.

use crate::error::{DivergenceError, Result};
use crate::orderbook::types::{OrderBook, PriceLevel, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const BOOK_EVENT: &str = "book";
pub const PRICE_CHANGE_EVENT: &str = "price_change";
pub const LAST_TRADE_PRICE_EVENT: &str = "last_trade_price";

/// Validated book event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookEvent {
    /// Server-assigned time (milliseconds since Unix epoch)
    pub event_time: i64,

    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Full replacement of both sides
    Snapshot {
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },

    /// Price change: adds `size` to the level
    Delta {
        side: Side,
        price: Decimal,
        size: Decimal,
    },

    /// Last trade price: subtracts `size` from the level
    Trade {
        side: Side,
        price: Decimal,
        size: Decimal,
    },
}

impl BookEvent {
    pub fn delta(side: Side, price: Decimal, size: Decimal, event_time: i64) -> Self {
        Self {
            event_time,
            kind: EventKind::Delta { side, price, size },
        }
    }

    pub fn trade(side: Side, price: Decimal, size: Decimal, event_time: i64) -> Self {
        Self {
            event_time,
            kind: EventKind::Trade { side, price, size },
        }
    }

    pub fn snapshot(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>, event_time: i64) -> Self {
        Self {
            event_time,
            kind: EventKind::Snapshot { bids, asks },
        }
    }

    /// Apply this event to `book`
    pub fn apply(&self, book: &mut OrderBook) -> Result<()> {
        match &self.kind {
            EventKind::Snapshot { bids, asks } => {
                book.set_snapshot(bids, asks);
                Ok(())
            }
            EventKind::Delta { side, price, size } => book.apply_delta(*side, *price, *size),
            EventKind::Trade { side, price, size } => book.apply_delta(*side, *price, -*size),
        }
    }
}

/// Anything the replayer can turn into a [`BookEvent`]
pub trait IntoBookEvent {
    fn into_book_event(self) -> Result<BookEvent>;
}

impl IntoBookEvent for BookEvent {
    fn into_book_event(self) -> Result<BookEvent> {
        Ok(self)
    }
}

/// Level as delivered by the feed: decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLevel {
    pub price: String,
    pub size: String,
}

impl RawLevel {
    pub fn decode(&self) -> Result<PriceLevel> {
        Ok(PriceLevel::new(
            parse_decimal("price", &self.price)?,
            parse_decimal("size", &self.size)?,
        ))
    }
}

/// Stored event record
///
/// `event_type` is one of `book`, `price_change`, `last_trade_price`.
/// `book` records carry `bids`/`asks`; the others carry `side`, `price` and `size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bids: Option<Vec<RawLevel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asks: Option<Vec<RawLevel>>,

    /// Server time (milliseconds since Unix epoch)
    pub server_time: Option<i64>,
}

impl RawEvent {
    pub fn price_change(side: &str, price: &str, size: &str, server_time: i64) -> Self {
        Self::level_event(PRICE_CHANGE_EVENT, side, price, size, server_time)
    }

    pub fn last_trade_price(side: &str, price: &str, size: &str, server_time: i64) -> Self {
        Self::level_event(LAST_TRADE_PRICE_EVENT, side, price, size, server_time)
    }

    pub fn book(bids: Vec<RawLevel>, asks: Vec<RawLevel>, server_time: i64) -> Self {
        Self {
            event_type: BOOK_EVENT.to_string(),
            side: None,
            price: None,
            size: None,
            bids: Some(bids),
            asks: Some(asks),
            server_time: Some(server_time),
        }
    }

    fn level_event(
        event_type: &str,
        side: &str,
        price: &str,
        size: &str,
        server_time: i64,
    ) -> Self {
        Self {
            event_type: event_type.to_string(),
            side: Some(side.to_string()),
            price: Some(price.to_string()),
            size: Some(size.to_string()),
            bids: None,
            asks: None,
            server_time: Some(server_time),
        }
    }

    pub fn is_book(&self) -> bool {
        self.event_type == BOOK_EVENT
    }

    /// Decode the `book` levels into a full order book
    pub fn decode_book(&self) -> Result<OrderBook> {
        let bids = decode_levels("bids", self.bids.as_deref())?;
        let asks = decode_levels("asks", self.asks.as_deref())?;
        Ok(OrderBook::from_levels(&bids, &asks))
    }

    fn decode_level_fields(&self) -> Result<(Side, Decimal, Decimal)> {
        let label = required(&self.side, "side", &self.event_type)?;
        let side = Side::from_label(label).ok_or_else(|| {
            DivergenceError::MalformedEvent(format!(
                "invalid side {:?} in {}",
                label, self.event_type
            ))
        })?;
        let price = parse_decimal("price", required(&self.price, "price", &self.event_type)?)?;
        let size = parse_decimal("size", required(&self.size, "size", &self.event_type)?)?;
        Ok((side, price, size))
    }
}

impl IntoBookEvent for RawEvent {
    fn into_book_event(self) -> Result<BookEvent> {
        let event_time = self.server_time.ok_or_else(|| {
            DivergenceError::MalformedEvent(format!("{} without server_time", self.event_type))
        })?;

        let kind = match self.event_type.as_str() {
            BOOK_EVENT => EventKind::Snapshot {
                bids: decode_levels("bids", self.bids.as_deref())?,
                asks: decode_levels("asks", self.asks.as_deref())?,
            },
            PRICE_CHANGE_EVENT => {
                let (side, price, size) = self.decode_level_fields()?;
                EventKind::Delta { side, price, size }
            }
            LAST_TRADE_PRICE_EVENT => {
                let (side, price, size) = self.decode_level_fields()?;
                EventKind::Trade { side, price, size }
            }
            other => {
                return Err(DivergenceError::MalformedEvent(format!(
                    "unknown event type {:?}",
                    other
                )))
            }
        };

        Ok(BookEvent { event_time, kind })
    }
}

impl From<&PriceLevel> for RawLevel {
    fn from(level: &PriceLevel) -> Self {
        Self {
            price: level.price.to_string(),
            size: level.size.to_string(),
        }
    }
}

impl From<&BookEvent> for RawEvent {
    fn from(event: &BookEvent) -> Self {
        let side_label = |side: &Side| match side {
            Side::Bid => "BUY",
            Side::Ask => "SELL",
        };
        match &event.kind {
            EventKind::Snapshot { bids, asks } => RawEvent::book(
                bids.iter().map(RawLevel::from).collect(),
                asks.iter().map(RawLevel::from).collect(),
                event.event_time,
            ),
            EventKind::Delta { side, price, size } => RawEvent::price_change(
                side_label(side),
                &price.to_string(),
                &size.to_string(),
                event.event_time,
            ),
            EventKind::Trade { side, price, size } => RawEvent::last_trade_price(
                side_label(side),
                &price.to_string(),
                &size.to_string(),
                event.event_time,
            ),
        }
    }
}

fn required<'a>(field: &'a Option<String>, name: &str, event_type: &str) -> Result<&'a str> {
    field.as_deref().ok_or_else(|| {
        DivergenceError::MalformedEvent(format!("{} without {}", event_type, name))
    })
}

fn parse_decimal(name: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim()).map_err(|e| {
        DivergenceError::MalformedEvent(format!("non-numeric {} {:?}: {}", name, value, e))
    })
}

fn decode_levels(name: &str, levels: Option<&[RawLevel]>) -> Result<Vec<PriceLevel>> {
    levels
        .ok_or_else(|| DivergenceError::MalformedEvent(format!("book without {}", name)))?
        .iter()
        .map(RawLevel::decode)
        .collect()
}
