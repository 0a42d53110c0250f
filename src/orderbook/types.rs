//! Order book data structures and types
//!
//! Core entities shared by replay, scoring and reporting.

use crate::error::{DivergenceError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side, best level is the highest price
    Bid,

    /// Sell side, best level is the lowest price
    Ask,
}

impl Side {
    /// Parse an exchange side label.
    ///
    /// `BUY`/`BID` map to bids and `SELL`/`ASK` to asks (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "BUY" | "BID" => Some(Side::Bid),
            "SELL" | "ASK" => Some(Side::Ask),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bids"),
            Side::Ask => write!(f, "asks"),
        }
    }
}

/// A single (price, size) level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Reconstructed order book state
///
/// Bids and asks are independent `price → size` maps. Levels whose size went to
/// zero or below during replay stay in the map; they are dropped when the book
/// is ordered for scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Bid levels: price → size
    pub bids: BTreeMap<Decimal, Decimal>,

    /// Ask levels: price → size
    pub asks: BTreeMap<Decimal, Decimal>,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from level lists (later duplicates overwrite earlier ones)
    pub fn from_levels(bids: &[PriceLevel], asks: &[PriceLevel]) -> Self {
        let mut book = Self::new();
        book.set_snapshot(bids, asks);
        book
    }

    /// Replace the whole book
    pub fn set_snapshot(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        self.bids = bids.iter().map(|l| (l.price, l.size)).collect();
        self.asks = asks.iter().map(|l| (l.price, l.size)).collect();
    }

    /// Add `signed_size` to the level at `price`, creating it at zero if absent.
    ///
    /// Non-positive results are kept; a later event may bring the level back.
    /// A sum outside the decimal range is a malformed event and leaves the
    /// level untouched.
    pub fn apply_delta(&mut self, side: Side, price: Decimal, signed_size: Decimal) -> Result<()> {
        let level = self.side_mut(side).entry(price).or_insert(Decimal::ZERO);
        let current = *level;
        *level = current.checked_add(signed_size).ok_or_else(|| {
            DivergenceError::MalformedEvent(format!(
                "size overflow at {} {}: {} + {}",
                side, price, current, signed_size
            ))
        })?;
        Ok(())
    }

    /// Raw size stored at `price`, including depleted levels
    pub fn level(&self, side: Side, price: Decimal) -> Option<Decimal> {
        self.side(side).get(&price).copied()
    }

    pub fn side(&self, side: Side) -> &BTreeMap<Decimal, Decimal> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, Decimal> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Live levels in market order: bids descending, asks ascending.
    ///
    /// Levels with size ≤ 0 are treated as absent.
    pub fn ordered_levels(&self, side: Side) -> Vec<PriceLevel> {
        let live = |(price, size): (&Decimal, &Decimal)| {
            (*size > Decimal::ZERO).then(|| PriceLevel::new(*price, *size))
        };
        match side {
            // BTreeMap is ascending, so bids are walked from the back
            Side::Bid => self.bids.iter().rev().filter_map(live).collect(),
            Side::Ask => self.asks.iter().filter_map(live).collect(),
        }
    }

    /// Number of live levels on a side
    pub fn depth(&self, side: Side) -> usize {
        self.side(side)
            .values()
            .filter(|size| **size > Decimal::ZERO)
            .count()
    }

    /// Get best bid price (highest live bid)
    pub fn best_bid(&self) -> Option<Decimal> {
        self.ordered_levels(Side::Bid).first().map(|l| l.price)
    }

    /// Get best ask price (lowest live ask)
    pub fn best_ask(&self) -> Option<Decimal> {
        self.ordered_levels(Side::Ask).first().map(|l| l.price)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Snapshot the replay starts from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSnapshot {
    /// Server time of the snapshot (milliseconds since Unix epoch)
    pub snapshot_time: i64,

    pub book: OrderBook,
}

/// Authoritative book fetched out-of-band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    pub instrument_id: String,

    /// Capture time (milliseconds since Unix epoch)
    pub captured_at: i64,

    pub bids: Vec<PriceLevel>,

    pub asks: Vec<PriceLevel>,
}

impl RemoteSnapshot {
    /// Levels in market order, dropping non-positive sizes
    pub fn ordered_levels(&self, side: Side) -> Vec<PriceLevel> {
        let mut levels: Vec<PriceLevel> = match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
        .iter()
        .copied()
        .filter(|l| l.size > Decimal::ZERO)
        .collect();

        match side {
            Side::Bid => levels.sort_by(|a, b| b.price.cmp(&a.price)),
            Side::Ask => levels.sort_by(|a, b| a.price.cmp(&b.price)),
        }
        levels
    }
}
