//! Remote books API type definitions
//!
//! # Example Response
//! ```json
//! [{
//!   "market": "0x5f65...",
//!   "asset_id": "71321045679252212594626385532706912750332728571942532289631379312455583992563",
//!   "timestamp": "1757908892351",
//!   "bids": [{"price": "0.48", "size": "30"}],
//!   "asks": [{"price": "0.52", "size": "25"}]
//! }]
//! ```

use crate::error::SourceError;
use crate::orderbook::{PriceLevel, RawLevel, RemoteSnapshot};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Request body entry for `POST /books`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRequest {
    pub token_id: String,
}

/// One book in the `/books` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub asset_id: String,

    #[serde(default)]
    pub market: Option<String>,

    /// Epoch milliseconds, or `%Y-%m-%dT%H:%M:%SZ`
    pub timestamp: String,

    pub bids: Vec<RawLevel>,

    pub asks: Vec<RawLevel>,
}

/// Parse the capture time into epoch milliseconds
pub fn parse_timestamp(raw: &str) -> Result<i64, SourceError> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .map_err(|e| SourceError::Parse(format!("invalid timestamp {:?}: {}", raw, e)));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
        .map(|dt| dt.and_utc().timestamp_millis())
        .map_err(|e| SourceError::Parse(format!("invalid timestamp {:?}: {}", raw, e)))
}

impl TryFrom<BookResponse> for RemoteSnapshot {
    type Error = SourceError;

    fn try_from(book: BookResponse) -> Result<Self, Self::Error> {
        let levels = |raw: &[RawLevel]| -> Result<Vec<PriceLevel>, SourceError> {
            raw.iter()
                .map(|l| l.decode().map_err(|e| SourceError::Parse(e.to_string())))
                .collect()
        };

        Ok(RemoteSnapshot {
            captured_at: parse_timestamp(&book.timestamp)?,
            bids: levels(&book.bids)?,
            asks: levels(&book.asks)?,
            instrument_id: book.asset_id,
        })
    }
}
