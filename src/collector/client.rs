//! Remote books HTTP client
//!
//! Fetches authoritative order books with `POST {base_url}/books`, one entry
//! per token id. Requests go through a client-side rate limiter.

use crate::collector::rate_limiter::RequestLimiter;
use crate::collector::types::{BookRequest, BookResponse};
use crate::collector::RemoteSnapshotSource;
use crate::error::SourceError;
use crate::orderbook::RemoteSnapshot;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default remote books API
pub const DEFAULT_BASE_URL: &str = "https://clob.polymarket.com";

/// Default requests per second
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

#[derive(Clone)]
pub struct BooksClient {
    client: Client,
    base_url: String,
    limiter: Arc<RequestLimiter>,
}

impl std::fmt::Debug for BooksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BooksClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BooksClient {
    /// Create a client with a 10 second request timeout
    pub fn new(base_url: &str, requests_per_second: u32) -> Result<Self, SourceError> {
        Self::with_timeout(base_url, requests_per_second, Duration::from_secs(10))
    }

    pub fn with_timeout(
        base_url: &str,
        requests_per_second: u32,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("book-divergence/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter: Arc::new(RequestLimiter::per_second(requests_per_second)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch books for several instruments in one request
    pub async fn fetch_books(
        &self,
        instrument_ids: &[String],
    ) -> Result<Vec<RemoteSnapshot>, SourceError> {
        self.limiter.wait().await?;

        let body: Vec<BookRequest> = instrument_ids
            .iter()
            .map(|id| BookRequest {
                token_id: id.clone(),
            })
            .collect();

        let url = format!("{}/books", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let books: Vec<BookResponse> = response.json().await?;
        debug!(
            requested = instrument_ids.len(),
            received = books.len(),
            "Fetched remote books"
        );

        books.into_iter().map(RemoteSnapshot::try_from).collect()
    }
}

impl RemoteSnapshotSource for BooksClient {
    async fn remote_snapshot(&self, instrument_id: &str) -> Result<RemoteSnapshot, SourceError> {
        self.fetch_books(&[instrument_id.to_string()])
            .await?
            .into_iter()
            .find(|book| book.instrument_id == instrument_id)
            .ok_or_else(|| SourceError::NotFound(format!("no remote book for {}", instrument_id)))
    }

    async fn remote_snapshots(
        &self,
        instrument_ids: &[String],
    ) -> Result<Vec<RemoteSnapshot>, SourceError> {
        if instrument_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_books(instrument_ids).await
    }
}
