use thiserror::Error;

#[derive(Error, Debug)]
pub enum DivergenceError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Out of order event: event_time {received} follows {previous}")]
    OutOfOrderEvent { previous: i64, received: i64 },

    #[error("Collaborator failure for {instrument_id}: {source}")]
    Collaborator {
        instrument_id: String,
        source: SourceError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cycle cancelled")]
    Cancelled,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DivergenceError {
    /// Failures that only void one instrument's cycle; the service carries on.
    pub fn is_instrument_scoped(&self) -> bool {
        matches!(
            self,
            DivergenceError::MalformedEvent(_)
                | DivergenceError::OutOfOrderEvent { .. }
                | DivergenceError::Collaborator { .. }
                | DivergenceError::Internal(_)
        )
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            DivergenceError::MalformedEvent(_) => "malformed_event",
            DivergenceError::OutOfOrderEvent { .. } => "out_of_order_event",
            DivergenceError::Collaborator { .. } => "collaborator_failure",
            DivergenceError::Config(_) => "config",
            DivergenceError::Cancelled => "cancelled",
            DivergenceError::Json(_) => "json",
            DivergenceError::Internal(_) => "internal",
        }
    }

    pub(crate) fn collaborator(instrument_id: &str, source: SourceError) -> Self {
        DivergenceError::Collaborator {
            instrument_id: instrument_id.to_string(),
            source,
        }
    }
}

/// Errors raised by the event log and remote snapshot collaborators
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Connection(_) | SourceError::RateLimited(_))
    }
}

#[cfg(feature = "remote_books")]
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Connection("Request to the books API timed out".to_string())
        } else if err.is_connect() {
            SourceError::Connection("Failed to connect to the books API".to_string())
        } else if err.is_decode() {
            SourceError::Parse(format!("Books API returned an unreadable body: {}", err))
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => SourceError::RateLimited(
                    "Too many requests to the books API".to_string(),
                ),
                404 => SourceError::NotFound(format!("Books API returned {}", status)),
                500..=599 => SourceError::Connection(format!(
                    "Books API server error (HTTP {})",
                    status.as_u16()
                )),
                _ => SourceError::Connection(format!("HTTP error: {}", status)),
            }
        } else {
            SourceError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON parsing failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, DivergenceError>;
