// Library exports for book-divergence

pub mod error;

pub mod config; // Configuration management

pub mod orderbook; // Book model, event replay and time windows

pub mod analytics; // Distance scoring, candidate selection and statistics

pub mod collector; // Event log and remote snapshot sources

pub mod report; // Per-cycle reports (JSON and markdown)

pub use error::{DivergenceError, Result, SourceError};
