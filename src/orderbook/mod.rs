//! Local order book reconstruction
//!
//! - `types`: book model shared by replay and scoring
//! - `events`: recorded events and their validation
//! - `replay`: lazy, time-ordered replay from a base snapshot
//! - `window`: early-terminating window around a target timestamp

pub mod events;
pub mod replay;
pub mod types;
pub mod window;

pub use events::{BookEvent, EventKind, IntoBookEvent, RawEvent, RawLevel};
pub use replay::{BookReplayer, CandidateState};
pub use types::{BaseSnapshot, OrderBook, PriceLevel, RemoteSnapshot, Side};
pub use window::{EmptyWindowReason, ReplayWindow, WindowOutcome, WindowSelector};
