//! SQLite persistence for the kioku flashcard core.
//!
//! Four collections (decks, cards, reviews, daily_stats) with secondary
//! indexes for deck, due-date, status, and compound lookups. Multi-row
//! operations are transactional: a deck delete takes its cards, reviews,
//! and stats rows with it atomically, and recording a review updates the
//! card, appends the log, and bumps the daily counters as one unit.

pub mod error;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{CardStore, DeckStore, ReviewOutcome, ReviewStore, SqliteStore, StatsStore};
