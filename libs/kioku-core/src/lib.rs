//! Core flashcard library for the kioku study app.
//!
//! Provides:
//! - SM-2 spaced repetition scheduling
//! - Card/deck data model with functional updates
//! - Study session queue management
//! - Statistics (retention, streaks, forecasts)
//! - Deck import/export (JSON and CSV)
//! - Vocabulary and kanji conversion into card drafts

pub mod convert;
pub mod error;
pub mod io;
pub mod session;
pub mod sm2;
pub mod stats;
pub mod types;

pub use error::{ImportError, SelectorError};
pub use sm2::{
    calculate_next_state, days_overdue, determine_status, is_due, is_new, preview_intervals,
    IntervalPreview,
};
pub use types::{
    generate_id, CardDirection, CardDraft, CardSource, CardState, CardStatus, DailyStats, Deck,
    DeckSettings, ExportData, Flashcard, Rating, ReviewLog, SessionConfig, SessionQueue,
    SourceKind, DEFAULT_EASE_FACTOR, EXPORT_VERSION,
};
