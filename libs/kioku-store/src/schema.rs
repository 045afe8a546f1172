//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the flashcard database.
///
/// The secondary indexes back the storage contract's lookups: by deck, by
/// due date, by status, and the compound (deck, status) and (date, deck)
/// pairs (the latter is the daily_stats primary key).
pub const SCHEMA: &str = r#"
-- Decks; names are unique case-insensitively
CREATE TABLE IF NOT EXISTS decks (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT,
    new_cards_per_day INTEGER NOT NULL DEFAULT 20,
    reviews_per_day INTEGER NOT NULL DEFAULT 200,
    default_direction TEXT NOT NULL DEFAULT 'back_to_front',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Cards with flattened scheduling state
CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    deck_id TEXT NOT NULL REFERENCES decks(id),
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    front_reading TEXT,
    back_reading TEXT,
    notes TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    source TEXT NOT NULL,
    source_kind TEXT NOT NULL,
    source_key TEXT,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    interval_days INTEGER NOT NULL DEFAULT 0,
    repetitions INTEGER NOT NULL DEFAULT 0,
    due_date TEXT NOT NULL,
    last_review TEXT,
    status TEXT NOT NULL DEFAULT 'new',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Immutable review history with before/after state snapshots
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    card_id TEXT NOT NULL REFERENCES cards(id),
    deck_id TEXT NOT NULL REFERENCES decks(id),
    rating INTEGER NOT NULL,
    response_time_ms INTEGER NOT NULL,
    ease_before REAL NOT NULL,
    interval_before INTEGER NOT NULL,
    repetitions_before INTEGER NOT NULL,
    due_before TEXT NOT NULL,
    last_review_before TEXT,
    ease_after REAL NOT NULL,
    interval_after INTEGER NOT NULL,
    repetitions_after INTEGER NOT NULL,
    due_after TEXT NOT NULL,
    last_review_after TEXT,
    reviewed_at TEXT NOT NULL
);

-- Per-day, per-deck study counters
CREATE TABLE IF NOT EXISTS daily_stats (
    date TEXT NOT NULL,
    deck_id TEXT NOT NULL REFERENCES decks(id),
    reviewed INTEGER NOT NULL DEFAULT 0,
    new_learned INTEGER NOT NULL DEFAULT 0,
    correct INTEGER NOT NULL DEFAULT 0,
    incorrect INTEGER NOT NULL DEFAULT 0,
    study_time_ms INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (date, deck_id)
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(due_date);
CREATE INDEX IF NOT EXISTS idx_cards_status ON cards(status);
CREATE INDEX IF NOT EXISTS idx_cards_deck_status ON cards(deck_id, status);
CREATE INDEX IF NOT EXISTS idx_cards_source ON cards(deck_id, source_kind, source_key);
CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_id);
CREATE INDEX IF NOT EXISTS idx_reviews_deck ON reviews(deck_id);
CREATE INDEX IF NOT EXISTS idx_reviews_date ON reviews(reviewed_at);
CREATE INDEX IF NOT EXISTS idx_daily_stats_deck ON daily_stats(deck_id);
"#;

/// Record the schema version if not already present.
pub const INIT_SCHEMA_VERSION: &str = r#"
INSERT OR IGNORE INTO schema_version (version) VALUES (1);
"#;
