//! Repository pattern for flashcard persistence.
//!
//! `SqliteStore` owns the connection handle; callers open it explicitly and
//! may close or reopen it. Multi-row operations (deck and card cascades,
//! review recording) run inside a single transaction so readers never
//! observe partial state. Missing ids surface as `Ok(None)`; cascading
//! deletes are no-ops on missing rows.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use kioku_core::sm2::{calculate_next_state, is_new};
use kioku_core::types::{
    generate_id, CardDirection, CardDraft, CardState, CardStatus, DailyStats, Deck, DeckSettings,
    Flashcard, Rating, ReviewLog, SourceKind,
};

use crate::error::{Result, StoreError};
use crate::schema;

/// Repository for deck operations.
pub trait DeckStore {
    fn create_deck(
        &mut self,
        name: &str,
        description: Option<&str>,
        settings: Option<DeckSettings>,
        now: DateTime<Utc>,
    ) -> Result<Deck>;
    fn get_deck(&self, id: &str) -> Result<Option<Deck>>;
    fn get_deck_by_name(&self, name: &str) -> Result<Option<Deck>>;
    fn get_all_decks(&self) -> Result<Vec<Deck>>;
    /// Persist an updated deck value. Returns `None` when the deck no
    /// longer exists.
    fn update_deck(&mut self, deck: &Deck) -> Result<Option<Deck>>;
    /// Delete a deck together with its cards, their reviews, and its daily
    /// stats, atomically. No-op when the deck does not exist.
    fn delete_deck(&mut self, id: &str) -> Result<()>;
}

/// Repository for card operations.
pub trait CardStore {
    fn create_card(&mut self, draft: CardDraft, now: DateTime<Utc>) -> Result<Flashcard>;
    /// Batch create in one transaction.
    fn create_cards(&mut self, drafts: Vec<CardDraft>, now: DateTime<Utc>) -> Result<Vec<Flashcard>>;
    /// Insert-or-replace prebuilt cards (import path) in one transaction.
    fn upsert_cards(&mut self, cards: &[Flashcard]) -> Result<()>;
    fn get_card(&self, id: &str) -> Result<Option<Flashcard>>;
    fn get_cards_by_deck(&self, deck_id: &str) -> Result<Vec<Flashcard>>;
    fn get_all_cards(&self) -> Result<Vec<Flashcard>>;
    /// Non-suspended, previously reviewed cards due at or before `now`,
    /// most overdue first.
    fn get_due_cards(
        &self,
        deck_id: &str,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>>;
    /// Non-suspended, never-reviewed cards, oldest first.
    fn get_new_cards(&self, deck_id: &str, limit: Option<usize>) -> Result<Vec<Flashcard>>;
    fn get_cards_by_status(&self, deck_id: &str, status: CardStatus) -> Result<Vec<Flashcard>>;
    /// First card in the deck whose source matches the discriminant and
    /// key (vocab word or kanji literal), oldest first.
    fn find_card_by_source(
        &self,
        deck_id: &str,
        kind: SourceKind,
        key: &str,
    ) -> Result<Option<Flashcard>>;
    /// Persist an updated card value. Returns `None` when the card no
    /// longer exists.
    fn update_card(&mut self, card: &Flashcard) -> Result<Option<Flashcard>>;
    fn set_card_suspended(
        &mut self,
        id: &str,
        suspended: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Flashcard>>;
    fn move_card(
        &mut self,
        card_id: &str,
        deck_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Flashcard>>;
    /// Delete a card and its review history atomically. No-op when
    /// missing.
    fn delete_card(&mut self, id: &str) -> Result<()>;
    fn delete_cards(&mut self, ids: &[String]) -> Result<()>;
}

/// Result of recording a review.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub card: Flashcard,
    pub log: ReviewLog,
}

/// Repository for review operations.
pub trait ReviewStore {
    /// The central write path: schedule the card forward, append the
    /// immutable review log, and bump today's daily-stats row, all in one
    /// transaction. Returns `None` for an unknown card id.
    fn record_review(
        &mut self,
        card_id: &str,
        rating: Rating,
        response_time_ms: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<ReviewOutcome>>;
    /// Review history for a card, most recent first.
    fn get_card_review_history(&self, card_id: &str) -> Result<Vec<ReviewLog>>;
    fn get_reviews_by_deck(&self, deck_id: &str) -> Result<Vec<ReviewLog>>;
    fn get_reviews_in_range(
        &self,
        deck_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReviewLog>>;
}

/// Repository for statistics rows and counts.
pub trait StatsStore {
    fn get_daily_stats(&self, date: NaiveDate, deck_id: &str) -> Result<Option<DailyStats>>;
    fn get_daily_stats_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        deck_id: Option<&str>,
    ) -> Result<Vec<DailyStats>>;
    /// Non-suspended cards due at or before `now`, across all decks.
    fn total_due_count(&self, now: DateTime<Utc>) -> Result<usize>;
    fn deck_due_count(&self, deck_id: &str, now: DateTime<Utc>) -> Result<usize>;
}

/// SQLite implementation of the repositories.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database at `path`, creating and migrating it if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Close the handle, surfacing any flush error.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(schema::SCHEMA)?;
        self.conn.execute_batch(schema::INIT_SCHEMA_VERSION)?;
        Ok(())
    }
}

const DECK_COLUMNS: &str = "id, name, description, new_cards_per_day, reviews_per_day, \
     default_direction, created_at, updated_at";

const CARD_COLUMNS: &str = "id, deck_id, front, back, front_reading, back_reading, notes, tags, \
     source, ease_factor, interval_days, repetitions, due_date, last_review, status, created_at, \
     updated_at";

const REVIEW_COLUMNS: &str = "id, card_id, deck_id, rating, response_time_ms, ease_before, \
     interval_before, repetitions_before, due_before, last_review_before, ease_after, \
     interval_after, repetitions_after, due_after, last_review_after, reviewed_at";

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_deck(row: &Row) -> rusqlite::Result<Deck> {
    let direction: String = row.get(5)?;
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        settings: DeckSettings {
            new_cards_per_day: row.get(3)?,
            reviews_per_day: row.get(4)?,
            default_direction: CardDirection::parse(&direction).unwrap_or_default(),
        },
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_card(row: &Row) -> rusqlite::Result<Flashcard> {
    let status: String = row.get(14)?;
    Ok(Flashcard {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        front_reading: row.get(4)?,
        back_reading: row.get(5)?,
        notes: row.get(6)?,
        tags: json_column(row, 7)?,
        source: json_column(row, 8)?,
        state: CardState {
            ease_factor: row.get(9)?,
            interval_days: row.get(10)?,
            repetitions: row.get(11)?,
            due_date: row.get(12)?,
            last_review: row.get(13)?,
        },
        status: CardStatus::parse(&status).unwrap_or_default(),
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn row_to_review(row: &Row) -> rusqlite::Result<ReviewLog> {
    let rating: u8 = row.get(3)?;
    Ok(ReviewLog {
        id: row.get(0)?,
        card_id: row.get(1)?,
        deck_id: row.get(2)?,
        rating: Rating::from_value(rating).unwrap_or(Rating::Good),
        response_time_ms: row.get(4)?,
        previous_state: CardState {
            ease_factor: row.get(5)?,
            interval_days: row.get(6)?,
            repetitions: row.get(7)?,
            due_date: row.get(8)?,
            last_review: row.get(9)?,
        },
        new_state: CardState {
            ease_factor: row.get(10)?,
            interval_days: row.get(11)?,
            repetitions: row.get(12)?,
            due_date: row.get(13)?,
            last_review: row.get(14)?,
        },
        reviewed_at: row.get(15)?,
    })
}

fn row_to_daily_stats(row: &Row) -> rusqlite::Result<DailyStats> {
    Ok(DailyStats {
        date: row.get(0)?,
        deck_id: row.get(1)?,
        reviewed: row.get(2)?,
        new_learned: row.get(3)?,
        correct: row.get(4)?,
        incorrect: row.get(5)?,
        study_time_ms: row.get(6)?,
    })
}

fn query_card(conn: &Connection, id: &str) -> Result<Option<Flashcard>> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
        params![id],
        row_to_card,
    )
    .optional()
    .map_err(Into::into)
}

fn write_card(conn: &Connection, sql: &str, card: &Flashcard) -> Result<usize> {
    let tags = serde_json::to_string(&card.tags)?;
    let source = serde_json::to_string(&card.source)?;
    let count = conn.execute(
        sql,
        params![
            card.id,
            card.deck_id,
            card.front,
            card.back,
            card.front_reading,
            card.back_reading,
            card.notes,
            tags,
            source,
            card.source.kind().as_str(),
            card.source.key(),
            card.state.ease_factor,
            card.state.interval_days,
            card.state.repetitions,
            card.state.due_date,
            card.state.last_review,
            card.status.as_str(),
            card.created_at,
            card.updated_at,
        ],
    )?;
    Ok(count)
}

const INSERT_CARD_SQL: &str = "INSERT INTO cards (id, deck_id, front, back, front_reading, \
     back_reading, notes, tags, source, source_kind, source_key, ease_factor, interval_days, \
     repetitions, due_date, last_review, status, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)";

const UPSERT_CARD_SQL: &str = "INSERT OR REPLACE INTO cards (id, deck_id, front, back, \
     front_reading, back_reading, notes, tags, source, source_kind, source_key, ease_factor, \
     interval_days, repetitions, due_date, last_review, status, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)";

const UPDATE_CARD_SQL: &str = "UPDATE cards SET deck_id = ?2, front = ?3, back = ?4, \
     front_reading = ?5, back_reading = ?6, notes = ?7, tags = ?8, source = ?9, \
     source_kind = ?10, source_key = ?11, ease_factor = ?12, interval_days = ?13, \
     repetitions = ?14, due_date = ?15, last_review = ?16, status = ?17, created_at = ?18, \
     updated_at = ?19 WHERE id = ?1";

fn insert_review(conn: &Connection, log: &ReviewLog) -> Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, card_id, deck_id, rating, response_time_ms, ease_before, \
         interval_before, repetitions_before, due_before, last_review_before, ease_after, \
         interval_after, repetitions_after, due_after, last_review_after, reviewed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            log.id,
            log.card_id,
            log.deck_id,
            log.rating.to_value(),
            log.response_time_ms,
            log.previous_state.ease_factor,
            log.previous_state.interval_days,
            log.previous_state.repetitions,
            log.previous_state.due_date,
            log.previous_state.last_review,
            log.new_state.ease_factor,
            log.new_state.interval_days,
            log.new_state.repetitions,
            log.new_state.due_date,
            log.new_state.last_review,
            log.reviewed_at,
        ],
    )?;
    Ok(())
}

fn delete_card_cascade(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM reviews WHERE card_id = ?1", params![id])?;
    conn.execute("DELETE FROM cards WHERE id = ?1", params![id])?;
    Ok(())
}

impl DeckStore for SqliteStore {
    fn create_deck(
        &mut self,
        name: &str,
        description: Option<&str>,
        settings: Option<DeckSettings>,
        now: DateTime<Utc>,
    ) -> Result<Deck> {
        if self.get_deck_by_name(name)?.is_some() {
            return Err(StoreError::DeckNameTaken(name.to_string()));
        }

        let deck = Deck::new(name, description.map(str::to_string), settings, now);
        self.conn.execute(
            &format!("INSERT INTO decks ({DECK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                deck.id,
                deck.name,
                deck.description,
                deck.settings.new_cards_per_day,
                deck.settings.reviews_per_day,
                deck.settings.default_direction.as_str(),
                deck.created_at,
                deck.updated_at,
            ],
        )?;
        tracing::debug!(deck_id = %deck.id, name = %deck.name, "created deck");
        Ok(deck)
    }

    fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        self.conn
            .query_row(
                &format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1"),
                params![id],
                row_to_deck,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_deck_by_name(&self, name: &str) -> Result<Option<Deck>> {
        self.conn
            .query_row(
                &format!("SELECT {DECK_COLUMNS} FROM decks WHERE name = ?1 COLLATE NOCASE"),
                params![name],
                row_to_deck,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_all_decks(&self) -> Result<Vec<Deck>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {DECK_COLUMNS} FROM decks ORDER BY name"))?;
        let decks = stmt
            .query_map([], row_to_deck)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(decks)
    }

    fn update_deck(&mut self, deck: &Deck) -> Result<Option<Deck>> {
        if let Some(other) = self.get_deck_by_name(&deck.name)? {
            if other.id != deck.id {
                return Err(StoreError::DeckNameTaken(deck.name.clone()));
            }
        }

        let count = self.conn.execute(
            "UPDATE decks SET name = ?2, description = ?3, new_cards_per_day = ?4, \
             reviews_per_day = ?5, default_direction = ?6, created_at = ?7, updated_at = ?8 \
             WHERE id = ?1",
            params![
                deck.id,
                deck.name,
                deck.description,
                deck.settings.new_cards_per_day,
                deck.settings.reviews_per_day,
                deck.settings.default_direction.as_str(),
                deck.created_at,
                deck.updated_at,
            ],
        )?;
        Ok(if count > 0 { Some(deck.clone()) } else { None })
    }

    fn delete_deck(&mut self, id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM reviews WHERE deck_id = ?1", params![id])?;
        tx.execute("DELETE FROM daily_stats WHERE deck_id = ?1", params![id])?;
        tx.execute("DELETE FROM cards WHERE deck_id = ?1", params![id])?;
        tx.execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        tx.commit()?;
        tracing::debug!(deck_id = %id, "deleted deck cascade");
        Ok(())
    }
}

impl CardStore for SqliteStore {
    fn create_card(&mut self, draft: CardDraft, now: DateTime<Utc>) -> Result<Flashcard> {
        let card = Flashcard::from_draft(draft, now);
        write_card(&self.conn, INSERT_CARD_SQL, &card)?;
        Ok(card)
    }

    fn create_cards(&mut self, drafts: Vec<CardDraft>, now: DateTime<Utc>) -> Result<Vec<Flashcard>> {
        let tx = self.conn.transaction()?;
        let mut cards = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let card = Flashcard::from_draft(draft, now);
            write_card(&tx, INSERT_CARD_SQL, &card)?;
            cards.push(card);
        }
        tx.commit()?;
        Ok(cards)
    }

    fn upsert_cards(&mut self, cards: &[Flashcard]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for card in cards {
            write_card(&tx, UPSERT_CARD_SQL, card)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_card(&self, id: &str) -> Result<Option<Flashcard>> {
        query_card(&self.conn, id)
    }

    fn get_cards_by_deck(&self, deck_id: &str) -> Result<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY created_at, id"
        ))?;
        let cards = stmt
            .query_map(params![deck_id], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    fn get_all_cards(&self) -> Result<Vec<Flashcard>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CARD_COLUMNS} FROM cards ORDER BY created_at, id"))?;
        let cards = stmt
            .query_map([], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    fn get_due_cards(
        &self,
        deck_id: &str,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards \
             WHERE deck_id = ?1 AND status NOT IN ('new', 'suspended') AND due_date <= ?2 \
             ORDER BY due_date LIMIT ?3"
        ))?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let cards = stmt
            .query_map(params![deck_id, now, limit], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    fn get_new_cards(&self, deck_id: &str, limit: Option<usize>) -> Result<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards \
             WHERE deck_id = ?1 AND status = 'new' \
             ORDER BY created_at, id LIMIT ?2"
        ))?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let cards = stmt
            .query_map(params![deck_id, limit], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    fn get_cards_by_status(&self, deck_id: &str, status: CardStatus) -> Result<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 AND status = ?2 \
             ORDER BY created_at, id"
        ))?;
        let cards = stmt
            .query_map(params![deck_id, status.as_str()], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    fn find_card_by_source(
        &self,
        deck_id: &str,
        kind: SourceKind,
        key: &str,
    ) -> Result<Option<Flashcard>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {CARD_COLUMNS} FROM cards \
                     WHERE deck_id = ?1 AND source_kind = ?2 AND source_key = ?3 \
                     ORDER BY created_at, id LIMIT 1"
                ),
                params![deck_id, kind.as_str(), key],
                row_to_card,
            )
            .optional()
            .map_err(Into::into)
    }

    fn update_card(&mut self, card: &Flashcard) -> Result<Option<Flashcard>> {
        let count = write_card(&self.conn, UPDATE_CARD_SQL, card)?;
        Ok(if count > 0 { Some(card.clone()) } else { None })
    }

    fn set_card_suspended(
        &mut self,
        id: &str,
        suspended: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Flashcard>> {
        let card = match query_card(&self.conn, id)? {
            Some(card) => card.with_suspended(suspended, now),
            None => return Ok(None),
        };
        self.update_card(&card)
    }

    fn move_card(
        &mut self,
        card_id: &str,
        deck_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Flashcard>> {
        let card = match query_card(&self.conn, card_id)? {
            Some(card) => card.with_deck(deck_id, now),
            None => return Ok(None),
        };
        self.update_card(&card)
    }

    fn delete_card(&mut self, id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        delete_card_cascade(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_cards(&mut self, ids: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for id in ids {
            delete_card_cascade(&tx, id)?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl ReviewStore for SqliteStore {
    fn record_review(
        &mut self,
        card_id: &str,
        rating: Rating,
        response_time_ms: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<ReviewOutcome>> {
        let tx = self.conn.transaction()?;

        let card = match query_card(&tx, card_id)? {
            Some(card) => card,
            None => return Ok(None),
        };

        let was_new = is_new(&card.state);
        let previous_state = card.state.clone();
        let new_state = calculate_next_state(&previous_state, rating, now);

        let log = ReviewLog {
            id: generate_id(),
            card_id: card.id.clone(),
            deck_id: card.deck_id.clone(),
            rating,
            response_time_ms,
            previous_state,
            new_state: new_state.clone(),
            reviewed_at: now,
        };
        let updated = card.with_state(new_state, now);

        insert_review(&tx, &log)?;
        write_card(&tx, UPDATE_CARD_SQL, &updated)?;
        tx.execute(
            "INSERT INTO daily_stats (date, deck_id, reviewed, new_learned, correct, incorrect, \
             study_time_ms) VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6) \
             ON CONFLICT (date, deck_id) DO UPDATE SET \
             reviewed = reviewed + 1, \
             new_learned = new_learned + excluded.new_learned, \
             correct = correct + excluded.correct, \
             incorrect = incorrect + excluded.incorrect, \
             study_time_ms = study_time_ms + excluded.study_time_ms",
            params![
                now.date_naive(),
                updated.deck_id,
                was_new as i64,
                rating.is_correct() as i64,
                (rating == Rating::Again) as i64,
                i64::from(response_time_ms),
            ],
        )?;

        tx.commit()?;
        tracing::debug!(card_id = %card_id, rating = rating.to_value(), "recorded review");
        Ok(Some(ReviewOutcome { card: updated, log }))
    }

    fn get_card_review_history(&self, card_id: &str) -> Result<Vec<ReviewLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE card_id = ?1 ORDER BY reviewed_at DESC"
        ))?;
        let reviews = stmt
            .query_map(params![card_id], row_to_review)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reviews)
    }

    fn get_reviews_by_deck(&self, deck_id: &str) -> Result<Vec<ReviewLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE deck_id = ?1 ORDER BY reviewed_at"
        ))?;
        let reviews = stmt
            .query_map(params![deck_id], row_to_review)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reviews)
    }

    fn get_reviews_in_range(
        &self,
        deck_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReviewLog>> {
        let reviews = match deck_id {
            Some(deck_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {REVIEW_COLUMNS} FROM reviews \
                     WHERE deck_id = ?1 AND reviewed_at >= ?2 AND reviewed_at <= ?3 \
                     ORDER BY reviewed_at"
                ))?;
                let rows = stmt.query_map(params![deck_id, start, end], row_to_review)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {REVIEW_COLUMNS} FROM reviews \
                     WHERE reviewed_at >= ?1 AND reviewed_at <= ?2 \
                     ORDER BY reviewed_at"
                ))?;
                let rows = stmt.query_map(params![start, end], row_to_review)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(reviews)
    }
}

impl StatsStore for SqliteStore {
    fn get_daily_stats(&self, date: NaiveDate, deck_id: &str) -> Result<Option<DailyStats>> {
        self.conn
            .query_row(
                "SELECT date, deck_id, reviewed, new_learned, correct, incorrect, study_time_ms \
                 FROM daily_stats WHERE date = ?1 AND deck_id = ?2",
                params![date, deck_id],
                row_to_daily_stats,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_daily_stats_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        deck_id: Option<&str>,
    ) -> Result<Vec<DailyStats>> {
        let rows = match deck_id {
            Some(deck_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT date, deck_id, reviewed, new_learned, correct, incorrect, \
                     study_time_ms FROM daily_stats \
                     WHERE deck_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date",
                )?;
                let rows = stmt.query_map(params![deck_id, start, end], row_to_daily_stats)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT date, deck_id, reviewed, new_learned, correct, incorrect, \
                     study_time_ms FROM daily_stats \
                     WHERE date >= ?1 AND date <= ?2 ORDER BY date, deck_id",
                )?;
                let rows = stmt.query_map(params![start, end], row_to_daily_stats)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    fn total_due_count(&self, now: DateTime<Utc>) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM cards WHERE status != 'suspended' AND due_date <= ?1",
                params![now],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    fn deck_due_count(&self, deck_id: &str, now: DateTime<Utc>) -> Result<usize> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM cards \
                 WHERE deck_id = ?1 AND status != 'suspended' AND due_date <= ?2",
                params![deck_id, now],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
