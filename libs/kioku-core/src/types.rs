//! Core types for the flashcard domain.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sm2;

/// Default ease factor for a card that has never been rated.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Current export format version.
pub const EXPORT_VERSION: &str = "1.0.0";

/// Generate a globally-unique string id for a new entity.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Review rating on the 4-button scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    /// Whether the rating counts as a correct recall (Good or Easy).
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Good | Self::Easy)
    }
}

/// Presentation direction for a review.
///
/// `FrontToBack` shows the card as stored (Japanese first); `BackToFront`
/// swaps the sides (meaning first); `Random` flips a fair coin per card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardDirection {
    FrontToBack,
    BackToFront,
    Random,
}

impl Default for CardDirection {
    fn default() -> Self {
        Self::BackToFront
    }
}

impl CardDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FrontToBack => "front_to_back",
            Self::BackToFront => "back_to_front",
            Self::Random => "random",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "front_to_back" => Some(Self::FrontToBack),
            "back_to_front" => Some(Self::BackToFront),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

/// Per-card SM-2 scheduling state.
///
/// `last_review` is `None` until the first review; `ease_factor` never
/// drops below 1.3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub ease_factor: f64,
    pub interval_days: i64,
    pub repetitions: u32,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
}

impl CardState {
    /// State for a freshly created card, due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
            due_date: now,
            last_review: None,
        }
    }
}

/// Card learning status.
///
/// Derived from [`CardState`] except for `Suspended`, which is set
/// explicitly and never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Learning,
    Review,
    Suspended,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::New
    }
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "learning" => Some(Self::Learning),
            "review" => Some(Self::Review),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// Provenance of a card, used for duplicate detection on import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardSource {
    Vocab {
        level: String,
        unit: String,
        word: String,
    },
    Kanji {
        level: String,
        kanji: String,
    },
    Custom,
    Imported,
}

impl CardSource {
    /// Discriminant without payload.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Vocab { .. } => SourceKind::Vocab,
            Self::Kanji { .. } => SourceKind::Kanji,
            Self::Custom => SourceKind::Custom,
            Self::Imported => SourceKind::Imported,
        }
    }

    /// Lookup key for duplicate detection: the vocab word or kanji literal.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Vocab { word, .. } => Some(word),
            Self::Kanji { kanji, .. } => Some(kanji),
            Self::Custom | Self::Imported => None,
        }
    }
}

/// Discriminant of a [`CardSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Vocab,
    Kanji,
    Custom,
    Imported,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vocab => "vocab",
            Self::Kanji => "kanji",
            Self::Custom => "custom",
            Self::Imported => "imported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vocab" => Some(Self::Vocab),
            "kanji" => Some(Self::Kanji),
            "custom" => Some(Self::Custom),
            "imported" => Some(Self::Imported),
            _ => None,
        }
    }
}

/// A flashcard with assigned identity and scheduling state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub deck_id: String,
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: CardSource,
    pub state: CardState,
    pub status: CardStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flashcard {
    /// Materialize a draft, assigning identity and deriving status.
    pub fn from_draft(draft: CardDraft, now: DateTime<Utc>) -> Self {
        let status = sm2::determine_status(&draft.state);
        Self {
            id: generate_id(),
            deck_id: draft.deck_id,
            front: draft.front,
            back: draft.back,
            front_reading: draft.front_reading,
            back_reading: draft.back_reading,
            notes: draft.notes,
            tags: draft.tags,
            source: draft.source,
            state: draft.state,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the scheduling state, recomputing status.
    pub fn with_state(self, state: CardState, now: DateTime<Utc>) -> Self {
        let status = sm2::determine_status(&state);
        Self {
            state,
            status,
            updated_at: now,
            ..self
        }
    }

    /// Suspend the card, or restore the status derived from its state.
    pub fn with_suspended(self, suspended: bool, now: DateTime<Utc>) -> Self {
        let status = if suspended {
            CardStatus::Suspended
        } else {
            sm2::determine_status(&self.state)
        };
        Self {
            status,
            updated_at: now,
            ..self
        }
    }

    /// Move the card to another deck.
    pub fn with_deck(self, deck_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            deck_id: deck_id.into(),
            updated_at: now,
            ..self
        }
    }
}

/// Pre-persistence card payload: everything but identity, status, and
/// timestamps. Produced by conversion, consumed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDraft {
    pub deck_id: String,
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: CardSource,
    pub state: CardState,
}

/// Per-deck study settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSettings {
    pub new_cards_per_day: u32,
    /// 0 means unlimited.
    pub reviews_per_day: u32,
    pub default_direction: CardDirection,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            new_cards_per_day: 20,
            reviews_per_day: 200,
            default_direction: CardDirection::default(),
        }
    }
}

/// A deck of flashcards. Names are unique case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: DeckSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        settings: Option<DeckSettings>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description,
            settings: settings.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(self, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            updated_at: now,
            ..self
        }
    }

    pub fn with_description(self, description: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            description,
            updated_at: now,
            ..self
        }
    }

    pub fn with_settings(self, settings: DeckSettings, now: DateTime<Utc>) -> Self {
        Self {
            settings,
            updated_at: now,
            ..self
        }
    }
}

/// Immutable audit record of one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
    pub id: String,
    pub card_id: String,
    pub deck_id: String,
    pub rating: Rating,
    pub response_time_ms: u32,
    pub previous_state: CardState,
    pub new_state: CardState,
    pub reviewed_at: DateTime<Utc>,
}

/// Per-day, per-deck study counters, keyed by `(date, deck_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub deck_id: String,
    pub reviewed: u32,
    pub new_learned: u32,
    /// Good and Easy ratings.
    pub correct: u32,
    /// Again ratings.
    pub incorrect: u32,
    pub study_time_ms: u64,
}

impl DailyStats {
    pub fn empty(date: NaiveDate, deck_id: impl Into<String>) -> Self {
        Self {
            date,
            deck_id: deck_id.into(),
            reviewed: 0,
            new_learned: 0,
            correct: 0,
            incorrect: 0,
            study_time_ms: 0,
        }
    }
}

/// Configuration for building a study session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 0 means unlimited.
    pub max_new_cards: usize,
    /// 0 means unlimited.
    pub max_review_cards: usize,
    pub direction: CardDirection,
    pub randomize_order: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_new_cards: 20,
            max_review_cards: 200,
            direction: CardDirection::default(),
            randomize_order: true,
        }
    }
}

/// Study queue state for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionQueue {
    pub new_cards: Vec<Flashcard>,
    pub review_cards: Vec<Flashcard>,
    /// Ids of completed cards, in completion order.
    pub completed: Vec<String>,
    pub current_index: usize,
}

/// Export envelope for a deck and its cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub deck: Deck,
    pub cards: Vec<Flashcard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<ReviewLog>>,
}
