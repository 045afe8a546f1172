//! Deck import and export.
//!
//! Exports wrap a deck, its cards, and optionally its review history in a
//! versioned envelope. Imports are validated structurally before any typed
//! decoding: validation errors abort, warnings accompany a degraded but
//! successful parse (malformed review history is ignored, not fatal).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ImportError;
use crate::sm2::determine_status;
use crate::types::{
    generate_id, CardSource, CardState, Deck, DeckSettings, ExportData, Flashcard, ReviewLog,
    EXPORT_VERSION,
};

/// How to resolve an import whose deck name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckConflictStrategy {
    /// Leave the existing deck alone and import nothing.
    Skip,
    /// Append " (n)" until the name is unique.
    Rename,
    /// Reuse the existing deck's id.
    Replace,
}

/// How to resolve an imported card whose front and back match an existing
/// card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardDuplicateStrategy {
    Skip,
    /// Reuse the existing card's id.
    Replace,
    /// Import under a fresh id.
    KeepBoth,
}

/// Options controlling an import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub deck_name_conflict: DeckConflictStrategy,
    pub card_duplicate: CardDuplicateStrategy,
    pub include_reviews: bool,
    /// Import into an existing deck instead of the one in the file.
    pub target_deck_id: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            deck_name_conflict: DeckConflictStrategy::Skip,
            card_duplicate: CardDuplicateStrategy::Skip,
            include_reviews: false,
            target_deck_id: None,
        }
    }
}

/// Assemble the export envelope for a deck.
pub fn export_deck(
    deck: &Deck,
    cards: &[Flashcard],
    reviews: Option<&[ReviewLog]>,
    now: DateTime<Utc>,
) -> ExportData {
    ExportData {
        version: EXPORT_VERSION.to_string(),
        exported_at: now,
        deck: deck.clone(),
        cards: cards.to_vec(),
        reviews: reviews.map(|r| r.to_vec()),
    }
}

/// Serialize an export to JSON.
pub fn export_to_json(data: &ExportData, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(data)
    } else {
        serde_json::to_string(data)
    }
}

/// Outcome of structural validation: errors block the import, warnings do
/// not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn non_empty_string(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

/// Structurally validate parsed import data.
pub fn validate_import_data(value: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            report.errors.push("Invalid JSON structure".to_string());
            return report;
        }
    };

    match obj.get("version") {
        None | Some(Value::Null) => report.errors.push("Missing version field".to_string()),
        Some(Value::String(s)) if s.is_empty() => {
            report.errors.push("Missing version field".to_string())
        }
        Some(Value::String(_)) => {}
        Some(_) => report.errors.push("Invalid version field".to_string()),
    }

    match obj.get("deck") {
        None | Some(Value::Null) => report.errors.push("Missing deck field".to_string()),
        Some(deck) => {
            if !non_empty_string(deck.get("name")) {
                report.errors.push("Deck must have a name".to_string());
            }
        }
    }

    match obj.get("cards") {
        Some(Value::Array(cards)) => {
            for (i, card) in cards.iter().enumerate() {
                if !non_empty_string(card.get("front")) {
                    report
                        .errors
                        .push(format!("Card {}: missing or invalid front", i + 1));
                }
                if !non_empty_string(card.get("back")) {
                    report
                        .errors
                        .push(format!("Card {}: missing or invalid back", i + 1));
                }
            }
        }
        _ => report.errors.push("Cards must be an array".to_string()),
    }

    if let Some(reviews) = obj.get("reviews") {
        if !reviews.is_array() && !reviews.is_null() {
            report
                .warnings
                .push("Reviews field is not an array, will be ignored".to_string());
        }
    }

    report
}

/// Deck fields as found in an import file.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportDeck {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: Option<DeckSettings>,
}

/// Card fields as found in an import file. Scheduling state and timestamps
/// are optional; absent values fall back to a fresh card.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportCard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub front_reading: Option<String>,
    #[serde(default)]
    pub back_reading: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub state: Option<CardState>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Typed import payload after validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportData {
    pub version: String,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    pub deck: ImportDeck,
    pub cards: Vec<ImportCard>,
    #[serde(skip)]
    pub reviews: Option<Vec<ReviewLog>>,
}

/// A validated import plus any non-fatal warnings.
#[derive(Debug, Clone)]
pub struct ValidatedImport {
    pub data: ImportData,
    pub warnings: Vec<String>,
}

/// Parse and validate an import file.
///
/// Review history that fails to decode is dropped with a warning rather
/// than failing the whole import.
pub fn parse_import_json(json: &str) -> Result<ValidatedImport, ImportError> {
    let mut value: Value = serde_json::from_str(json)?;

    let report = validate_import_data(&value);
    if !report.is_valid() {
        return Err(ImportError::Validation {
            errors: report.errors,
        });
    }
    let mut warnings = report.warnings;

    let reviews_value = value
        .as_object_mut()
        .and_then(|obj| obj.remove("reviews"))
        .filter(|v| v.is_array());

    let mut data: ImportData = serde_json::from_value(value)?;
    data.reviews = match reviews_value {
        Some(v) => match serde_json::from_value::<Vec<ReviewLog>>(v) {
            Ok(reviews) => Some(reviews),
            Err(_) => {
                warnings.push("Review history could not be decoded, ignoring it".to_string());
                None
            }
        },
        None => None,
    };

    Ok(ValidatedImport { data, warnings })
}

/// What to do with the deck described by an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckImportAction {
    Create,
    Skip,
    Replace,
}

/// Planned deck for an import; `deck` is `None` when the import is skipped.
#[derive(Debug, Clone)]
pub struct DeckImportPlan {
    pub deck: Option<Deck>,
    pub action: DeckImportAction,
}

fn name_taken(decks: &[Deck], name: &str) -> bool {
    let lower = name.to_lowercase();
    decks.iter().any(|d| d.name.to_lowercase() == lower)
}

/// Resolve the imported deck against existing decks.
pub fn prepare_import_deck(
    data: &ImportData,
    existing: &[Deck],
    options: &ImportOptions,
    now: DateTime<Utc>,
) -> DeckImportPlan {
    let import_deck = &data.deck;
    let conflict = existing
        .iter()
        .find(|d| d.name.to_lowercase() == import_deck.name.to_lowercase());

    if let Some(existing_deck) = conflict {
        return match options.deck_name_conflict {
            DeckConflictStrategy::Skip => DeckImportPlan {
                deck: None,
                action: DeckImportAction::Skip,
            },
            DeckConflictStrategy::Replace => DeckImportPlan {
                deck: Some(Deck {
                    id: existing_deck.id.clone(),
                    name: import_deck.name.clone(),
                    description: import_deck.description.clone(),
                    settings: import_deck.settings.unwrap_or_default(),
                    created_at: existing_deck.created_at,
                    updated_at: now,
                }),
                action: DeckImportAction::Replace,
            },
            DeckConflictStrategy::Rename => {
                let mut name = import_deck.name.clone();
                let mut suffix = 1;
                while name_taken(existing, &name) {
                    name = format!("{} ({})", import_deck.name, suffix);
                    suffix += 1;
                }
                DeckImportPlan {
                    deck: Some(Deck::new(
                        name,
                        import_deck.description.clone(),
                        import_deck.settings,
                        now,
                    )),
                    action: DeckImportAction::Create,
                }
            }
        };
    }

    DeckImportPlan {
        deck: Some(Deck::new(
            import_deck.name.clone(),
            import_deck.description.clone(),
            import_deck.settings,
            now,
        )),
        action: DeckImportAction::Create,
    }
}

/// Planned cards for an import.
#[derive(Debug, Clone)]
pub struct CardImportPlan {
    pub cards: Vec<Flashcard>,
    pub skipped: usize,
}

fn import_card_to_flashcard(
    card: &ImportCard,
    id: String,
    deck_id: &str,
    now: DateTime<Utc>,
) -> Flashcard {
    let state = card.state.clone().unwrap_or_else(|| CardState::new(now));
    let status = determine_status(&state);
    Flashcard {
        id,
        deck_id: deck_id.to_string(),
        front: card.front.clone(),
        back: card.back.clone(),
        front_reading: card.front_reading.clone(),
        back_reading: card.back_reading.clone(),
        notes: card.notes.clone(),
        tags: card.tags.clone(),
        source: CardSource::Imported,
        state,
        status,
        created_at: card.created_at.unwrap_or(now),
        updated_at: now,
    }
}

/// Resolve imported cards against the target deck's existing cards.
///
/// Duplicates are detected by front+back equality against the first
/// matching existing card only.
pub fn prepare_import_cards(
    data: &ImportData,
    target_deck_id: &str,
    existing: &[Flashcard],
    options: &ImportOptions,
    now: DateTime<Utc>,
) -> CardImportPlan {
    let mut cards = Vec::new();
    let mut skipped = 0;

    for import_card in &data.cards {
        let duplicate = existing
            .iter()
            .find(|c| c.front == import_card.front && c.back == import_card.back);

        let id = match (duplicate, options.card_duplicate) {
            (Some(_), CardDuplicateStrategy::Skip) => {
                skipped += 1;
                continue;
            }
            (Some(dup), CardDuplicateStrategy::Replace) => dup.id.clone(),
            _ => generate_id(),
        };

        cards.push(import_card_to_flashcard(import_card, id, target_deck_id, now));
    }

    CardImportPlan { cards, skipped }
}

/// Export cards as CSV with columns `front,back,notes,tags`.
///
/// Tags are joined with ", "; fields are quoted only when they contain a
/// comma, quote, or newline, with embedded quotes doubled.
pub fn export_to_csv(cards: &[Flashcard]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["front", "back", "notes", "tags"])?;
    for card in cards {
        writer.write_record([
            card.front.as_str(),
            card.back.as_str(),
            card.notes.as_deref().unwrap_or(""),
            card.tags.join(", ").as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
