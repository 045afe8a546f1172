//! Conversion of vocabulary and kanji records into flashcard drafts.
//!
//! The study-data loaders hand over plain records; this module assigns
//! front/back text, tags, and provenance so the storage layer can persist
//! them and later detect re-imports of the same item.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SelectorError;
use crate::types::{CardDraft, CardSource, CardState, Flashcard};

/// A vocabulary entry from the unit JSON files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordDefinition {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A kanji entry from the level JSON files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanjiData {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub kunyomi: Vec<String>,
    #[serde(default)]
    pub onyomi: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radicals: Option<String>,
}

/// Convert a vocabulary word into a card draft.
///
/// Front: the Japanese word (reading attached); back: its meaning.
pub fn vocab_to_card(
    word: &WordDefinition,
    deck_id: &str,
    level: &str,
    unit: &str,
    now: DateTime<Utc>,
) -> CardDraft {
    CardDraft {
        deck_id: deck_id.to_string(),
        front: word.word.clone(),
        back: word.meaning.clone(),
        front_reading: word.reading.clone(),
        back_reading: None,
        notes: word.note.clone(),
        tags: vec![level.to_string(), unit.to_string()],
        source: CardSource::Vocab {
            level: level.to_string(),
            unit: unit.to_string(),
            word: word.word.clone(),
        },
        state: CardState::new(now),
    }
}

/// Convert a kanji entry into a card draft.
///
/// Front: the kanji literal; back: meaning plus readings, one per line.
pub fn kanji_to_card(kanji: &KanjiData, deck_id: &str, level: &str, now: DateTime<Utc>) -> CardDraft {
    let mut back_parts = vec![kanji.meaning.clone()];
    if !kanji.onyomi.is_empty() {
        back_parts.push(format!("Onyomi: {}", kanji.onyomi.join(", ")));
    }
    if !kanji.kunyomi.is_empty() {
        back_parts.push(format!("Kunyomi: {}", kanji.kunyomi.join(", ")));
    }

    CardDraft {
        deck_id: deck_id.to_string(),
        front: kanji.word.clone(),
        back: back_parts.join("\n"),
        front_reading: None,
        back_reading: None,
        notes: kanji.radicals.as_ref().map(|r| format!("Radicals: {r}")),
        tags: vec![level.to_string(), "kanji".to_string()],
        source: CardSource::Kanji {
            level: level.to_string(),
            kanji: kanji.word.clone(),
        },
        state: CardState::new(now),
    }
}

/// Batch-convert a vocabulary list.
pub fn vocab_list_to_cards(
    words: &[WordDefinition],
    deck_id: &str,
    level: &str,
    unit: &str,
    now: DateTime<Utc>,
) -> Vec<CardDraft> {
    words
        .iter()
        .map(|w| vocab_to_card(w, deck_id, level, unit, now))
        .collect()
}

/// Batch-convert a kanji list.
pub fn kanji_list_to_cards(
    kanji_list: &[KanjiData],
    deck_id: &str,
    level: &str,
    now: DateTime<Utc>,
) -> Vec<CardDraft> {
    kanji_list
        .iter()
        .map(|k| kanji_to_card(k, deck_id, level, now))
        .collect()
}

/// Extra fields for a user-created card.
#[derive(Debug, Clone, Default)]
pub struct CustomCardOptions {
    pub front_reading: Option<String>,
    pub back_reading: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

/// Build a user-created card draft.
pub fn custom_card(
    front: &str,
    back: &str,
    deck_id: &str,
    options: CustomCardOptions,
    now: DateTime<Utc>,
) -> CardDraft {
    CardDraft {
        deck_id: deck_id.to_string(),
        front: front.to_string(),
        back: back.to_string(),
        front_reading: options.front_reading,
        back_reading: options.back_reading,
        notes: options.notes,
        tags: options.tags,
        source: CardSource::Custom,
        state: CardState::new(now),
    }
}

/// Whether a vocabulary word from this level/unit is already in the deck.
pub fn is_vocab_in_deck(
    cards: &[Flashcard],
    word: &WordDefinition,
    level: &str,
    unit: &str,
) -> bool {
    cards.iter().any(|card| match &card.source {
        CardSource::Vocab {
            level: l,
            unit: u,
            word: w,
        } => l == level && u == unit && w == &word.word,
        CardSource::Kanji { .. } | CardSource::Custom | CardSource::Imported => false,
    })
}

/// Whether a kanji from this level is already in the deck.
pub fn is_kanji_in_deck(cards: &[Flashcard], kanji: &KanjiData, level: &str) -> bool {
    cards.iter().any(|card| match &card.source {
        CardSource::Kanji { level: l, kanji: k } => l == level && k == &kanji.word,
        CardSource::Vocab { .. } | CardSource::Custom | CardSource::Imported => false,
    })
}

/// Drop vocabulary words that already exist in the deck.
pub fn filter_new_vocab<'a>(
    words: &'a [WordDefinition],
    existing: &[Flashcard],
    level: &str,
    unit: &str,
) -> Vec<&'a WordDefinition> {
    words
        .iter()
        .filter(|w| !is_vocab_in_deck(existing, w, level, unit))
        .collect()
}

/// Drop kanji that already exist in the deck.
pub fn filter_new_kanji<'a>(
    kanji_list: &'a [KanjiData],
    existing: &[Flashcard],
    level: &str,
) -> Vec<&'a KanjiData> {
    kanji_list
        .iter()
        .filter(|k| !is_kanji_in_deck(existing, k, level))
        .collect()
}

/// Suggested deck name for a vocabulary unit.
pub fn suggest_vocab_deck_name(level: &str, unit: &str) -> String {
    let level_upper = level.to_uppercase();
    if unit == "all" {
        format!("{level_upper} - All vocabulary")
    } else {
        format!("{level_upper} - Unit {}", unit.trim_start_matches('u'))
    }
}

/// Suggested deck name for a kanji level.
pub fn suggest_kanji_deck_name(level: &str) -> String {
    format!("{} - Kanji", level.to_uppercase())
}

/// Which units of a level to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitSelection {
    All,
    /// Sorted, de-duplicated unit numbers.
    Units(Vec<u32>),
}

fn selector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(all|u\d+(-u\d+)?(,u\d+(-u\d+)?)*)$").expect("valid selector regex")
    })
}

fn parse_unit_number(segment: &str) -> Result<u32, SelectorError> {
    segment
        .trim_start_matches('u')
        .parse()
        .map_err(|_| SelectorError::InvalidFormat(segment.to_string()))
}

/// Parse a unit selector like `all`, `u3`, `u1-u4`, or `u1-u3,u5,u8-u10`.
///
/// Fails fast on anything outside that grammar.
pub fn parse_unit_selector(s: &str) -> Result<UnitSelection, SelectorError> {
    if !selector_regex().is_match(s) {
        return Err(SelectorError::InvalidFormat(s.to_string()));
    }
    if s == "all" {
        return Ok(UnitSelection::All);
    }

    let mut units = BTreeSet::new();
    for segment in s.split(',') {
        match segment.split_once('-') {
            Some((start, end)) => {
                let start = parse_unit_number(start)?;
                let end = parse_unit_number(end)?;
                units.extend(start..=end);
            }
            None => {
                units.insert(parse_unit_number(segment)?);
            }
        }
    }

    Ok(UnitSelection::Units(units.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sm2::is_new;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn word(w: &str) -> WordDefinition {
        WordDefinition {
            word: w.to_string(),
            reading: Some("みず".to_string()),
            meaning: "water".to_string(),
            note: Some("noun".to_string()),
        }
    }

    fn kanji(k: &str) -> KanjiData {
        KanjiData {
            word: k.to_string(),
            meaning: "water".to_string(),
            kunyomi: vec!["みず".to_string()],
            onyomi: vec!["スイ".to_string()],
            radicals: Some("水".to_string()),
        }
    }

    #[test]
    fn vocab_card_carries_reading_and_provenance() {
        let draft = vocab_to_card(&word("水"), "deck-1", "n5", "u1", now());
        assert_eq!(draft.front, "水");
        assert_eq!(draft.back, "water");
        assert_eq!(draft.front_reading, Some("みず".to_string()));
        assert_eq!(draft.notes, Some("noun".to_string()));
        assert_eq!(draft.tags, vec!["n5".to_string(), "u1".to_string()]);
        assert_eq!(
            draft.source,
            CardSource::Vocab {
                level: "n5".to_string(),
                unit: "u1".to_string(),
                word: "水".to_string(),
            }
        );
        assert!(is_new(&draft.state));
    }

    #[test]
    fn kanji_card_lists_readings_on_back() {
        let draft = kanji_to_card(&kanji("水"), "deck-1", "n5", now());
        assert_eq!(draft.back, "water\nOnyomi: スイ\nKunyomi: みず");
        assert_eq!(draft.notes, Some("Radicals: 水".to_string()));
        assert_eq!(draft.tags, vec!["n5".to_string(), "kanji".to_string()]);
    }

    #[test]
    fn kanji_card_omits_empty_reading_lines() {
        let mut data = kanji("火");
        data.kunyomi.clear();
        data.onyomi.clear();
        data.radicals = None;
        let draft = kanji_to_card(&data, "deck-1", "n5", now());
        assert_eq!(draft.back, "water");
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn duplicate_detection_matches_level_unit_and_word() {
        let draft = vocab_to_card(&word("水"), "deck-1", "n5", "u1", now());
        let card = Flashcard::from_draft(draft, now());
        let cards = vec![card];

        assert!(is_vocab_in_deck(&cards, &word("水"), "n5", "u1"));
        assert!(!is_vocab_in_deck(&cards, &word("水"), "n5", "u2"));
        assert!(!is_vocab_in_deck(&cards, &word("火"), "n5", "u1"));
        assert!(!is_kanji_in_deck(&cards, &kanji("水"), "n5"));
    }

    #[test]
    fn filter_new_vocab_drops_existing_words() {
        let existing = vec![Flashcard::from_draft(
            vocab_to_card(&word("水"), "deck-1", "n5", "u1", now()),
            now(),
        )];
        let words = vec![word("水"), word("火")];
        let fresh = filter_new_vocab(&words, &existing, "n5", "u1");
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].word, "火");
    }

    #[test]
    fn suggested_names_cover_all_and_single_units() {
        assert_eq!(suggest_vocab_deck_name("n5", "all"), "N5 - All vocabulary");
        assert_eq!(suggest_vocab_deck_name("n4", "u3"), "N4 - Unit 3");
        assert_eq!(suggest_kanji_deck_name("n5"), "N5 - Kanji");
    }

    #[test]
    fn selector_parses_ranges_and_lists() {
        assert_eq!(parse_unit_selector("all").unwrap(), UnitSelection::All);
        assert_eq!(
            parse_unit_selector("u3").unwrap(),
            UnitSelection::Units(vec![3])
        );
        assert_eq!(
            parse_unit_selector("u1-u3,u5,u8-u10").unwrap(),
            UnitSelection::Units(vec![1, 2, 3, 5, 8, 9, 10])
        );
        // Overlaps collapse.
        assert_eq!(
            parse_unit_selector("u1-u3,u2").unwrap(),
            UnitSelection::Units(vec![1, 2, 3])
        );
    }

    #[test]
    fn selector_rejects_malformed_input() {
        for bad in ["", "unit1", "u1-", "1-3", "u1,,u2", "all,u1"] {
            assert!(parse_unit_selector(bad).is_err(), "{bad}");
        }
    }
}
