//! Study session management: queue building, card selection, and progress.
//!
//! The queue is a plain value; [`mark_card_completed`] returns an updated
//! copy rather than mutating, so callers can hold the previous state for
//! reactive UIs. Concurrent completion of the same queue instance must be
//! serialized by the caller.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sm2::{days_overdue, is_due, is_new};
use crate::types::{CardDirection, CardStatus, Flashcard, SessionConfig, SessionQueue};

/// Build a session queue from available cards.
///
/// Suspended cards are excluded. Review cards are sorted most-overdue
/// first, both lists are capped by the config (0 = unlimited), and
/// optionally shuffled (Fisher-Yates).
pub fn build_session_queue(
    all_cards: &[Flashcard],
    config: &SessionConfig,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> SessionQueue {
    let mut new_cards: Vec<Flashcard> = all_cards
        .iter()
        .filter(|c| c.status != CardStatus::Suspended && is_new(&c.state))
        .cloned()
        .collect();

    let mut review_cards: Vec<Flashcard> = all_cards
        .iter()
        .filter(|c| c.status != CardStatus::Suspended && !is_new(&c.state) && is_due(&c.state, now))
        .cloned()
        .collect();

    review_cards.sort_by_key(|c| std::cmp::Reverse(days_overdue(&c.state, now)));

    if config.max_new_cards > 0 {
        new_cards.truncate(config.max_new_cards);
    }
    if config.max_review_cards > 0 {
        review_cards.truncate(config.max_review_cards);
    }

    if config.randomize_order {
        new_cards.shuffle(rng);
        review_cards.shuffle(rng);
    }

    SessionQueue {
        new_cards,
        review_cards,
        completed: Vec::new(),
        current_index: 0,
    }
}

/// Select the next card to show.
///
/// Policy: one new card up front, then one more after every ten completed
/// reviews. Reviews are served otherwise; whichever list runs out first
/// falls back to the other. Returns `None` when the session is complete.
pub fn get_next_card(queue: &SessionQueue) -> Option<&Flashcard> {
    let next_new = queue
        .new_cards
        .iter()
        .find(|c| !queue.completed.contains(&c.id));
    let next_review = queue
        .review_cards
        .iter()
        .find(|c| !queue.completed.contains(&c.id));

    let reviews_completed = queue
        .completed
        .iter()
        .filter(|id| queue.review_cards.iter().any(|c| &c.id == *id))
        .count();
    let new_completed = queue
        .completed
        .iter()
        .filter(|id| queue.new_cards.iter().any(|c| &c.id == *id))
        .count();

    match (next_new, next_review) {
        (None, None) => None,
        (Some(card), None) => Some(card),
        (None, Some(card)) => Some(card),
        (Some(new_card), Some(review_card)) => {
            // One new card per ten-review boundary (0, 10, 20, ...).
            let quota = reviews_completed / 10 + 1;
            if new_completed < quota {
                Some(new_card)
            } else {
                Some(review_card)
            }
        }
    }
}

/// Record a completed card, returning the updated queue.
pub fn mark_card_completed(queue: &SessionQueue, card_id: impl Into<String>) -> SessionQueue {
    let mut next = queue.clone();
    next.completed.push(card_id.into());
    next.current_index += 1;
    next
}

/// Session progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub new_completed: usize,
    pub review_completed: usize,
    /// 100 for an empty session.
    pub percent_complete: u32,
}

/// Summarize progress through the session.
pub fn session_progress(queue: &SessionQueue) -> SessionProgress {
    let total = queue.new_cards.len() + queue.review_cards.len();
    let completed = queue.completed.len();
    let new_completed = queue
        .completed
        .iter()
        .filter(|id| queue.new_cards.iter().any(|c| &c.id == *id))
        .count();
    let review_completed = completed - new_completed;

    let percent_complete = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    } else {
        100
    };

    SessionProgress {
        total,
        completed,
        remaining: total - completed,
        new_completed,
        review_completed,
        percent_complete,
    }
}

/// Whether every queued card has been completed.
pub fn is_session_complete(queue: &SessionQueue) -> bool {
    queue.completed.len() >= queue.new_cards.len() + queue.review_cards.len()
}

/// Card content resolved for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayCard {
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_reading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_reading: Option<String>,
}

/// Resolve presentation sides for a card.
///
/// `BackToFront` swaps the sides and their readings (meaning-first);
/// `Random` flips a fair coin per call.
pub fn prepare_card_for_display(
    card: &Flashcard,
    direction: CardDirection,
    rng: &mut impl Rng,
) -> DisplayCard {
    let resolved = match direction {
        CardDirection::Random => {
            if rng.gen_bool(0.5) {
                CardDirection::BackToFront
            } else {
                CardDirection::FrontToBack
            }
        }
        fixed => fixed,
    };

    match resolved {
        CardDirection::BackToFront => DisplayCard {
            front: card.back.clone(),
            back: card.front.clone(),
            front_reading: card.back_reading.clone(),
            back_reading: card.front_reading.clone(),
        },
        _ => DisplayCard {
            front: card.front.clone(),
            back: card.back.clone(),
            front_reading: card.front_reading.clone(),
            back_reading: card.back_reading.clone(),
        },
    }
}

/// Counts of cards currently available to study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewableCount {
    pub new_count: usize,
    pub due_count: usize,
    pub total_reviewable: usize,
}

/// Count new and due cards, excluding suspended ones.
pub fn reviewable_count(cards: &[Flashcard], now: DateTime<Utc>) -> ReviewableCount {
    let new_count = cards
        .iter()
        .filter(|c| c.status != CardStatus::Suspended && is_new(&c.state))
        .count();
    let due_count = cards
        .iter()
        .filter(|c| c.status != CardStatus::Suspended && !is_new(&c.state) && is_due(&c.state, now))
        .count();

    ReviewableCount {
        new_count,
        due_count,
        total_reviewable: new_count + due_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardSource, CardState};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn card(id: &str, state: CardState, status: CardStatus) -> Flashcard {
        Flashcard {
            id: id.to_string(),
            deck_id: "deck-1".to_string(),
            front: format!("front {id}"),
            back: format!("back {id}"),
            front_reading: None,
            back_reading: None,
            notes: None,
            tags: vec![],
            source: CardSource::Custom,
            state,
            status,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn new_card(id: &str) -> Flashcard {
        card(id, CardState::new(now()), CardStatus::New)
    }

    fn due_card(id: &str, days_overdue: i64) -> Flashcard {
        let state = CardState {
            ease_factor: 2.5,
            interval_days: 6,
            repetitions: 2,
            due_date: now() - Duration::days(days_overdue),
            last_review: Some(now() - Duration::days(days_overdue + 6)),
        };
        card(id, state, CardStatus::Review)
    }

    fn fixed_config() -> SessionConfig {
        SessionConfig {
            randomize_order: false,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn empty_input_yields_complete_session() {
        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(&[], &fixed_config(), now(), &mut rng);
        assert!(queue.new_cards.is_empty());
        assert!(queue.review_cards.is_empty());
        assert!(is_session_complete(&queue));
        assert_eq!(get_next_card(&queue), None);
        assert_eq!(session_progress(&queue).percent_complete, 100);
    }

    #[test]
    fn queue_partitions_and_sorts_by_overdue() {
        let cards = vec![
            due_card("r1", 1),
            new_card("n1"),
            due_card("r2", 9),
            due_card("r3", 4),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(&cards, &fixed_config(), now(), &mut rng);

        assert_eq!(queue.new_cards.len(), 1);
        let review_ids: Vec<&str> = queue.review_cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(review_ids, vec!["r2", "r3", "r1"]);
    }

    #[test]
    fn suspended_and_undue_cards_are_excluded() {
        let mut undue = due_card("r1", 0);
        undue.state.due_date = now() + Duration::days(2);
        let suspended = card("s1", CardState::new(now()), CardStatus::Suspended);

        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(
            &[undue, suspended, new_card("n1")],
            &fixed_config(),
            now(),
            &mut rng,
        );
        assert_eq!(queue.review_cards.len(), 0);
        assert_eq!(queue.new_cards.len(), 1);
    }

    #[test]
    fn limits_cap_both_lists() {
        let cards: Vec<Flashcard> = (0..30)
            .map(|i| new_card(&format!("n{i}")))
            .chain((0..30).map(|i| due_card(&format!("r{i}"), 1)))
            .collect();
        let config = SessionConfig {
            max_new_cards: 5,
            max_review_cards: 10,
            randomize_order: false,
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(&cards, &config, now(), &mut rng);
        assert_eq!(queue.new_cards.len(), 5);
        assert_eq!(queue.review_cards.len(), 10);
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let cards: Vec<Flashcard> = (0..250)
            .map(|i| due_card(&format!("r{i}"), 1))
            .collect();
        let config = SessionConfig {
            max_review_cards: 0,
            randomize_order: false,
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(&cards, &config, now(), &mut rng);
        assert_eq!(queue.review_cards.len(), 250);
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let cards: Vec<Flashcard> = (0..20).map(|i| due_card(&format!("r{i}"), 1)).collect();
        let config = SessionConfig {
            randomize_order: true,
            max_review_cards: 0,
            ..SessionConfig::default()
        };
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = build_session_queue(&cards, &config, now(), &mut rng_a);
        let b = build_session_queue(&cards, &config, now(), &mut rng_b);
        assert_eq!(a, b);
    }

    /// 25 reviews and 5 new cards: a new card surfaces after 0, 10, and 20
    /// completed reviews, with the remaining new cards served once reviews
    /// are exhausted.
    #[test]
    fn interleaves_one_new_card_per_ten_reviews() {
        let cards: Vec<Flashcard> = (0..25)
            .map(|i| due_card(&format!("r{i}"), 1))
            .chain((0..5).map(|i| new_card(&format!("n{i}"))))
            .collect();
        let config = SessionConfig {
            max_new_cards: 0,
            max_review_cards: 0,
            randomize_order: false,
            ..SessionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut queue = build_session_queue(&cards, &config, now(), &mut rng);

        let mut order = Vec::new();
        while let Some(card) = get_next_card(&queue) {
            let id = card.id.clone();
            queue = mark_card_completed(&queue, id.clone());
            order.push(id);
        }

        assert_eq!(order.len(), 30);
        let new_positions: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(_, id)| id.starts_with('n'))
            .map(|(i, _)| i)
            .collect();
        // Interleave points after 0/10/20 reviews, then the tail.
        assert_eq!(new_positions, vec![0, 11, 22, 28, 29]);
        assert!(is_session_complete(&queue));
    }

    #[test]
    fn falls_back_to_new_cards_when_no_reviews_remain() {
        let cards = vec![new_card("n1"), new_card("n2")];
        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(&cards, &fixed_config(), now(), &mut rng);
        let first = get_next_card(&queue).map(|c| c.id.clone());
        assert_eq!(first.as_deref(), Some("n1"));
    }

    #[test]
    fn mark_card_completed_leaves_original_untouched() {
        let cards = vec![new_card("n1")];
        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(&cards, &fixed_config(), now(), &mut rng);
        let updated = mark_card_completed(&queue, "n1");

        assert!(queue.completed.is_empty());
        assert_eq!(queue.current_index, 0);
        assert_eq!(updated.completed, vec!["n1".to_string()]);
        assert_eq!(updated.current_index, 1);
        assert!(is_session_complete(&updated));
    }

    #[test]
    fn progress_splits_new_and_review_completions() {
        let cards = vec![new_card("n1"), due_card("r1", 1), due_card("r2", 2)];
        let mut rng = StdRng::seed_from_u64(7);
        let queue = build_session_queue(&cards, &fixed_config(), now(), &mut rng);
        let queue = mark_card_completed(&queue, "r2");
        let queue = mark_card_completed(&queue, "n1");

        let progress = session_progress(&queue);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.remaining, 1);
        assert_eq!(progress.new_completed, 1);
        assert_eq!(progress.review_completed, 1);
        assert_eq!(progress.percent_complete, 67);
    }

    #[test]
    fn display_swaps_sides_for_meaning_first() {
        let mut card = new_card("n1");
        card.front_reading = Some("よみ".to_string());
        let mut rng = StdRng::seed_from_u64(7);

        let swapped = prepare_card_for_display(&card, CardDirection::BackToFront, &mut rng);
        assert_eq!(swapped.front, card.back);
        assert_eq!(swapped.back, card.front);
        assert_eq!(swapped.back_reading, Some("よみ".to_string()));

        let fixed = prepare_card_for_display(&card, CardDirection::FrontToBack, &mut rng);
        assert_eq!(fixed.front, card.front);
        assert_eq!(fixed.front_reading, Some("よみ".to_string()));
    }

    #[test]
    fn reviewable_count_excludes_suspended() {
        let suspended = card("s1", CardState::new(now()), CardStatus::Suspended);
        let cards = vec![new_card("n1"), due_card("r1", 1), suspended];
        let counts = reviewable_count(&cards, now());
        assert_eq!(counts.new_count, 1);
        assert_eq!(counts.due_count, 1);
        assert_eq!(counts.total_reviewable, 2);
    }
}
