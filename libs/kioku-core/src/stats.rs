//! Statistics derived from cards, review history, and daily counters.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::sm2::is_due;
use crate::types::{CardStatus, DailyStats, Flashcard, ReviewLog, DEFAULT_EASE_FACTOR};

/// Cards with an interval at or above this are considered mature.
const MATURE_INTERVAL_DAYS: i64 = 21;

/// Fraction of reviews in the trailing window rated Good or Easy.
///
/// Returns 0 when the window contains no reviews.
pub fn retention_rate(reviews: &[ReviewLog], period_days: i64, now: DateTime<Utc>) -> f64 {
    let cutoff = now - Duration::days(period_days);
    let mut total = 0usize;
    let mut correct = 0usize;
    for review in reviews.iter().filter(|r| r.reviewed_at >= cutoff) {
        total += 1;
        if review.rating.is_correct() {
            correct += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// Current and longest daily review streaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}

/// Compute streaks over the UTC calendar days that contain reviews.
///
/// The current streak is anchored to today or yesterday; it is 0 when
/// neither day has a review.
pub fn streaks(reviews: &[ReviewLog], now: DateTime<Utc>) -> StreakSummary {
    let days: BTreeSet<NaiveDate> = reviews.iter().map(|r| r.reviewed_at.date_naive()).collect();
    let latest = match days.iter().next_back() {
        Some(day) => *day,
        None => return StreakSummary::default(),
    };

    let today = now.date_naive();
    let yesterday = today - Duration::days(1);

    let mut current = 0u32;
    if latest == today || latest == yesterday {
        current = 1;
        let mut cursor = latest - Duration::days(1);
        while days.contains(&cursor) {
            current += 1;
            cursor = cursor - Duration::days(1);
        }
    }

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for &day in &days {
        run = match prev {
            Some(p) if day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    StreakSummary { current, longest }
}

/// One day of the review forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub due: usize,
}

/// Count non-suspended cards due on each of the next `days_ahead` calendar
/// days. Days with nothing due get explicit zero entries.
pub fn forecast_reviews(
    cards: &[Flashcard],
    days_ahead: usize,
    now: DateTime<Utc>,
) -> Vec<ForecastDay> {
    let start = now.date_naive();
    let mut buckets: Vec<ForecastDay> = (0..days_ahead)
        .map(|i| ForecastDay {
            date: start + Duration::days(i as i64),
            due: 0,
        })
        .collect();

    for card in cards {
        if card.status == CardStatus::Suspended {
            continue;
        }
        let offset = (card.state.due_date.date_naive() - start).num_days();
        if offset >= 0 && (offset as usize) < days_ahead {
            buckets[offset as usize].due += 1;
        }
    }

    buckets
}

/// Aggregate statistics for one deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckStats {
    pub total_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub review_cards: usize,
    pub suspended_cards: usize,
    pub due_today: usize,
    pub due_tomorrow: usize,
    /// Mean over cards with at least one review; 2.5 when there are none.
    pub average_ease_factor: f64,
    /// Trailing-30-day retention, as a rounded percentage.
    pub retention_rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Compute the full per-deck summary.
pub fn deck_stats(cards: &[Flashcard], reviews: &[ReviewLog], now: DateTime<Utc>) -> DeckStats {
    let mut new_cards = 0;
    let mut learning_cards = 0;
    let mut review_cards = 0;
    let mut suspended_cards = 0;
    for card in cards {
        match card.status {
            CardStatus::New => new_cards += 1,
            CardStatus::Learning => learning_cards += 1,
            CardStatus::Review => review_cards += 1,
            CardStatus::Suspended => suspended_cards += 1,
        }
    }

    let due_today = cards
        .iter()
        .filter(|c| c.status != CardStatus::Suspended && is_due(&c.state, now))
        .count();
    let tomorrow = now + Duration::days(1);
    let due_tomorrow = cards
        .iter()
        .filter(|c| {
            c.status != CardStatus::Suspended
                && c.state.due_date > now
                && c.state.due_date <= tomorrow
        })
        .count();

    let reviewed: Vec<&Flashcard> = cards
        .iter()
        .filter(|c| c.state.last_review.is_some())
        .collect();
    let average_ease_factor = if reviewed.is_empty() {
        DEFAULT_EASE_FACTOR
    } else {
        let sum: f64 = reviewed.iter().map(|c| c.state.ease_factor).sum();
        (sum / reviewed.len() as f64 * 100.0).round() / 100.0
    };

    let retention = (retention_rate(reviews, 30, now) * 100.0).round();
    let streak = streaks(reviews, now);

    DeckStats {
        total_cards: cards.len(),
        new_cards,
        learning_cards,
        review_cards,
        suspended_cards,
        due_today,
        due_tomorrow,
        average_ease_factor,
        retention_rate: retention,
        current_streak: streak.current,
        longest_streak: streak.longest,
    }
}

/// Totals across a set of daily-stats rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyStatsSummary {
    pub total_reviewed: u64,
    pub total_new_learned: u64,
    pub total_correct: u64,
    pub total_incorrect: u64,
    pub total_study_time_ms: u64,
    /// Mean reviews over days that had any; 0 when no day did.
    pub average_per_day: u64,
    /// Count of days with at least one review.
    pub days: usize,
}

/// Sum counters across daily-stats rows.
pub fn aggregate_daily_stats(rows: &[DailyStats]) -> DailyStatsSummary {
    let mut summary = DailyStatsSummary::default();
    for row in rows {
        summary.total_reviewed += u64::from(row.reviewed);
        summary.total_new_learned += u64::from(row.new_learned);
        summary.total_correct += u64::from(row.correct);
        summary.total_incorrect += u64::from(row.incorrect);
        summary.total_study_time_ms += row.study_time_ms;
        if row.reviewed > 0 {
            summary.days += 1;
        }
    }
    if summary.days > 0 {
        summary.average_per_day =
            (summary.total_reviewed as f64 / summary.days as f64).round() as u64;
    }
    summary
}

/// Cards with an interval of at least 21 days.
pub fn mature_card_count(cards: &[Flashcard]) -> usize {
    cards
        .iter()
        .filter(|c| c.state.interval_days >= MATURE_INTERVAL_DAYS)
        .count()
}

/// Cards with an interval between 1 and 20 days.
pub fn young_card_count(cards: &[Flashcard]) -> usize {
    cards
        .iter()
        .filter(|c| c.state.interval_days > 0 && c.state.interval_days < MATURE_INTERVAL_DAYS)
        .count()
}

/// Render a study duration for display.
pub fn format_study_time(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardSource, CardState, Rating};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap()
    }

    fn review(id: &str, rating: Rating, reviewed_at: DateTime<Utc>) -> ReviewLog {
        let state = CardState::new(reviewed_at);
        ReviewLog {
            id: id.to_string(),
            card_id: "card-1".to_string(),
            deck_id: "deck-1".to_string(),
            rating,
            response_time_ms: 1500,
            previous_state: state.clone(),
            new_state: state,
            reviewed_at,
        }
    }

    fn card_due_at(id: &str, due: DateTime<Utc>, status: CardStatus) -> Flashcard {
        let state = CardState {
            ease_factor: 2.5,
            interval_days: 6,
            repetitions: 2,
            due_date: due,
            last_review: Some(due - Duration::days(6)),
        };
        Flashcard {
            id: id.to_string(),
            deck_id: "deck-1".to_string(),
            front: "front".to_string(),
            back: "back".to_string(),
            front_reading: None,
            back_reading: None,
            notes: None,
            tags: vec![],
            source: CardSource::Custom,
            state,
            status,
            created_at: due - Duration::days(30),
            updated_at: due,
        }
    }

    #[test]
    fn retention_counts_good_and_easy_in_window() {
        let reviews = vec![
            review("1", Rating::Good, now() - Duration::days(1)),
            review("2", Rating::Easy, now() - Duration::days(2)),
            review("3", Rating::Again, now() - Duration::days(3)),
            review("4", Rating::Hard, now() - Duration::days(4)),
            // Outside the 30-day window.
            review("5", Rating::Again, now() - Duration::days(45)),
        ];
        assert_eq!(retention_rate(&reviews, 30, now()), 0.5);
    }

    #[test]
    fn retention_is_zero_without_reviews() {
        assert_eq!(retention_rate(&[], 30, now()), 0.0);
        let old = vec![review("1", Rating::Good, now() - Duration::days(60))];
        assert_eq!(retention_rate(&old, 30, now()), 0.0);
    }

    #[test]
    fn streak_counts_consecutive_days_back_from_today() {
        // Reviews on D, D-1, D-2, and an isolated D-5.
        let reviews = vec![
            review("1", Rating::Good, now()),
            review("2", Rating::Good, now() - Duration::days(1)),
            review("3", Rating::Again, now() - Duration::days(2)),
            review("4", Rating::Good, now() - Duration::days(5)),
        ];
        let summary = streaks(&reviews, now());
        assert_eq!(summary.current, 3);
        assert_eq!(summary.longest, 3);
    }

    #[test]
    fn streak_allows_yesterday_anchor() {
        let reviews = vec![
            review("1", Rating::Good, now() - Duration::days(1)),
            review("2", Rating::Good, now() - Duration::days(2)),
        ];
        assert_eq!(streaks(&reviews, now()).current, 2);
    }

    #[test]
    fn streak_breaks_without_recent_review() {
        let reviews = vec![
            review("1", Rating::Good, now() - Duration::days(3)),
            review("2", Rating::Good, now() - Duration::days(4)),
        ];
        let summary = streaks(&reviews, now());
        assert_eq!(summary.current, 0);
        assert_eq!(summary.longest, 2);
    }

    #[test]
    fn streak_longest_spans_old_history() {
        let reviews = vec![
            review("1", Rating::Good, now()),
            review("2", Rating::Good, now() - Duration::days(10)),
            review("3", Rating::Good, now() - Duration::days(11)),
            review("4", Rating::Good, now() - Duration::days(12)),
            review("5", Rating::Good, now() - Duration::days(13)),
        ];
        let summary = streaks(&reviews, now());
        assert_eq!(summary.current, 1);
        assert_eq!(summary.longest, 4);
    }

    #[test]
    fn multiple_reviews_same_day_count_once() {
        let reviews = vec![
            review("1", Rating::Good, now()),
            review("2", Rating::Again, now() - Duration::hours(2)),
        ];
        let summary = streaks(&reviews, now());
        assert_eq!(summary.current, 1);
        assert_eq!(summary.longest, 1);
    }

    #[test]
    fn forecast_has_explicit_zero_days() {
        let cards = vec![
            card_due_at("1", now() + Duration::days(2), CardStatus::Review),
            card_due_at("2", now() + Duration::days(2), CardStatus::Review),
            card_due_at("3", now() + Duration::days(6), CardStatus::Review),
            // Suspended cards are excluded.
            card_due_at("4", now() + Duration::days(2), CardStatus::Suspended),
            // Beyond the horizon.
            card_due_at("5", now() + Duration::days(30), CardStatus::Review),
        ];
        let forecast = forecast_reviews(&cards, 7, now());
        assert_eq!(forecast.len(), 7);
        assert_eq!(forecast[0].date, now().date_naive());
        let counts: Vec<usize> = forecast.iter().map(|d| d.due).collect();
        assert_eq!(counts, vec![0, 0, 2, 0, 0, 0, 1]);
    }

    #[test]
    fn deck_stats_aggregates_counts() {
        let mut new = card_due_at("1", now(), CardStatus::New);
        new.state = CardState::new(now());
        let cards = vec![
            new,
            card_due_at("2", now() - Duration::days(1), CardStatus::Review),
            card_due_at("3", now() + Duration::hours(6), CardStatus::Review),
            card_due_at("4", now() + Duration::days(3), CardStatus::Learning),
            card_due_at("5", now(), CardStatus::Suspended),
        ];
        let reviews = vec![
            review("1", Rating::Good, now() - Duration::days(1)),
            review("2", Rating::Again, now() - Duration::days(1)),
        ];

        let stats = deck_stats(&cards, &reviews, now());
        assert_eq!(stats.total_cards, 5);
        assert_eq!(stats.new_cards, 1);
        assert_eq!(stats.learning_cards, 1);
        assert_eq!(stats.review_cards, 2);
        assert_eq!(stats.suspended_cards, 1);
        // New card (due now) and the overdue review card.
        assert_eq!(stats.due_today, 2);
        assert_eq!(stats.due_tomorrow, 1);
        assert_eq!(stats.average_ease_factor, 2.5);
        assert_eq!(stats.retention_rate, 50.0);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn deck_stats_defaults_ease_without_reviewed_cards() {
        let mut card = card_due_at("1", now(), CardStatus::New);
        card.state = CardState::new(now());
        let stats = deck_stats(&[card], &[], now());
        assert_eq!(stats.average_ease_factor, 2.5);
        assert_eq!(stats.retention_rate, 0.0);
    }

    #[test]
    fn aggregate_averages_over_active_days_only() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let mut a = DailyStats::empty(day(1), "deck-1");
        a.reviewed = 20;
        a.correct = 15;
        a.incorrect = 5;
        a.study_time_ms = 60_000;
        let mut b = DailyStats::empty(day(2), "deck-1");
        b.reviewed = 10;
        b.new_learned = 3;
        b.study_time_ms = 30_000;
        let idle = DailyStats::empty(day(3), "deck-1");

        let summary = aggregate_daily_stats(&[a, b, idle]);
        assert_eq!(summary.total_reviewed, 30);
        assert_eq!(summary.total_new_learned, 3);
        assert_eq!(summary.total_correct, 15);
        assert_eq!(summary.total_incorrect, 5);
        assert_eq!(summary.total_study_time_ms, 90_000);
        assert_eq!(summary.days, 2);
        assert_eq!(summary.average_per_day, 15);
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        let summary = aggregate_daily_stats(&[]);
        assert_eq!(summary.average_per_day, 0);
        assert_eq!(summary.days, 0);
    }

    #[test]
    fn maturity_buckets_split_on_interval() {
        let mut mature = card_due_at("1", now(), CardStatus::Review);
        mature.state.interval_days = 21;
        let mut young = card_due_at("2", now(), CardStatus::Review);
        young.state.interval_days = 6;
        let mut fresh = card_due_at("3", now(), CardStatus::New);
        fresh.state.interval_days = 0;

        let cards = vec![mature, young, fresh];
        assert_eq!(mature_card_count(&cards), 1);
        assert_eq!(young_card_count(&cards), 1);
    }

    #[test]
    fn study_time_formats_by_magnitude() {
        assert_eq!(format_study_time(45_000), "45s");
        assert_eq!(format_study_time(150_000), "2m 30s");
        assert_eq!(format_study_time(3_900_000), "1h 5m");
    }
}
