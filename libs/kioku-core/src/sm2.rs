//! SM-2 spaced repetition scheduling.
//!
//! Based on: <https://www.supermemo.com/en/archives1990-2015/english/ol/sm2>
//!
//! Pure functions over `(CardState, Rating, now)`; no clock access and no
//! failure paths.

use chrono::{DateTime, Duration, Utc};

use crate::types::{CardState, CardStatus, Rating};

const MIN_EASE_FACTOR: f64 = 1.3;
const EASY_BONUS: f64 = 1.3;
const HARD_MULTIPLIER: f64 = 1.2;
const LAPSE_INTERVAL: i64 = 1;
const GRADUATING_INTERVAL: i64 = 1;
const SECOND_INTERVAL: i64 = 6;
const EASY_INTERVAL: i64 = 4;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Map a 4-button rating to an SM-2 quality score (0-5 scale).
pub fn rating_to_quality(rating: Rating) -> u8 {
    match rating {
        Rating::Again => 0,
        Rating::Hard => 2,
        Rating::Good => 3,
        Rating::Easy => 5,
    }
}

/// SM-2 ease update: `EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))`,
/// floored at 1.3.
pub fn next_ease_factor(ease: f64, quality: u8) -> f64 {
    let q = f64::from(quality);
    let delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
    (ease + delta).max(MIN_EASE_FACTOR)
}

/// Compute the scheduling state after a review.
///
/// Output invariants: `ease_factor >= 1.3`; `interval_days == 1` after
/// Again, `>= 1` otherwise.
pub fn calculate_next_state(state: &CardState, rating: Rating, now: DateTime<Utc>) -> CardState {
    let quality = rating_to_quality(rating);
    let mut ease = next_ease_factor(state.ease_factor, quality);

    let (interval, repetitions) = match rating {
        Rating::Again => {
            // Lapse: reset progress, with a penalty beyond the standard formula.
            ease = (ease - 0.2).max(MIN_EASE_FACTOR);
            (LAPSE_INTERVAL, 0)
        }
        Rating::Hard => {
            let interval = if state.repetitions == 0 {
                GRADUATING_INTERVAL
            } else {
                (state.interval_days as f64 * HARD_MULTIPLIER).round() as i64
            };
            (interval.max(1), state.repetitions + 1)
        }
        Rating::Good => {
            let interval = match state.repetitions {
                0 => GRADUATING_INTERVAL,
                1 => SECOND_INTERVAL,
                _ => (state.interval_days as f64 * ease).round() as i64,
            };
            (interval.max(1), state.repetitions + 1)
        }
        Rating::Easy => {
            let interval = if state.repetitions == 0 {
                EASY_INTERVAL
            } else {
                (state.interval_days as f64 * ease * EASY_BONUS).round() as i64
            };
            (interval.max(1), state.repetitions + 1)
        }
    };

    CardState {
        ease_factor: ease,
        interval_days: interval,
        repetitions,
        due_date: now + Duration::days(interval),
        last_review: Some(now),
    }
}

/// Whether the card's scheduled review instant has passed.
pub fn is_due(state: &CardState, now: DateTime<Utc>) -> bool {
    state.due_date <= now
}

/// Whether the card has never been reviewed.
pub fn is_new(state: &CardState) -> bool {
    state.repetitions == 0 && state.last_review.is_none()
}

/// Whole days past the due date; negative while the card is not yet due.
pub fn days_overdue(state: &CardState, now: DateTime<Utc>) -> i64 {
    (now - state.due_date).num_milliseconds().div_euclid(MS_PER_DAY)
}

/// Derive the status implied by the scheduling state.
///
/// `Suspended` is never returned; it is set externally.
pub fn determine_status(state: &CardState) -> CardStatus {
    if state.last_review.is_none() {
        CardStatus::New
    } else if state.repetitions < 2 || state.interval_days < 1 {
        CardStatus::Learning
    } else {
        CardStatus::Review
    }
}

/// Next interval in days for each rating, without committing a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IntervalPreview {
    pub again: i64,
    pub hard: i64,
    pub good: i64,
    pub easy: i64,
}

/// Preview the interval each rating would produce ("press X, see it again
/// in Y days").
pub fn preview_intervals(state: &CardState, now: DateTime<Utc>) -> IntervalPreview {
    IntervalPreview {
        again: calculate_next_state(state, Rating::Again, now).interval_days,
        hard: calculate_next_state(state, Rating::Hard, now).interval_days,
        good: calculate_next_state(state, Rating::Good, now).interval_days,
        easy: calculate_next_state(state, Rating::Easy, now).interval_days,
    }
}

/// Human-readable interval for UI display.
pub fn format_interval(days: i64) -> String {
    if days < 1 {
        return "< 1 day".to_string();
    }
    if days == 1 {
        return "1 day".to_string();
    }
    if days < 7 {
        return format!("{days} days");
    }
    if days < 30 {
        let weeks = (days as f64 / 7.0).round() as i64;
        return if weeks == 1 {
            "1 week".to_string()
        } else {
            format!("{weeks} weeks")
        };
    }
    if days < 365 {
        let months = (days as f64 / 30.0).round() as i64;
        return if months == 1 {
            "1 month".to_string()
        } else {
            format!("{months} months")
        };
    }
    format!("{:.1} years", days as f64 / 365.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn reviewed_state(ease: f64, interval: i64, repetitions: u32) -> CardState {
        CardState {
            ease_factor: ease,
            interval_days: interval,
            repetitions,
            due_date: now(),
            last_review: Some(now() - Duration::days(interval.max(1))),
        }
    }

    #[test]
    fn new_card_good_graduates_to_one_day() {
        let state = CardState::new(now());
        let next = calculate_next_state(&state, Rating::Good, now());
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.due_date, now() + Duration::days(1));
        assert_eq!(next.last_review, Some(now()));
    }

    #[test]
    fn second_good_review_gets_six_days() {
        let state = reviewed_state(2.5, 1, 1);
        let next = calculate_next_state(&state, Rating::Good, now());
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.repetitions, 2);
    }

    #[test]
    fn new_card_easy_gets_four_days() {
        let state = CardState::new(now());
        let next = calculate_next_state(&state, Rating::Easy, now());
        assert_eq!(next.interval_days, 4);
    }

    #[test]
    fn again_resets_repetitions_and_interval() {
        let state = reviewed_state(2.5, 40, 5);
        let next = calculate_next_state(&state, Rating::Again, now());
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn again_applies_extra_ease_penalty() {
        let state = reviewed_state(2.5, 10, 3);
        let next = calculate_next_state(&state, Rating::Again, now());
        // Quality 0 lowers ease by 0.8, lapse penalty by another 0.2.
        assert!((next.ease_factor - 1.5).abs() < 1e-9);
    }

    #[test]
    fn ease_factor_never_below_floor() {
        let mut state = reviewed_state(1.3, 10, 3);
        for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            state = calculate_next_state(&state, rating, now());
            assert!(state.ease_factor >= 1.3);
        }
    }

    #[test]
    fn hard_multiplies_interval_with_floor() {
        let state = reviewed_state(2.5, 10, 3);
        let next = calculate_next_state(&state, Rating::Hard, now());
        assert_eq!(next.interval_days, 12);
        assert_eq!(next.repetitions, 4);
        assert!(next.ease_factor < state.ease_factor);
    }

    #[test]
    fn good_multiplies_interval_by_new_ease() {
        let state = reviewed_state(2.5, 10, 3);
        let next = calculate_next_state(&state, Rating::Good, now());
        // Quality 3 lowers ease to 2.36; round(10 * 2.36) = 24.
        assert_eq!(next.interval_days, 24);
    }

    #[test]
    fn easy_applies_bonus_multiplier() {
        let state = reviewed_state(2.5, 10, 3);
        let next = calculate_next_state(&state, Rating::Easy, now());
        // Quality 5 raises ease to 2.6; round(10 * 2.6 * 1.3) = 34.
        assert_eq!(next.interval_days, 34);
        assert!((next.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn interval_at_least_one_on_every_path() {
        let state = reviewed_state(1.3, 0, 2);
        for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            let next = calculate_next_state(&state, rating, now());
            assert!(next.interval_days >= 1, "{rating:?}");
        }
    }

    #[test]
    fn is_due_is_monotonic_in_now() {
        let state = reviewed_state(2.5, 3, 2);
        assert!(is_due(&state, now()));
        assert!(is_due(&state, now() + Duration::hours(1)));
        assert!(!is_due(&state, now() - Duration::seconds(1)));
    }

    #[test]
    fn is_new_requires_no_reviews() {
        assert!(is_new(&CardState::new(now())));
        assert!(!is_new(&reviewed_state(2.5, 1, 1)));
    }

    #[test]
    fn days_overdue_floors_negative_values() {
        let mut state = CardState::new(now());
        state.due_date = now() + Duration::hours(12);
        assert_eq!(days_overdue(&state, now()), -1);
        state.due_date = now() - Duration::days(3);
        assert_eq!(days_overdue(&state, now()), 3);
    }

    #[test]
    fn status_follows_review_progress() {
        let state = CardState::new(now());
        assert_eq!(determine_status(&state), CardStatus::New);

        let after_one = calculate_next_state(&state, Rating::Good, now());
        assert_eq!(determine_status(&after_one), CardStatus::Learning);

        let after_two = calculate_next_state(&after_one, Rating::Good, now());
        assert_eq!(determine_status(&after_two), CardStatus::Review);
    }

    #[test]
    fn preview_does_not_modify_state() {
        let state = reviewed_state(2.5, 6, 2);
        let before = state.clone();
        let preview = preview_intervals(&state, now());
        assert_eq!(state, before);
        assert_eq!(preview.again, 1);
        assert_eq!(preview.hard, 7);
        // Good at ease 2.36 from interval 6: round(14.16) = 14.
        assert_eq!(preview.good, 14);
    }

    #[test]
    fn format_interval_picks_units() {
        assert_eq!(format_interval(0), "< 1 day");
        assert_eq!(format_interval(1), "1 day");
        assert_eq!(format_interval(3), "3 days");
        assert_eq!(format_interval(14), "2 weeks");
        assert_eq!(format_interval(61), "2 months");
        assert_eq!(format_interval(730), "2.0 years");
    }
}
