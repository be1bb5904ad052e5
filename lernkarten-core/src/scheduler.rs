use crate::{Card, CoreError, Quality, Review, EASE_MIN};
use chrono::{DateTime, Duration, Utc};

/// Longest interval handed out, about a century.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

pub struct ScheduleOutcome {
    pub updated_card: Card,
    pub review: Review,
    pub interval_days: u32,
}

fn clamp_ease(x: f64) -> f64 {
    x.max(EASE_MIN)
}

fn ease_delta(q: f64) -> f64 {
    0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)
}

/// Interval in days for a pass that brings the card to `repetitions`.
fn pass_interval(repetitions: u32, ease_factor: f64) -> u32 {
    match repetitions {
        0 | 1 => 1,
        2 => 6,
        n => (n as f64 * ease_factor)
            .round()
            .max(1.0)
            .min(MAX_INTERVAL_DAYS as f64) as u32,
    }
}

/// Validates `quality` and schedules the card's next review.
///
/// The returned card is provisional: nothing is persisted here.
pub fn score(card: Card, quality: i64, now: DateTime<Utc>) -> Result<ScheduleOutcome, CoreError> {
    let quality = Quality::new(quality)?;
    Ok(apply_quality(card, quality, now))
}

pub fn apply_quality(mut card: Card, quality: Quality, now: DateTime<Utc>) -> ScheduleOutcome {
    let q = quality.value() as f64;

    let interval = if quality.is_pass() {
        card.repetitions = card.repetitions.saturating_add(1);
        let interval = pass_interval(card.repetitions, card.ease_factor);
        card.ease_factor = clamp_ease(card.ease_factor + ease_delta(q));
        interval
    } else {
        // ease factor stays put on a lapse
        card.repetitions = 0;
        1
    };

    card.next_review_date = now
        .checked_add_signed(Duration::days(interval as i64))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    card.last_review_date = now;

    let review = Review::new(&card, quality, now, interval);

    ScheduleOutcome {
        updated_card: card,
        review,
        interval_days: interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    #[test]
    fn intervals_follow_bootstrap_then_growth() {
        assert_eq!(pass_interval(1, 2.5), 1);
        assert_eq!(pass_interval(2, 2.5), 6);
        assert_eq!(pass_interval(3, 2.5), 8);
        assert_eq!(pass_interval(4, 1.3), 5);
        assert_eq!(pass_interval(100_000_000, 2.5), MAX_INTERVAL_DAYS);
        assert_eq!(pass_interval(u32::MAX, f64::NAN), 1);
    }

    #[test]
    fn huge_repetition_counts_do_not_overflow() {
        let now = Utc::now();
        let mut card = Card::new(UserId::from("u"), "a", "b", now);
        card.repetitions = u32::MAX;
        let out = score(card, 5, now).unwrap();
        assert_eq!(out.updated_card.repetitions, u32::MAX);
        assert_eq!(out.interval_days, MAX_INTERVAL_DAYS);
        assert_eq!(
            out.updated_card.next_review_date,
            now + Duration::days(MAX_INTERVAL_DAYS as i64)
        );
    }

    #[test]
    fn due_date_saturates_at_the_calendar_edge() {
        let now = DateTime::<Utc>::MAX_UTC - Duration::days(3);
        let mut card = Card::new(UserId::from("u"), "a", "b", now);
        card.repetitions = 10;
        let out = score(card, 4, now).unwrap();
        assert_eq!(out.updated_card.next_review_date, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn ease_delta_by_quality() {
        assert!((ease_delta(5.0) - 0.1).abs() < 1e-9);
        assert!(ease_delta(4.0).abs() < 1e-9);
        assert!((ease_delta(3.0) + 0.14).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let now = Utc::now();
        let card = Card::new(UserId::from("u"), "a", "b", now);
        assert!(matches!(
            score(card.clone(), 6, now),
            Err(CoreError::InvalidQuality(6))
        ));
        assert!(matches!(
            score(card, -1, now),
            Err(CoreError::InvalidQuality(-1))
        ));
    }
}
