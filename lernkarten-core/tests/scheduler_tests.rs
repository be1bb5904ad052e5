use chrono::{Duration, TimeZone, Utc};
use lernkarten_core::{score, Card, CoreError, UserId, EASE_DEFAULT, EASE_MIN};

fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

#[test]
fn new_card_defaults() {
    let now = fixed_now();
    let card = Card::new(UserId::from("ana"), "hola", "hello", now);

    assert_eq!(card.repetitions, 0);
    assert_eq!(card.ease_factor, EASE_DEFAULT);
    assert_eq!(card.next_review_date, now);
    assert_eq!(card.last_review_date, now);
    assert!(card.is_due(now));
}

#[test]
fn pass_streak_schedule() {
    let now = fixed_now();
    let card = Card::new(UserId::from("ana"), "hola", "hello", now);

    // first correct answer
    let c1 = score(card, 4, now).unwrap().updated_card;
    assert_eq!(c1.repetitions, 1);
    assert_eq!(c1.next_review_date, now + Duration::days(1));
    assert!((c1.ease_factor - 2.5).abs() < 1e-9);

    // second correct answer
    let later = now + Duration::days(1);
    let c2 = score(c1, 4, later).unwrap().updated_card;
    assert_eq!(c2.repetitions, 2);
    assert_eq!(c2.next_review_date, later + Duration::days(6));

    // third: round(3 * ease factor carried in)
    let ef = c2.ease_factor;
    let later = later + Duration::days(6);
    let out = score(c2, 4, later).unwrap();
    let expected = (3.0 * ef).round() as i64;
    assert_eq!(out.updated_card.repetitions, 3);
    assert_eq!(out.interval_days as i64, expected);
    assert_eq!(out.updated_card.next_review_date, later + Duration::days(expected));
    assert_eq!(out.updated_card.last_review_date, later);
}

#[test]
fn failure_resets_repetitions_and_keeps_ease() {
    let now = fixed_now();
    let mut card = Card::new(UserId::from("ana"), "x", "y", now - Duration::days(30));
    card.repetitions = 5;
    card.ease_factor = 2.1;

    let out = score(card, 1, now).unwrap();
    let c = out.updated_card;
    assert_eq!(c.repetitions, 0);
    assert_eq!(c.next_review_date, now + Duration::days(1));
    assert_eq!(c.ease_factor, 2.1);
    assert_eq!(c.last_review_date, now);
    assert!(!out.review.passed());
}

#[test]
fn perfect_recall_raises_ease_and_barely_passing_lowers_it() {
    let now = fixed_now();
    let card = Card::new(UserId::from("ana"), "x", "y", now);

    let up = score(card.clone(), 5, now).unwrap().updated_card;
    assert!((up.ease_factor - 2.6).abs() < 1e-9);

    let down = score(card, 3, now).unwrap().updated_card;
    assert!((down.ease_factor - 2.36).abs() < 1e-9);
}

#[test]
fn ease_never_drops_below_floor() {
    let now = fixed_now();
    let mut card = Card::new(UserId::from("ana"), "x", "y", now);
    card.ease_factor = 1.35;

    let c = score(card, 3, now).unwrap().updated_card;
    assert_eq!(c.ease_factor, EASE_MIN);
}

#[test]
fn invalid_quality_is_rejected() {
    let now = fixed_now();
    let card = Card::new(UserId::from("ana"), "x", "y", now);
    let err = score(card, 7, now).err().unwrap();
    assert!(matches!(err, CoreError::InvalidQuality(7)));
}

#[test]
fn review_record_mirrors_outcome() {
    let now = fixed_now();
    let card = Card::new(UserId::from("ana"), "x", "y", now);
    let id = card.id;
    let out = score(card, 5, now).unwrap();

    assert_eq!(out.review.card_id, id);
    assert_eq!(out.review.user_id, UserId::from("ana"));
    assert_eq!(out.review.quality.value(), 5);
    assert_eq!(out.review.interval_days, 1);
    assert_eq!(out.review.ease_factor_after, out.updated_card.ease_factor);
}

#[test]
fn card_serializes_with_stable_field_names() {
    let now = fixed_now();
    let card = Card::new(UserId::from("ana"), "hola", "hello", now);
    let v = serde_json::to_value(&card).unwrap();
    let obj = v.as_object().unwrap();
    for key in [
        "id",
        "userId",
        "front",
        "back",
        "easeFactor",
        "repetitions",
        "nextReviewDate",
        "lastReviewDate",
    ] {
        assert!(obj.contains_key(key), "missing {key}");
    }
    assert_eq!(obj.len(), 8);
    assert_eq!(obj["userId"], "ana");
}
