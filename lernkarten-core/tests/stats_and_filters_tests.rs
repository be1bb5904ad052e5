use chrono::{Duration, TimeZone, Utc};
use lernkarten_core::{
    daily_streak, due_cards, due_forecast, filter_by_text, score, summarize, Card, Review, UserId,
};

fn reviewed(card: &Card, quality: i64, at: chrono::DateTime<Utc>) -> Review {
    score(card.clone(), quality, at).unwrap().review
}

#[test]
fn filters_text_and_due() {
    let now = Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap();
    let user = UserId::from("ana");
    let c1 = Card::new(user.clone(), "hola", "hello", now - Duration::days(1));
    let mut c2 = Card::new(user.clone(), "adios", "goodbye", now);
    c2.next_review_date = now + Duration::days(2);
    let c3 = Card::new(user.clone(), "gracias", "thanks", now - Duration::days(3));

    let v = vec![c1.clone(), c2.clone(), c3.clone()];

    let by_text = filter_by_text(&v, "HOL");
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].front, "hola");
    assert_eq!(filter_by_text(&v, "good")[0].id, c2.id);
    assert_eq!(filter_by_text(&v, "  ").len(), 3);

    let due: Vec<_> = due_cards(&v, now).into_iter().map(|c| c.id).collect();
    assert_eq!(due, vec![c3.id, c1.id]);
}

#[test]
fn stats_and_streak() {
    let now = Utc.with_ymd_and_hms(2024, 2, 10, 18, 0, 0).unwrap();
    let card = Card::new(UserId::from("ana"), "hola", "hello", now - Duration::days(5));

    let reviews = vec![
        reviewed(&card, 5, now - Duration::days(2)),
        reviewed(&card, 3, now - Duration::days(1)),
        reviewed(&card, 1, now),
        reviewed(&card, 4, now),
    ];

    let s = summarize(&reviews);
    assert_eq!(s.totals.total, 4);
    assert_eq!(s.totals.passed, 3);
    assert_eq!(s.totals.failed, 1);
    assert_eq!(s.totals.by_quality, [0, 1, 0, 1, 1, 1]);
    assert!((s.totals.accuracy() - 0.75).abs() < 1e-9);
    assert_eq!(s.per_day.len(), 3);

    assert_eq!(daily_streak(&reviews, now.date_naive()), 3);
    assert_eq!(
        daily_streak(&reviews, (now + Duration::days(1)).date_naive()),
        0
    );
    assert!(summarize(&[]).totals.accuracy() == 0.0);
}

#[test]
fn forecast_buckets_by_day() {
    let now = Utc.with_ymd_and_hms(2024, 2, 10, 8, 0, 0).unwrap();
    let user = UserId::from("ana");
    let mut cards = Vec::new();
    for offset in [-3i64, 0, 1, 1, 6, 30] {
        let mut c = Card::new(user.clone(), format!("f{offset}"), "b", now);
        c.next_review_date = now + Duration::days(offset);
        cards.push(c);
    }

    assert_eq!(due_forecast(&cards, now, 7), vec![2, 2, 0, 0, 0, 0, 1]);
    assert!(due_forecast(&cards, now, 0).is_empty());
}
