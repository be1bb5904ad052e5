//! Property tests for the scheduler and the queue.

use chrono::{DateTime, Duration, TimeZone, Utc};
use lernkarten_core::{score, Card, CardQueue, UserId, EASE_MIN, MAX_INTERVAL_DAYS};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn arb_card() -> impl Strategy<Value = Card> {
    (any::<u32>(), 1300u32..=4000u32).prop_map(|(reps, ef_milli)| {
        let mut c = Card::new(UserId::from("p"), "front", "back", base_time());
        c.repetitions = reps;
        c.ease_factor = ef_milli as f64 / 1000.0;
        c
    })
}

proptest! {
    #[test]
    fn ease_factor_stays_above_floor(qualities in proptest::collection::vec(0i64..=5, 1..60)) {
        let mut now = base_time();
        let mut card = Card::new(UserId::from("p"), "f", "b", now);
        for q in qualities {
            card = score(card, q, now).unwrap().updated_card;
            prop_assert!(card.ease_factor >= EASE_MIN);
            now = card.next_review_date;
        }
    }

    #[test]
    fn pass_increments_repetitions(card in arb_card(), q in 3i64..=5) {
        let r = card.repetitions;
        let out = score(card, q, base_time()).unwrap();
        prop_assert_eq!(out.updated_card.repetitions, r.saturating_add(1));
        prop_assert!(out.updated_card.next_review_date > base_time());
    }

    #[test]
    fn failure_resets_repetitions(card in arb_card(), q in 0i64..3) {
        let ef = card.ease_factor;
        let out = score(card, q, base_time()).unwrap();
        prop_assert_eq!(out.updated_card.repetitions, 0);
        prop_assert_eq!(out.updated_card.ease_factor, ef);
        prop_assert_eq!(out.updated_card.next_review_date, base_time() + Duration::days(1));
    }

    #[test]
    fn intervals_stay_bounded(card in arb_card(), q in 0i64..=5) {
        let out = score(card, q, base_time()).unwrap();
        prop_assert!((1..=MAX_INTERVAL_DAYS).contains(&out.interval_days));
        prop_assert_eq!(
            out.updated_card.next_review_date,
            base_time() + Duration::days(out.interval_days as i64)
        );
    }

    #[test]
    fn out_of_range_quality_is_rejected(card in arb_card(), q in prop_oneof![i64::MIN..0, 6i64..i64::MAX]) {
        prop_assert!(score(card, q, base_time()).is_err());
    }

    #[test]
    fn replay_preserves_card_set(n in 0usize..40, seed in any::<u64>()) {
        let now = base_time();
        let cards: Vec<Card> = (0..n)
            .map(|i| {
                let mut c = Card::new(UserId::from("p"), format!("f{i}"), "b", now);
                c.next_review_date = now + Duration::hours(i as i64 - 20);
                c
            })
            .collect();
        let mut ids: Vec<_> = cards.iter().map(|c| c.id).collect();

        let mut q = CardQueue::new();
        q.load(cards);
        for id in &ids {
            q.complete(*id);
        }
        q.replay_with(&mut StdRng::seed_from_u64(seed), now);

        let mut after: Vec<_> = q.cards().iter().map(|c| c.id).collect();
        ids.sort();
        after.sort();
        prop_assert_eq!(after, ids);
        for c in q.cards() {
            prop_assert!(!q.is_completed(&c.id));
        }
    }
}
