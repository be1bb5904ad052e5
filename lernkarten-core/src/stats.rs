use crate::{Card, Quality, Review, QUALITY_MAX};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Serialize)]
pub struct Totals {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Index = quality rating.
    pub by_quality: [u32; QUALITY_MAX as usize + 1],
}

impl Totals {
    pub fn record(&mut self, q: Quality) {
        self.total += 1;
        if q.is_pass() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.by_quality[q.value() as usize] += 1;
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct StatsSummary {
    pub totals: Totals,
    pub per_day: BTreeMap<NaiveDate, Totals>,
}

pub fn summarize(reviews: &[Review]) -> StatsSummary {
    let mut summary = StatsSummary::default();
    for r in reviews {
        summary.totals.record(r.quality);
        let d = r.reviewed_at.date_naive();
        summary.per_day.entry(d).or_default().record(r.quality);
    }
    summary
}

/// Consecutive days with at least one review, counting back from `today`.
pub fn daily_streak(reviews: &[Review], today: NaiveDate) -> u32 {
    let per_day = summarize(reviews).per_day;
    let mut streak = 0u32;
    let mut day = today;
    while per_day.get(&day).map(|t| t.total > 0).unwrap_or(false) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Cards falling due on each of the next `days` days. Overdue cards count toward day 0.
pub fn due_forecast(cards: &[Card], now: DateTime<Utc>, days: u32) -> Vec<u32> {
    let mut buckets = vec![0u32; days as usize];
    if buckets.is_empty() {
        return buckets;
    }
    let today = now.date_naive();
    for c in cards {
        let offset = (c.next_review_date.date_naive() - today).num_days().max(0);
        if let Some(b) = buckets.get_mut(offset as usize) {
            *b += 1;
        }
    }
    buckets
}
