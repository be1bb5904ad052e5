use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::CoreError;

pub type CardId = Uuid;
pub type ReviewId = Uuid;

/// Floor applied after every ease-factor update.
pub const EASE_MIN: f64 = 1.3;
pub const EASE_DEFAULT: f64 = 2.5;
/// Lowest quality that counts as "remembered".
pub const PASS_THRESHOLD: u8 = 3;
pub const QUALITY_MAX: u8 = 5;

/// Opaque owner identifier handed out by the identity provider.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Self-reported recall on the 0 (blackout) to 5 (perfect) scale.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: i64) -> Result<Self, CoreError> {
        if (0..=QUALITY_MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(CoreError::InvalidQuality(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= PASS_THRESHOLD
    }
}

impl TryFrom<i64> for Quality {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub front: String,
    pub back: String,

    pub ease_factor: f64,
    pub repetitions: u32,
    pub next_review_date: DateTime<Utc>,
    pub last_review_date: DateTime<Utc>,
}

impl Card {
    pub fn new(
        user_id: UserId,
        front: impl Into<String>,
        back: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            front: front.into(),
            back: back.into(),
            ease_factor: EASE_DEFAULT,
            repetitions: 0,
            next_review_date: now,
            last_review_date: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    /// Rejects records that could not have come out of the scheduler,
    /// e.g. hand-edited import files.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.ease_factor.is_finite() || self.ease_factor < EASE_MIN {
            return Err(CoreError::InvalidCard("ease factor below 1.3 or not a number"));
        }
        Ok(())
    }

    /// Exact front/back match for the same owner.
    pub fn is_duplicate_of(&self, user_id: &UserId, front: &str, back: &str) -> bool {
        &self.user_id == user_id && self.front == front && self.back == back
    }
}

/// A front/back pair not yet persisted, e.g. produced by a text service or an import file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
}

impl CardDraft {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }

    pub fn into_card(self, user_id: UserId, now: DateTime<Utc>) -> Card {
        Card::new(user_id, self.front, self.back, now)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub card_id: CardId,
    pub user_id: UserId,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
    pub interval_days: u32,
    pub ease_factor_after: f64,
}

impl Review {
    pub fn new(
        card: &Card,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
        interval_days: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id: card.id,
            user_id: card.user_id.clone(),
            quality,
            reviewed_at,
            interval_days,
            ease_factor_after: card.ease_factor,
        }
    }

    pub fn passed(&self) -> bool {
        self.quality.is_pass()
    }
}
