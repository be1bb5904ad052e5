//! Study session: queue, scheduler and repository wired together.
//!
//! Every mutating call takes `&mut self`, so a session never has two
//! score-and-persist operations in flight. A scored card only counts as
//! answered once the repository accepted it.

use crate::repo::CardRepository;
use crate::scheduler::{score, ScheduleOutcome};
use crate::screening::screen_batch;
use crate::{Card, CardDraft, CardId, CardQueue, CoreError, UserId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub inserted: Vec<Card>,
    pub duplicates: Vec<CardDraft>,
}

pub struct StudySession<R: CardRepository + ?Sized> {
    repo: Arc<R>,
    user_id: UserId,
    queue: CardQueue,
}

impl<R: CardRepository + ?Sized> StudySession<R> {
    pub fn new(repo: Arc<R>, user_id: UserId) -> Self {
        Self {
            repo,
            user_id,
            queue: CardQueue::new(),
        }
    }

    /// Builds a session and loads the user's cards.
    pub async fn open(repo: Arc<R>, user_id: UserId) -> Result<Self, CoreError> {
        let mut s = Self::new(repo, user_id);
        s.refresh().await?;
        Ok(s)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn queue(&self) -> &CardQueue {
        &self.queue
    }

    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        let cards = self.repo.fetch_by_user(&self.user_id).await?;
        debug!(user = %self.user_id, cards = cards.len(), "loaded cards");
        self.queue.load(cards);
        Ok(())
    }

    pub fn current(&self, now: DateTime<Utc>) -> Option<&Card> {
        self.queue.current(now)
    }

    /// Scores the card currently on offer. `Ok(None)` when nothing is due.
    pub async fn answer(
        &mut self,
        quality: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ScheduleOutcome>, CoreError> {
        let Some(card) = self.queue.current(now).cloned() else {
            return Ok(None);
        };
        self.score_and_persist(card, quality, now).await.map(Some)
    }

    /// Scores a specific card of this user, e.g. one addressed over HTTP.
    pub async fn answer_card(
        &mut self,
        card_id: CardId,
        quality: i64,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, CoreError> {
        let card = self.repo.get_card(card_id).await?;
        if card.user_id != self.user_id {
            return Err(CoreError::PermissionDenied("card belongs to another user"));
        }
        self.score_and_persist(card, quality, now).await
    }

    async fn score_and_persist(
        &mut self,
        card: Card,
        quality: i64,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, CoreError> {
        let card_id = card.id;
        let outcome = score(card, quality, now)?;

        if let Err(e) = self.repo.update_card(&outcome.updated_card).await {
            warn!(card = %card_id, error = %e, "persisting review failed; card stays in queue");
            return Err(e);
        }
        if let Err(e) = self.repo.insert_review(&outcome.review).await {
            warn!(card = %card_id, error = %e, "review log write failed");
        }

        info!(
            card = %card_id,
            quality,
            repetitions = outcome.updated_card.repetitions,
            interval_days = outcome.interval_days,
            "card scored"
        );
        self.queue.replace(outcome.updated_card.clone());
        self.queue.complete(card_id);
        Ok(outcome)
    }

    pub fn replay(&mut self, now: DateTime<Utc>) -> Option<&Card> {
        debug!(user = %self.user_id, "replaying session");
        self.queue.replay(now)
    }

    pub async fn add_card(
        &mut self,
        front: &str,
        back: &str,
        now: DateTime<Utc>,
    ) -> Result<Card, CoreError> {
        let card = Card::new(self.user_id.clone(), front, back, now);
        let stored = self.repo.insert_card(&card).await?;
        info!(card = %stored.id, user = %self.user_id, "card added");
        self.refresh().await?;
        Ok(stored)
    }

    /// Persists the drafts that are not already present for this user.
    pub async fn add_batch(
        &mut self,
        drafts: Vec<CardDraft>,
        now: DateTime<Utc>,
    ) -> Result<BatchReport, CoreError> {
        let existing = self.repo.fetch_by_user(&self.user_id).await?;
        let screened = screen_batch(&existing, &self.user_id, drafts);

        let mut report = BatchReport {
            inserted: Vec::with_capacity(screened.accepted.len()),
            duplicates: screened.duplicates,
        };
        for d in screened.accepted {
            let card = d.clone().into_card(self.user_id.clone(), now);
            match self.repo.insert_card(&card).await {
                Ok(c) => report.inserted.push(c),
                Err(CoreError::DuplicateCard) => report.duplicates.push(d),
                Err(e) => return Err(e),
            }
        }
        info!(
            user = %self.user_id,
            inserted = report.inserted.len(),
            duplicates = report.duplicates.len(),
            "batch added"
        );
        self.refresh().await?;
        Ok(report)
    }

    /// Changes card content only; scheduling fields are left alone.
    pub async fn edit_card(
        &mut self,
        card_id: CardId,
        front: Option<String>,
        back: Option<String>,
    ) -> Result<Card, CoreError> {
        let mut card = self.repo.get_card(card_id).await?;
        if card.user_id != self.user_id {
            return Err(CoreError::PermissionDenied("card belongs to another user"));
        }
        if let Some(f) = front {
            card.front = f;
        }
        if let Some(b) = back {
            card.back = b;
        }

        let existing = self.repo.fetch_by_user(&self.user_id).await?;
        if crate::repo::has_duplicate(&existing, &card) {
            return Err(CoreError::DuplicateCard);
        }
        let stored = self.repo.update_card(&card).await?;
        self.refresh().await?;
        Ok(stored)
    }
}
