//! Due-ordered working set for one study session.
//!
//! The queue holds a snapshot of the learner's cards plus the ids answered in
//! this session. The repository stays the owner of the canonical records; the
//! snapshot is only replaced through [`CardQueue::load`].

use crate::{Card, CardId};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

#[derive(Clone, Debug, Default)]
pub struct CardQueue {
    cards: Vec<Card>,
    completed: HashSet<CardId>,
    replaying: bool,
}

impl CardQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot, ordered by next review date. Equal dates keep input order.
    pub fn load(&mut self, cards: Vec<Card>) {
        let mut cards = cards;
        cards.sort_by_key(|c| c.next_review_date);
        self.cards = cards;
        self.replaying = false;
    }

    /// Next card to offer, or `None` when nothing is left for this session.
    ///
    /// During a replay the due-date filter is lifted so answered cards come back.
    pub fn current(&self, now: DateTime<Utc>) -> Option<&Card> {
        self.cards
            .iter()
            .find(|c| !self.completed.contains(&c.id) && (self.replaying || c.is_due(now)))
    }

    pub fn complete(&mut self, card_id: CardId) {
        self.completed.insert(card_id);
    }

    /// Swaps in a newer version of a card already in the snapshot, keeping its position.
    pub fn replace(&mut self, card: Card) -> bool {
        match self.cards.iter_mut().find(|c| c.id == card.id) {
            Some(slot) => {
                *slot = card;
                true
            }
            None => false,
        }
    }

    pub fn is_completed(&self, card_id: &CardId) -> bool {
        self.completed.contains(card_id)
    }

    pub fn replay(&mut self, now: DateTime<Utc>) -> Option<&Card> {
        self.replay_with(&mut rand::thread_rng(), now)
    }

    pub fn replay_with<R: Rng + ?Sized>(&mut self, rng: &mut R, now: DateTime<Utc>) -> Option<&Card> {
        self.completed.clear();
        self.cards.shuffle(rng);
        self.replaying = true;
        self.current(now)
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Cards still on offer in this session.
    pub fn remaining(&self, now: DateTime<Utc>) -> usize {
        self.cards
            .iter()
            .filter(|c| !self.completed.contains(&c.id) && (self.replaying || c.is_due(now)))
            .count()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
