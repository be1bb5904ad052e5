use crate::repo::{check_owner, has_duplicate};
use crate::{Card, CardId, CoreError, Review, UserId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryRepo {
    cards: RwLock<HashMap<CardId, Card>>,
    reviews: RwLock<Vec<Review>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let repo = Self::new();
        {
            let mut m = repo.cards.write();
            for c in cards {
                m.insert(c.id, c);
            }
        }
        repo
    }

    pub fn len(&self) -> usize {
        self.cards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.read().is_empty()
    }
}

#[async_trait]
impl crate::repo::CardRepository for MemoryRepo {
    async fn fetch_by_user(&self, user_id: &UserId) -> Result<Vec<Card>, CoreError> {
        Ok(self
            .cards
            .read()
            .values()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        self.cards
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::CardNotFound(id))
    }

    async fn insert_card(&self, card: &Card) -> Result<Card, CoreError> {
        let mut m = self.cards.write();
        if m.contains_key(&card.id) || has_duplicate(m.values(), card) {
            return Err(CoreError::DuplicateCard);
        }
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn update_card(&self, card: &Card) -> Result<Card, CoreError> {
        let mut m = self.cards.write();
        let Some(stored) = m.get(&card.id) else {
            return Err(CoreError::CardNotFound(card.id));
        };
        check_owner(stored, card)?;
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn upsert_card(&self, card: &Card) -> Result<Card, CoreError> {
        card.validate()?;
        let mut m = self.cards.write();
        if let Some(stored) = m.get(&card.id) {
            check_owner(stored, card)?;
        }
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        self.reviews.write().push(review.clone());
        Ok(())
    }

    async fn list_reviews(&self, user_id: &UserId) -> Result<Vec<Review>, CoreError> {
        Ok(self
            .reviews
            .read()
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }
}
