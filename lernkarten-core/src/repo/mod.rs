use crate::{Card, CardId, CoreError, Review, UserId};
use async_trait::async_trait;

pub mod memory;

/// Card store a study session reads from and writes scored cards back to.
///
/// Writes replace whole records; implementations never merge individual
/// scheduling fields.
#[async_trait]
pub trait CardRepository: Send + Sync {
    // Cards
    async fn fetch_by_user(&self, user_id: &UserId) -> Result<Vec<Card>, CoreError>;
    async fn get_card(&self, id: CardId) -> Result<Card, CoreError>;
    /// Fails with `DuplicateCard` when the owner already has the same front and back.
    async fn insert_card(&self, card: &Card) -> Result<Card, CoreError>;
    /// Fails with `CardNotFound` when the id is unknown; never creates.
    async fn update_card(&self, card: &Card) -> Result<Card, CoreError>;
    /// Creates or overwrites the whole record. Rejects cards that fail
    /// [`Card::validate`] with `InvalidCard`.
    async fn upsert_card(&self, card: &Card) -> Result<Card, CoreError>;

    // Reviews
    async fn insert_review(&self, review: &Review) -> Result<(), CoreError>;
    async fn list_reviews(&self, user_id: &UserId) -> Result<Vec<Review>, CoreError>;
}

/// Ownership check shared by the store implementations.
pub fn check_owner(stored: &Card, incoming: &Card) -> Result<(), CoreError> {
    if stored.user_id != incoming.user_id {
        return Err(CoreError::PermissionDenied("card belongs to another user"));
    }
    Ok(())
}

/// Whether `cards` already hold a card with the same content as `card` for its owner,
/// ignoring `card` itself.
pub fn has_duplicate<'a>(cards: impl IntoIterator<Item = &'a Card>, card: &Card) -> bool {
    cards
        .into_iter()
        .any(|c| c.id != card.id && c.is_duplicate_of(&card.user_id, &card.front, &card.back))
}
