use crate::CardId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid quality {0}: expected a rating in 0..=5")]
    InvalidQuality(i64),
    #[error("card not found: {0}")]
    CardNotFound(CardId),
    #[error("invalid card: {0}")]
    InvalidCard(&'static str),
    #[error("duplicate card: same front and back already exist for this user")]
    DuplicateCard,
    #[error("repository unavailable: {0}")]
    Unavailable(&'static str),
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
}

impl CoreError {
    /// Whether a caller may retry the failed repository call.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Unavailable(_))
    }
}
