use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use lernkarten_core::{
    daily_streak, due_cards as filter_due, due_forecast, summarize, Card, CardId, CardRepository,
    CoreError, StudySession, UserId,
};

use crate::api::dto::{ErrorOut, NewCardIn, ReviewIn, ReviewOut, StatsOut};

pub struct AppState {
    pub repo: Arc<dyn CardRepository>,
    pub card_locks: CardLocks,
}

/// One async lock per card id so two reviews of the same card never interleave
/// their score and persist steps. An entry lives only while someone holds or
/// waits for it.
#[derive(Default)]
pub struct CardLocks {
    locks: SyncMutex<HashMap<CardId, Arc<Mutex<()>>>>,
}

impl CardLocks {
    pub async fn lock(&self, id: CardId) -> CardGuard<'_> {
        let m = self.locks.lock().entry(id).or_default().clone();
        let guard = m.clone().lock_owned().await;
        CardGuard {
            locks: self,
            id,
            mutex: m,
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct CardGuard<'a> {
    locks: &'a CardLocks,
    id: CardId,
    mutex: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CardGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.locks.lock();
        // the map and this guard are the only owners left: nobody is waiting
        if Arc::strong_count(&self.mutex) == 2 {
            map.remove(&self.id);
        }
    }
}

pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::InvalidQuality(_) | CoreError::InvalidCard(_) => StatusCode::BAD_REQUEST,
            CoreError::CardNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::DuplicateCard => StatusCode::CONFLICT,
            CoreError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        (status, Json(ErrorOut { error: self.0.to_string() })).into_response()
    }
}

#[derive(Deserialize)]
pub struct DueQuery {
    max: Option<usize>,
}

/// Longest due forecast a client may ask for.
pub const MAX_FORECAST_DAYS: u32 = 365;

#[derive(Deserialize)]
pub struct StatsQuery {
    days: Option<u32>,
}

pub async fn list_cards(
    State(st): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<Vec<Card>>, ApiError> {
    let mut cards = st.repo.fetch_by_user(&UserId::new(user)).await?;
    cards.sort_by_key(|c| c.next_review_date);
    Ok(Json(cards))
}

pub async fn due_cards(
    State(st): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(q): Query<DueQuery>,
) -> Result<Json<Vec<Card>>, ApiError> {
    let cards = st.repo.fetch_by_user(&UserId::new(user)).await?;
    let mut due = filter_due(&cards, Utc::now());
    if let Some(m) = q.max {
        due.truncate(m);
    }
    Ok(Json(due))
}

pub async fn add_card(
    State(st): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(body): Json<NewCardIn>,
) -> Result<(StatusCode, Json<Card>), ApiError> {
    let mut session = StudySession::new(st.repo.clone(), UserId::new(user));
    let card = session.add_card(&body.front, &body.back, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn post_review(
    State(st): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(body): Json<ReviewIn>,
) -> Result<Json<ReviewOut>, ApiError> {
    let _guard = st.card_locks.lock(body.card_id).await;
    let mut session = StudySession::new(st.repo.clone(), UserId::new(user));
    let out = session
        .answer_card(body.card_id, body.quality, Utc::now())
        .await?;
    Ok(Json(ReviewOut {
        card: out.updated_card,
        interval_days: out.interval_days,
    }))
}

pub async fn stats(
    State(st): State<Arc<AppState>>,
    Path(user): Path<String>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<StatsOut>, ApiError> {
    let user = UserId::new(user);
    let now = Utc::now();
    let reviews = st.repo.list_reviews(&user).await?;
    let cards = st.repo.fetch_by_user(&user).await?;
    let summary = summarize(&reviews);
    Ok(Json(StatsOut {
        cards: cards.len(),
        accuracy: summary.totals.accuracy(),
        streak_days: daily_streak(&reviews, now.date_naive()),
        due_forecast: due_forecast(&cards, now, q.days.unwrap_or(7).min(MAX_FORECAST_DAYS)),
        summary,
    }))
}
