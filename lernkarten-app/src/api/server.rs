use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::routes::{add_card, due_cards, list_cards, post_review, stats, AppState, CardLocks};
use lernkarten_core::CardRepository;

pub fn router(repo: Arc<dyn CardRepository>) -> Router {
    let state = Arc::new(AppState {
        repo,
        card_locks: CardLocks::default(),
    });

    Router::new()
        .route("/users/:user/cards", get(list_cards).post(add_card))
        .route("/users/:user/due", get(due_cards))
        .route("/users/:user/review", post(post_review))
        .route("/users/:user/stats", get(stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(repo: Arc<dyn CardRepository>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(repo);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
