use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregator::{CollectibleStatus, CollectiblesAggregator, RefreshOutcome};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<CollectiblesAggregator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/collectibles", get(current_status))
        .route("/collectibles/refresh", post(refresh))
        .route("/collectibles/cache", delete(clear_cache))
        .route("/collectibles/{principal}", get(status_for))
        .route("/identity", put(put_identity))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn current_status(State(state): State<AppState>) -> Json<CollectibleStatus> {
    Json(state.aggregator.status())
}

async fn status_for(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> Json<CollectibleStatus> {
    Json(state.aggregator.get_count(Some(&principal)))
}

#[derive(serde::Deserialize)]
struct RefreshParams {
    #[serde(default)]
    force: bool,
}

async fn refresh(
    State(state): State<AppState>,
    Query(q): Query<RefreshParams>,
) -> Json<RefreshOutcome> {
    Json(state.aggregator.refresh(q.force).await)
}

async fn clear_cache(State(state): State<AppState>) -> Json<CollectibleStatus> {
    state.aggregator.clear_cache();
    Json(state.aggregator.status())
}

#[derive(serde::Deserialize)]
struct IdentityReq {
    #[serde(default)]
    principal: Option<String>,
}

/// Switch identity; a new identity gets its initial check in the background.
async fn put_identity(
    State(state): State<AppState>,
    Json(body): Json<IdentityReq>,
) -> (StatusCode, Json<CollectibleStatus>) {
    let agg = state.aggregator.clone();
    let changed = agg.set_identity(body.principal);
    let mut code = StatusCode::OK;
    if changed && agg.identity().is_some() {
        let bg = agg.clone();
        tokio::spawn(async move {
            let outcome = bg.refresh(false).await;
            tracing::debug!(target: "collectibles", outcome = ?outcome, "initial check");
        });
        code = StatusCode::ACCEPTED;
    }
    (code, Json(agg.status()))
}
