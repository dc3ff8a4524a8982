use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::db::models::{HeadToHeadRecord, MatchContext, PlayerOddsProfile, Surface};
use crate::db::Database;
use crate::odds::{MatchOddsOutcome, OddsBatch, OddsEngine};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: Arc<OddsEngine>,
    pub batch: Arc<OddsBatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateOddsRequest {
    pub match_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct CalculateOddsResponse {
    pub results: Vec<MatchOddsOutcome>,
}

/// Ad-hoc odds for two profiles; nothing is persisted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub player1: PlayerOddsProfile,
    pub player2: PlayerOddsProfile,
    pub surface: Surface,
    #[serde(default)]
    pub head_to_head: Option<HeadToHeadRecord>,
}

/// Build the Axum router for the odds API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/calculate-odds", post(calculate_odds_handler))
        .route("/api/odds/preview", post(preview_handler))
        .route("/api/matches", get(matches_handler))
        .route("/api/players/:id", get(player_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/health
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/calculate-odds  {"matchIds": [..]}
async fn calculate_odds_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalculateOddsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .batch
        .run(&req.match_ids)
        .await
        .map(|results| Json(CalculateOddsResponse { results }))
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// POST /api/odds/preview
async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .compute_odds(
            &req.player1,
            &req.player2,
            &MatchContext::now(req.surface),
            req.head_to_head.as_ref(),
        )
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// GET /api/matches
async fn matches_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .list_matches(200)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/players/:id
async fn player_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.db.get_player(id) {
        Ok(Some(p)) => Ok(Json(p)),
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("player {} not found", id))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
