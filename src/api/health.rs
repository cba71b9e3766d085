use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::db::JournalStore;
use crate::error::AppError;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the journal store answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.orchestrator.store().ping().await?;
    Ok(Json(serde_json::json!({"status": "ready"})))
}
