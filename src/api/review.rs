use axum::extract::{Path, State};
use axum::Json;

use super::AppState;
use crate::domain::{ReviewUpdate, RoundTripRecord};
use crate::error::AppError;

/// `PATCH /v1/round-trips/:id`. Omitted fields are left alone, blank strings clear.
pub async fn patch_review(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(update): Json<ReviewUpdate>,
) -> Result<Json<RoundTripRecord>, AppError> {
    Ok(Json(state.orchestrator.set_review(id, &update).await?))
}
