use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_date, AppState};
use crate::domain::DailySummary;
use crate::error::AppError;
use crate::orchestration::DayView;

/// `GET /v1/days/:date` returns the summary (if any) and round trips.
pub async fn get_day(
    Path(date): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DayView>, AppError> {
    let date = parse_date(&date)?;
    Ok(Json(state.orchestrator.day(date).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayNotesRequest {
    pub notes: Option<String>,
}

/// `PUT /v1/days/:date/notes`; a null or blank value clears the notes.
pub async fn put_day_notes(
    Path(date): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<DayNotesRequest>,
) -> Result<Json<DailySummary>, AppError> {
    let date = parse_date(&date)?;
    let summary = state
        .orchestrator
        .set_day_notes(date, request.notes.as_deref())
        .await?;
    Ok(Json(summary))
}
