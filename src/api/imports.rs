use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppError;
use crate::orchestration::{CsvImportSummary, PasteImportSummary};

/// `POST /v1/imports/csv`, body is the raw export text.
pub async fn import_csv(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<CsvImportSummary>, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("Empty CSV body".into()));
    }
    Ok(Json(state.orchestrator.import_csv(&body).await?))
}

/// `POST /v1/imports/paste`, body is the copied order history.
pub async fn import_paste(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<PasteImportSummary>, AppError> {
    Ok(Json(state.orchestrator.import_paste(&body).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeRequest {
    /// Dates to recompute; every date with executions when absent.
    pub dates: Option<Vec<NaiveDate>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputedDay {
    pub date: NaiveDate,
    pub executions: usize,
    pub round_trips: usize,
    pub unmatched_quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeResponse {
    pub days: Vec<RecomputedDay>,
}

/// `POST /v1/recompute` with an optional `{"dates": [...]}` body.
pub async fn recompute(
    State(state): State<AppState>,
    request: Option<Json<RecomputeRequest>>,
) -> Result<Json<RecomputeResponse>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let reports = match request.dates {
        Some(dates) => state.orchestrator.recompute(&dates).await?,
        None => state.orchestrator.recompute_all().await?,
    };

    let days = reports
        .into_iter()
        .map(|r| RecomputedDay {
            date: r.date,
            executions: r.executions,
            round_trips: r.round_trips,
            unmatched_quantity: r.residuals.iter().map(|res| res.quantity).sum(),
        })
        .collect();

    Ok(Json(RecomputeResponse { days }))
}
