use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_date, AppState};
use crate::domain::{PeriodStats, SetupPerformance};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub from: String,
    pub to: String,
}

/// `GET /v1/stats?from=YYYY-MM-DD&to=YYYY-MM-DD`
pub async fn get_stats(
    Query(params): Query<StatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PeriodStats>, AppError> {
    let from = parse_date(&params.from)?;
    let to = parse_date(&params.to)?;
    if from > to {
        return Err(AppError::BadRequest("from must not be after to".into()));
    }
    Ok(Json(state.orchestrator.period_stats(from, to).await?))
}

/// `GET /v1/setups`
pub async fn get_setups(
    State(state): State<AppState>,
) -> Result<Json<Vec<SetupPerformance>>, AppError> {
    Ok(Json(state.orchestrator.setup_performance().await?))
}
