pub mod days;
pub mod health;
pub mod imports;
pub mod review;
pub mod stats;

use crate::error::AppError;
use crate::orchestration::ImportOrchestrator;
use axum::{
    routing::{get, patch, post, put},
    Router,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ImportOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ImportOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/imports/csv", post(imports::import_csv))
        .route("/v1/imports/paste", post(imports::import_paste))
        .route("/v1/recompute", post(imports::recompute))
        .route("/v1/days/:date", get(days::get_day))
        .route("/v1/days/:date/notes", put(days::put_day_notes))
        .route("/v1/stats", get(stats::get_stats))
        .route("/v1/setups", get(stats::get_setups))
        .route("/v1/round-trips/:id", patch(review::patch_review))
        .layer(cors)
        .with_state(state)
}

/// Parse an ISO `YYYY-MM-DD` path segment.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date {:?}, expected YYYY-MM-DD", raw)))
}
