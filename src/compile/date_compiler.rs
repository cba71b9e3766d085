//! Date-scoped recomputation of round trips and daily summaries.

use super::CompileReport;
use crate::db::{EmptyDayPolicy, JournalStore, StoreError};
use crate::engine::{match_executions, summarize};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Compiler for per-date derived tables.
pub struct Compiler;

impl Compiler {
    /// Recompute one trade date from its executions.
    ///
    /// Derived rows are fully regenerated, so running this any number of times
    /// over the same executions yields the same round trips and summary.
    ///
    /// # Arguments
    /// * `store` - Journal store holding the date's executions
    /// * `date` - Trade date to recompute
    /// * `policy` - What to do with an existing summary when nothing matches
    ///
    /// # Errors
    /// Returns an error if loading or replacing fails; a failed replace leaves
    /// the date's previous derived rows in place.
    pub async fn compile_date(
        store: &dyn JournalStore,
        date: NaiveDate,
        policy: EmptyDayPolicy,
    ) -> Result<CompileReport, StoreError> {
        let executions = store.executions_for_date(date).await?;

        let outcome = match_executions(date, &executions);
        let summary = summarize(date, &outcome.round_trips);

        store
            .replace_derived_for_date(date, &outcome.round_trips, summary.as_ref(), policy)
            .await?;

        if !outcome.residuals.is_empty() {
            let unmatched: i64 = outcome.residuals.iter().map(|r| r.quantity).sum();
            info!(date = %date, contracts = outcome.residuals.len(), unmatched, "Unmatched quantity left open for the day");
        }
        debug!(
            date = %date,
            executions = executions.len(),
            round_trips = outcome.round_trips.len(),
            "Date compiled"
        );

        Ok(CompileReport {
            date,
            executions: executions.len(),
            round_trips: outcome.round_trips.len(),
            residuals: outcome.residuals,
            summary,
        })
    }
}
