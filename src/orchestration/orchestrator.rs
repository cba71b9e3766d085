use crate::compile::{CompileReport, Compiler};
use crate::db::{EmptyDayPolicy, ImportRecord, JournalStore, StoreError};
use crate::domain::{
    DailySummary, ImportSource, PeriodStats, ReviewUpdate, RoundTripRecord, SetupPerformance,
};
use crate::engine::{period_stats, setup_performance};
use crate::normalize::{parse_csv_export, parse_order_history, NormalizeError};
use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

/// Counters returned by a CSV import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImportSummary {
    pub imported: usize,
    /// Rows already in the ledger.
    pub skipped: usize,
    /// Rows that failed to parse or to write.
    pub rejected: usize,
    /// Every date recompiled by this import.
    pub dates: Vec<NaiveDate>,
}

/// Counters returned by a paste import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteImportSummary {
    /// CSV rows that received a time.
    pub updated: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub dates: Vec<NaiveDate>,
}

/// A trading day as shown in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    pub summary: Option<DailySummary>,
    pub round_trips: Vec<RoundTripRecord>,
}

/// Drives normalize, write and recompile for raw imports.
pub struct ImportOrchestrator {
    store: Arc<dyn JournalStore>,
    policy: EmptyDayPolicy,
    // Recomputes delete and re-insert a date's rows; never let two interleave.
    recompute_lock: Mutex<()>,
}

impl ImportOrchestrator {
    pub fn new(store: Arc<dyn JournalStore>, policy: EmptyDayPolicy) -> Self {
        Self {
            store,
            policy,
            recompute_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn JournalStore> {
        &self.store
    }

    /// Import an account-activity CSV export.
    ///
    /// Every date present in the export is recompiled, even when all of its
    /// rows were duplicates.
    ///
    /// # Errors
    /// Structural format errors abort before anything is written.
    pub async fn import_csv(&self, text: &str) -> Result<CsvImportSummary, OrchestrationError> {
        let normalized = parse_csv_export(text)?;
        let outcome = self
            .store
            .insert_csv_executions(&normalized.executions)
            .await?;

        let dates: Vec<NaiveDate> = outcome.dates.iter().copied().collect();
        self.recompute(&dates).await?;

        let summary = CsvImportSummary {
            imported: outcome.inserted,
            skipped: outcome.duplicates,
            rejected: normalized.rejected + outcome.failed,
            dates,
        };

        self.store
            .record_import(&ImportRecord {
                source: ImportSource::Csv,
                content_hash: content_hash(text),
                inserted: summary.imported,
                updated: 0,
                skipped: summary.skipped,
                rejected: summary.rejected,
                dates: outcome.dates,
            })
            .await?;

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            rejected = summary.rejected,
            dates = summary.dates.len(),
            "CSV import complete"
        );
        Ok(summary)
    }

    /// Import order-history text pasted from the broker UI.
    ///
    /// # Errors
    /// Structural format errors abort before anything is written.
    pub async fn import_paste(
        &self,
        text: &str,
    ) -> Result<PasteImportSummary, OrchestrationError> {
        let normalized = parse_order_history(text)?;
        let outcome = self
            .store
            .reconcile_paste_executions(&normalized.executions)
            .await?;

        let dates: Vec<NaiveDate> = outcome.dates.iter().copied().collect();
        self.recompute(&dates).await?;

        let summary = PasteImportSummary {
            updated: outcome.updated,
            inserted: outcome.inserted,
            skipped: outcome.skipped,
            rejected: normalized.rejected + outcome.failed,
            dates,
        };

        self.store
            .record_import(&ImportRecord {
                source: ImportSource::Paste,
                content_hash: content_hash(text),
                inserted: summary.inserted,
                updated: summary.updated,
                skipped: summary.skipped,
                rejected: summary.rejected,
                dates: outcome.dates,
            })
            .await?;

        info!(
            updated = summary.updated,
            inserted = summary.inserted,
            skipped = summary.skipped,
            rejected = summary.rejected,
            dates = summary.dates.len(),
            "Paste import complete"
        );
        Ok(summary)
    }

    /// Recompile the given dates, each in its own transaction, in ascending order.
    ///
    /// # Errors
    /// Stops at the first date that fails; dates before it stay recompiled.
    pub async fn recompute(
        &self,
        dates: &[NaiveDate],
    ) -> Result<Vec<CompileReport>, OrchestrationError> {
        let unique: BTreeSet<NaiveDate> = dates.iter().copied().collect();
        let _guard = self.recompute_lock.lock().await;

        let mut reports = Vec::with_capacity(unique.len());
        for date in unique {
            reports.push(Compiler::compile_date(self.store.as_ref(), date, self.policy).await?);
        }
        Ok(reports)
    }

    /// Recompile every date that has executions.
    ///
    /// # Errors
    /// Returns an error if listing dates or any recompute fails.
    pub async fn recompute_all(&self) -> Result<Vec<CompileReport>, OrchestrationError> {
        let dates = self.store.execution_dates().await?;
        info!(dates = dates.len(), "Recomputing all dates");
        self.recompute(&dates).await
    }

    /// Summary and round trips for one date.
    ///
    /// # Errors
    /// Returns an error if the store query fails.
    pub async fn day(&self, date: NaiveDate) -> Result<DayView, OrchestrationError> {
        Ok(DayView {
            date,
            summary: self.store.daily_summary(date).await?,
            round_trips: self.store.round_trips_for_date(date).await?,
        })
    }

    /// Statistics over the inclusive range `[from, to]`.
    ///
    /// # Errors
    /// Returns an error if the store query fails.
    pub async fn period_stats(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodStats, OrchestrationError> {
        let summaries = self.store.summaries_between(from, to).await?;
        Ok(period_stats(from, to, &summaries))
    }

    /// Performance grouped by review setup type.
    ///
    /// # Errors
    /// Returns an error if the store query fails.
    pub async fn setup_performance(&self) -> Result<Vec<SetupPerformance>, OrchestrationError> {
        let reviewed = self.store.reviewed_round_trips().await?;
        Ok(setup_performance(&reviewed))
    }

    /// Edit a round trip's review fields.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` (wrapped) for an unknown id.
    pub async fn set_review(
        &self,
        round_trip_id: i64,
        update: &ReviewUpdate,
    ) -> Result<RoundTripRecord, OrchestrationError> {
        Ok(self.store.set_review(round_trip_id, update).await?)
    }

    /// Set or clear a day's journal notes.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` (wrapped) if the date has no summary.
    pub async fn set_day_notes(
        &self,
        date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<DailySummary, OrchestrationError> {
        Ok(self.store.set_day_notes(date, notes).await?)
    }
}

/// Hex SHA-256 of the raw import text.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    const CSV: &str = "\
TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
02/02/26,Bought,OPTN,QQQ---260205C00609000,2,-251.30,1.25,1.30,CALL QQQ
02/02/26,Sold,OPTN,QQQ---260205C00609000,-2,298.70,1.50,1.30,CALL QQQ
";

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = content_hash("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_import_csv_records_audit_row() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = ImportOrchestrator::new(store.clone(), EmptyDayPolicy::Keep);

        let summary = orchestrator.import_csv(CSV).await.unwrap();
        assert_eq!(summary.imported, 2);

        let imports = store.imports().await;
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].source, ImportSource::Csv);
        assert_eq!(imports[0].content_hash, content_hash(CSV));
        assert_eq!(imports[0].inserted, 2);
    }

    #[tokio::test]
    async fn test_structural_error_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = ImportOrchestrator::new(store.clone(), EmptyDayPolicy::Keep);

        let err = orchestrator.import_csv("not,a,broker,export\n").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Normalize(_)));
        assert!(store.execution_dates().await.unwrap().is_empty());
        assert!(store.imports().await.is_empty());
    }

    #[tokio::test]
    async fn test_recompute_deduplicates_dates() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = ImportOrchestrator::new(store, EmptyDayPolicy::Keep);
        orchestrator.import_csv(CSV).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let reports = orchestrator.recompute(&[date, date]).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].round_trips, 1);
    }
}
