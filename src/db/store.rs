//! Storage abstraction for the journal.
//!
//! The orchestrator and compiler only ever talk to a `JournalStore`, so the
//! SQLite repository and the in-memory store are interchangeable.

use crate::domain::{
    DailySummary, Execution, ImportSource, ParsedExecution, ReviewUpdate, RoundTrip,
    RoundTripRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by a journal store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            table,
            reason: reason.into(),
        }
    }
}

/// What to do with a date's summary when recomputation yields no round trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyDayPolicy {
    /// Leave the previous summary in place.
    #[default]
    Keep,
    /// Delete the summary so every stored summary reflects current round trips.
    Clear,
}

impl EmptyDayPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyDayPolicy::Keep => "keep",
            EmptyDayPolicy::Clear => "clear",
        }
    }
}

impl fmt::Display for EmptyDayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmptyDayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(EmptyDayPolicy::Keep),
            "clear" => Ok(EmptyDayPolicy::Clear),
            other => Err(format!("expected keep or clear, got {:?}", other)),
        }
    }
}

/// Result of writing a batch of CSV executions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvWriteOutcome {
    pub inserted: usize,
    /// Rows already present under the duplicate key.
    pub duplicates: usize,
    /// Rows refused before writing or whose write was rolled back on its own.
    pub failed: usize,
    /// Trade dates of every processed row, duplicates included.
    pub dates: BTreeSet<NaiveDate>,
}

/// Result of reconciling a batch of pasted executions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteWriteOutcome {
    /// Existing rows whose missing time was backfilled.
    pub updated: usize,
    pub inserted: usize,
    /// Rows already present with the same time, or colliding on the duplicate key.
    pub skipped: usize,
    pub failed: usize,
    pub dates: BTreeSet<NaiveDate>,
}

/// Audit row for one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub source: ImportSource,
    /// Hex SHA-256 of the raw input text.
    pub content_hash: String,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub dates: BTreeSet<NaiveDate>,
}

/// Persistence operations the journal engine depends on.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Insert CSV executions idempotently in one batch transaction.
    async fn insert_csv_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<CsvWriteOutcome, StoreError>;

    /// Backfill times on matching CSV rows, or insert pasted rows that have no counterpart.
    async fn reconcile_paste_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<PasteWriteOutcome, StoreError>;

    /// All executions for a trade date, in insertion order.
    async fn executions_for_date(&self, date: NaiveDate) -> Result<Vec<Execution>, StoreError>;

    /// Every distinct trade date with at least one execution, ascending.
    async fn execution_dates(&self) -> Result<Vec<NaiveDate>, StoreError>;

    /// Atomically replace a date's round trips and summary.
    ///
    /// Review fields of round trips whose (contract, match sequence) survives
    /// are carried over. With no summary, `policy` decides whether the stored
    /// one is kept or removed.
    async fn replace_derived_for_date(
        &self,
        date: NaiveDate,
        round_trips: &[RoundTrip],
        summary: Option<&DailySummary>,
        policy: EmptyDayPolicy,
    ) -> Result<(), StoreError>;

    async fn round_trips_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RoundTripRecord>, StoreError>;

    /// Round trips carrying a setup type, across all dates.
    async fn reviewed_round_trips(&self) -> Result<Vec<RoundTripRecord>, StoreError>;

    async fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>, StoreError>;

    /// Summaries with `from <= date <= to`, ascending.
    async fn summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailySummary>, StoreError>;

    /// Edit review fields of one round trip.
    ///
    /// # Errors
    /// `StoreError::NotFound` if no round trip has this id.
    async fn set_review(
        &self,
        round_trip_id: i64,
        update: &ReviewUpdate,
    ) -> Result<RoundTripRecord, StoreError>;

    /// Set or clear the journal notes of a day that has a summary.
    async fn set_day_notes(
        &self,
        date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<DailySummary, StoreError>;

    /// Persist an import audit row, returning its id.
    async fn record_import(&self, record: &ImportRecord) -> Result<i64, StoreError>;

    /// Cheap liveness probe of the backing store.
    async fn ping(&self) -> Result<(), StoreError>;
}
