//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct, the SQLite implementation of
//! [`JournalStore`]. Methods are organized across submodules by table family:
//! - `executions.rs` - execution ledger writes and reads
//! - `derived.rs` - round trips, daily summaries, reviews and import audit rows

mod derived;
mod executions;

use crate::db::store::{
    CsvWriteOutcome, EmptyDayPolicy, ImportRecord, JournalStore, PasteWriteOutcome, StoreError,
};
use crate::domain::{
    ContractKey, DailySummary, Execution, ParsedExecution, ReviewUpdate, RoundTrip,
    RoundTripRecord,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Repository for database operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

// =========================================================================
// Column encoding
// =========================================================================

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn time_text(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse a text column, mapping failures to `StoreError::Corrupt`.
fn decode<T>(table: &'static str, column: &str, raw: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::corrupt(table, format!("{} {:?}: {}", column, raw, e)))
}

fn decode_column<T>(table: &'static str, row: &SqliteRow, column: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: String = row.try_get(column)?;
    decode(table, column, &raw)
}

fn decode_optional<T>(
    table: &'static str,
    row: &SqliteRow,
    column: &str,
) -> Result<Option<T>, StoreError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|r| decode(table, column, &r)).transpose()
}

fn contract_from_row(table: &'static str, row: &SqliteRow) -> Result<ContractKey, StoreError> {
    Ok(ContractKey {
        underlying: row.try_get("underlying")?,
        expiration: decode_column(table, row, "expiration")?,
        strike: decode_column(table, row, "strike")?,
        option_type: decode_column(table, row, "option_type")?,
    })
}

#[async_trait]
impl JournalStore for Repository {
    async fn insert_csv_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<CsvWriteOutcome, StoreError> {
        Repository::insert_csv_executions(self, executions).await
    }

    async fn reconcile_paste_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<PasteWriteOutcome, StoreError> {
        Repository::reconcile_paste_executions(self, executions).await
    }

    async fn executions_for_date(&self, date: NaiveDate) -> Result<Vec<Execution>, StoreError> {
        Repository::executions_for_date(self, date).await
    }

    async fn execution_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        Repository::execution_dates(self).await
    }

    async fn replace_derived_for_date(
        &self,
        date: NaiveDate,
        round_trips: &[RoundTrip],
        summary: Option<&DailySummary>,
        policy: EmptyDayPolicy,
    ) -> Result<(), StoreError> {
        Repository::replace_derived_for_date(self, date, round_trips, summary, policy).await
    }

    async fn round_trips_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RoundTripRecord>, StoreError> {
        Repository::round_trips_for_date(self, date).await
    }

    async fn reviewed_round_trips(&self) -> Result<Vec<RoundTripRecord>, StoreError> {
        Repository::reviewed_round_trips(self).await
    }

    async fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>, StoreError> {
        Repository::daily_summary(self, date).await
    }

    async fn summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailySummary>, StoreError> {
        Repository::summaries_between(self, from, to).await
    }

    async fn set_review(
        &self,
        round_trip_id: i64,
        update: &ReviewUpdate,
    ) -> Result<RoundTripRecord, StoreError> {
        Repository::set_review(self, round_trip_id, update).await
    }

    async fn set_day_notes(
        &self,
        date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<DailySummary, StoreError> {
        Repository::set_day_notes(self, date, notes).await
    }

    async fn record_import(&self, record: &ImportRecord) -> Result<i64, StoreError> {
        Repository::record_import(self, record).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
