//! Round trip, daily summary, review and import-audit operations for the repository.

use crate::db::store::{EmptyDayPolicy, ImportRecord, StoreError};
use crate::domain::{
    ContractKey, DailySummary, Review, ReviewUpdate, RoundTrip, RoundTripRecord,
};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{contract_from_row, date_text, decode_column, decode_optional, time_text, Repository};

const ROUND_TRIPS: &str = "round_trips";
const DAILY_SUMMARY: &str = "daily_summary";

const ROUND_TRIP_COLUMNS: &str = r#"
    id, date, underlying, expiration, strike, option_type, match_seq, quantity,
    entry_price, exit_price, entry_amount, exit_amount, gross_pnl, net_pnl,
    commission_total, pnl_percent, entry_time, exit_time, hold_minutes,
    setup_type, notes, grade
"#;

const SUMMARY_COLUMNS: &str = r#"
    date, total_trades, winners, losers, scratches, win_rate, gross_pnl,
    commissions, net_pnl, largest_win, largest_loss, avg_winner, avg_loser,
    avg_trade, profit_factor, notes
"#;

impl Repository {
    /// Replace a date's derived rows in a single transaction.
    ///
    /// Round trips are deleted and re-inserted; review fields are re-applied to
    /// new rows with the same contract and match sequence. The summary is
    /// upserted without touching its notes. With no summary the policy decides
    /// whether an existing one is kept.
    ///
    /// # Errors
    /// Returns an error (and commits nothing) if any statement fails.
    pub async fn replace_derived_for_date(
        &self,
        date: NaiveDate,
        round_trips: &[RoundTrip],
        summary: Option<&DailySummary>,
        policy: EmptyDayPolicy,
    ) -> Result<(), StoreError> {
        let day = date_text(date);
        let mut tx = self.pool.begin().await?;

        let reviewed = sqlx::query(
            r#"
            SELECT underlying, expiration, strike, option_type, match_seq,
                   setup_type, notes, grade
            FROM round_trips
            WHERE date = ?
              AND (setup_type IS NOT NULL OR notes IS NOT NULL OR grade IS NOT NULL)
            "#,
        )
        .bind(&day)
        .fetch_all(&mut *tx)
        .await?;

        let mut reviews: HashMap<(ContractKey, i64), Review> = HashMap::new();
        for row in &reviewed {
            let key = (contract_from_row(ROUND_TRIPS, row)?, row.try_get("match_seq")?);
            reviews.insert(key, review_from_row(row)?);
        }

        sqlx::query("DELETE FROM round_trips WHERE date = ?")
            .bind(&day)
            .execute(&mut *tx)
            .await?;

        for rt in round_trips {
            let review = reviews
                .remove(&(rt.contract.clone(), rt.match_seq))
                .unwrap_or_default();

            sqlx::query(
                r#"
                INSERT INTO round_trips (
                    date, underlying, expiration, strike, option_type, direction,
                    match_seq, quantity, entry_price, exit_price, entry_amount,
                    exit_amount, gross_pnl, net_pnl, commission_total, pnl_percent,
                    entry_time, exit_time, hold_minutes, setup_type, notes, grade
                ) VALUES (?, ?, ?, ?, ?, 'Long', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&day)
            .bind(rt.contract.underlying.as_str())
            .bind(date_text(rt.contract.expiration))
            .bind(rt.contract.strike.to_canonical_string())
            .bind(rt.contract.option_type.as_str())
            .bind(rt.match_seq)
            .bind(rt.quantity)
            .bind(rt.entry_price.to_canonical_string())
            .bind(rt.exit_price.to_canonical_string())
            .bind(rt.entry_amount.to_canonical_string())
            .bind(rt.exit_amount.to_canonical_string())
            .bind(rt.gross_pnl.to_canonical_string())
            .bind(rt.net_pnl.to_canonical_string())
            .bind(rt.commission_total.to_canonical_string())
            .bind(rt.pnl_percent.to_canonical_string())
            .bind(rt.entry_time.map(time_text))
            .bind(rt.exit_time.map(time_text))
            .bind(rt.hold_minutes)
            .bind(review.setup_type)
            .bind(review.notes)
            .bind(review.grade)
            .execute(&mut *tx)
            .await?;
        }

        if !reviews.is_empty() {
            info!(date = %date, dropped = reviews.len(), "Reviewed round trips no longer produced by matching");
        }

        match (summary, policy) {
            (Some(s), _) => {
                sqlx::query(
                    r#"
                    INSERT INTO daily_summary (
                        date, total_trades, winners, losers, scratches, win_rate,
                        gross_pnl, commissions, net_pnl, largest_win, largest_loss,
                        avg_winner, avg_loser, avg_trade, profit_factor
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(date) DO UPDATE SET
                        total_trades = excluded.total_trades,
                        winners = excluded.winners,
                        losers = excluded.losers,
                        scratches = excluded.scratches,
                        win_rate = excluded.win_rate,
                        gross_pnl = excluded.gross_pnl,
                        commissions = excluded.commissions,
                        net_pnl = excluded.net_pnl,
                        largest_win = excluded.largest_win,
                        largest_loss = excluded.largest_loss,
                        avg_winner = excluded.avg_winner,
                        avg_loser = excluded.avg_loser,
                        avg_trade = excluded.avg_trade,
                        profit_factor = excluded.profit_factor
                    "#,
                )
                .bind(&day)
                .bind(s.total_trades)
                .bind(s.winners)
                .bind(s.losers)
                .bind(s.scratches)
                .bind(s.win_rate.to_canonical_string())
                .bind(s.gross_pnl.to_canonical_string())
                .bind(s.commissions.to_canonical_string())
                .bind(s.net_pnl.to_canonical_string())
                .bind(s.largest_win.to_canonical_string())
                .bind(s.largest_loss.to_canonical_string())
                .bind(s.avg_winner.map(|d| d.to_canonical_string()))
                .bind(s.avg_loser.map(|d| d.to_canonical_string()))
                .bind(s.avg_trade.to_canonical_string())
                .bind(s.profit_factor.to_canonical_string())
                .execute(&mut *tx)
                .await?;
            }
            (None, EmptyDayPolicy::Clear) => {
                sqlx::query("DELETE FROM daily_summary WHERE date = ?")
                    .bind(&day)
                    .execute(&mut *tx)
                    .await?;
            }
            (None, EmptyDayPolicy::Keep) => {}
        }

        tx.commit().await?;
        debug!(date = %date, round_trips = round_trips.len(), "Derived rows replaced");
        Ok(())
    }

    /// Query a date's round trips in match order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn round_trips_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RoundTripRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM round_trips WHERE date = ? ORDER BY id ASC",
            ROUND_TRIP_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(date_text(date))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(round_trip_from_row).collect()
    }

    /// Query every round trip tagged with a setup type.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn reviewed_round_trips(&self) -> Result<Vec<RoundTripRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM round_trips WHERE setup_type IS NOT NULL ORDER BY date ASC, id ASC",
            ROUND_TRIP_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(round_trip_from_row).collect()
    }

    /// Query the summary for one date.
    ///
    /// # Errors
    /// Returns an error if the query fails or the row cannot be decoded.
    pub async fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>, StoreError> {
        let sql = format!("SELECT {} FROM daily_summary WHERE date = ?", SUMMARY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(date_text(date))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(summary_from_row).transpose()
    }

    /// Query summaries within an inclusive date range.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailySummary>, StoreError> {
        let sql = format!(
            "SELECT {} FROM daily_summary WHERE date >= ? AND date <= ? ORDER BY date ASC",
            SUMMARY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(date_text(from))
            .bind(date_text(to))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(summary_from_row).collect()
    }

    /// Apply a review edit to one round trip.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if the id does not exist.
    pub async fn set_review(
        &self,
        round_trip_id: i64,
        update: &ReviewUpdate,
    ) -> Result<RoundTripRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {} FROM round_trips WHERE id = ?", ROUND_TRIP_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(round_trip_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("round trip {}", round_trip_id)))?;

        let mut record = round_trip_from_row(&row)?;
        update.apply(&mut record.review);

        sqlx::query("UPDATE round_trips SET setup_type = ?, notes = ?, grade = ? WHERE id = ?")
            .bind(record.review.setup_type.as_deref())
            .bind(record.review.notes.as_deref())
            .bind(record.review.grade.as_deref())
            .bind(round_trip_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Set or clear the journal notes on a day's summary.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if the date has no summary.
    pub async fn set_day_notes(
        &self,
        date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<DailySummary, StoreError> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        let result = sqlx::query("UPDATE daily_summary SET notes = ? WHERE date = ?")
            .bind(notes)
            .bind(date_text(date))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("summary for {}", date)));
        }

        self.daily_summary(date)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("summary for {}", date)))
    }

    /// Insert an import audit row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn record_import(&self, record: &ImportRecord) -> Result<i64, StoreError> {
        let dates = record
            .dates
            .iter()
            .map(|d| date_text(*d))
            .collect::<Vec<_>>()
            .join(",");

        let result = sqlx::query(
            r#"
            INSERT INTO imports (
                source, content_hash, inserted, updated, skipped, rejected, dates, received_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.source.as_str())
        .bind(record.content_hash.as_str())
        .bind(record.inserted as i64)
        .bind(record.updated as i64)
        .bind(record.skipped as i64)
        .bind(record.rejected as i64)
        .bind(dates)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

fn review_from_row(row: &SqliteRow) -> Result<Review, StoreError> {
    Ok(Review {
        setup_type: row.try_get("setup_type")?,
        notes: row.try_get("notes")?,
        grade: row.try_get("grade")?,
    })
}

fn round_trip_from_row(row: &SqliteRow) -> Result<RoundTripRecord, StoreError> {
    Ok(RoundTripRecord {
        id: row.try_get("id")?,
        trip: RoundTrip {
            date: decode_column(ROUND_TRIPS, row, "date")?,
            contract: contract_from_row(ROUND_TRIPS, row)?,
            match_seq: row.try_get("match_seq")?,
            quantity: row.try_get("quantity")?,
            entry_price: decode_column(ROUND_TRIPS, row, "entry_price")?,
            exit_price: decode_column(ROUND_TRIPS, row, "exit_price")?,
            entry_amount: decode_column(ROUND_TRIPS, row, "entry_amount")?,
            exit_amount: decode_column(ROUND_TRIPS, row, "exit_amount")?,
            gross_pnl: decode_column(ROUND_TRIPS, row, "gross_pnl")?,
            net_pnl: decode_column(ROUND_TRIPS, row, "net_pnl")?,
            commission_total: decode_column(ROUND_TRIPS, row, "commission_total")?,
            pnl_percent: decode_column(ROUND_TRIPS, row, "pnl_percent")?,
            entry_time: decode_optional(ROUND_TRIPS, row, "entry_time")?,
            exit_time: decode_optional(ROUND_TRIPS, row, "exit_time")?,
            hold_minutes: row.try_get("hold_minutes")?,
        },
        review: review_from_row(row)?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<DailySummary, StoreError> {
    Ok(DailySummary {
        date: decode_column(DAILY_SUMMARY, row, "date")?,
        total_trades: row.try_get("total_trades")?,
        winners: row.try_get("winners")?,
        losers: row.try_get("losers")?,
        scratches: row.try_get("scratches")?,
        win_rate: decode_column(DAILY_SUMMARY, row, "win_rate")?,
        gross_pnl: decode_column(DAILY_SUMMARY, row, "gross_pnl")?,
        commissions: decode_column(DAILY_SUMMARY, row, "commissions")?,
        net_pnl: decode_column(DAILY_SUMMARY, row, "net_pnl")?,
        largest_win: decode_column(DAILY_SUMMARY, row, "largest_win")?,
        largest_loss: decode_column(DAILY_SUMMARY, row, "largest_loss")?,
        avg_winner: decode_optional(DAILY_SUMMARY, row, "avg_winner")?,
        avg_loser: decode_optional(DAILY_SUMMARY, row, "avg_loser")?,
        avg_trade: decode_column(DAILY_SUMMARY, row, "avg_trade")?,
        profit_factor: decode_column(DAILY_SUMMARY, row, "profit_factor")?,
        notes: row.try_get("notes")?,
    })
}
