//! Execution ledger operations for the repository.

use crate::db::store::{CsvWriteOutcome, PasteWriteOutcome, StoreError};
use crate::domain::{Decimal, Execution, ParsedExecution};
use chrono::NaiveDate;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};
use tracing::{debug, warn};

use super::{contract_from_row, date_text, decode, decode_column, decode_optional, time_text, Repository};

const TABLE: &str = "executions";

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// What reconciling one pasted row did to the ledger.
enum PasteAction {
    AlreadyTimed,
    Backfilled,
    Inserted,
    Duplicate,
}

impl Repository {
    /// Insert CSV executions in a single transaction.
    ///
    /// Each row runs inside its own savepoint: a row that fails to write is
    /// rolled back and counted without aborting the batch. Rows colliding on
    /// the duplicate key are counted as duplicates.
    ///
    /// # Errors
    /// Returns an error if the batch transaction itself fails.
    pub async fn insert_csv_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<CsvWriteOutcome, StoreError> {
        let mut outcome = CsvWriteOutcome::default();
        if executions.is_empty() {
            return Ok(outcome);
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for execution in executions {
            outcome.dates.insert(execution.date);

            let (symbol, amount) = match execution.ledger_entry() {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(date = %execution.date, contract = %execution.contract, error = %e, "Execution not writable, row skipped");
                    outcome.failed += 1;
                    continue;
                }
            };

            let mut savepoint = Connection::begin(&mut *tx).await?;
            match insert_execution(&mut savepoint, execution, &symbol, amount, created_at).await {
                Ok(true) => {
                    savepoint.commit().await?;
                    outcome.inserted += 1;
                }
                Ok(false) => {
                    savepoint.commit().await?;
                    outcome.duplicates += 1;
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    warn!(date = %execution.date, symbol = %symbol, error = %e, "Execution insert failed, row rolled back");
                    outcome.failed += 1;
                }
            }
        }

        tx.commit().await?;
        debug!(
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            failed = outcome.failed,
            "CSV executions written"
        );
        Ok(outcome)
    }

    /// Reconcile pasted executions against the ledger.
    ///
    /// Per row, in order: a row already carrying this exact time is skipped;
    /// otherwise the oldest matching untimed row gets the time; otherwise the
    /// row is inserted with a computed amount and synthesized symbol.
    ///
    /// # Errors
    /// Returns an error if the batch transaction itself fails.
    pub async fn reconcile_paste_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<PasteWriteOutcome, StoreError> {
        let mut outcome = PasteWriteOutcome::default();
        if executions.is_empty() {
            return Ok(outcome);
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for execution in executions {
            outcome.dates.insert(execution.date);

            let (symbol, amount) = match execution.ledger_entry() {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(date = %execution.date, contract = %execution.contract, error = %e, "Execution not writable, row skipped");
                    outcome.failed += 1;
                    continue;
                }
            };

            let mut savepoint = Connection::begin(&mut *tx).await?;
            match reconcile_execution(&mut savepoint, execution, &symbol, amount, created_at).await {
                Ok(action) => {
                    savepoint.commit().await?;
                    match action {
                        PasteAction::Backfilled => outcome.updated += 1,
                        PasteAction::Inserted => outcome.inserted += 1,
                        PasteAction::AlreadyTimed | PasteAction::Duplicate => outcome.skipped += 1,
                    }
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    warn!(date = %execution.date, symbol = %symbol, error = %e, "Paste reconcile failed, row rolled back");
                    outcome.failed += 1;
                }
            }
        }

        tx.commit().await?;
        debug!(
            updated = outcome.updated,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Pasted executions reconciled"
        );
        Ok(outcome)
    }

    /// Query all executions for a trade date in insertion order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn executions_for_date(&self, date: NaiveDate) -> Result<Vec<Execution>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, date, time, transaction_type, underlying, expiration, strike,
                   option_type, quantity, price, amount, commission, symbol,
                   description, source
            FROM executions
            WHERE date = ?
            ORDER BY id ASC
            "#,
        )
        .bind(date_text(date))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(execution_from_row).collect()
    }

    /// Query every distinct trade date in the ledger.
    ///
    /// # Errors
    /// Returns an error if the query fails or a date cannot be decoded.
    pub async fn execution_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let dates: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT date FROM executions ORDER BY date ASC")
                .fetch_all(&self.pool)
                .await?;

        dates.iter().map(|d| decode(TABLE, "date", d)).collect()
    }
}

/// Insert one execution. Returns `false` when the duplicate key already exists.
async fn insert_execution(
    conn: &mut SqliteConnection,
    execution: &ParsedExecution,
    symbol: &str,
    amount: Decimal,
    created_at: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO executions (
            date, time, transaction_type, underlying, expiration, strike, option_type,
            quantity, price, amount, commission, symbol, description, source, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(date, symbol, transaction_type, quantity, price, amount) DO NOTHING
        "#,
    )
    .bind(date_text(execution.date))
    .bind(execution.time.map(time_text))
    .bind(execution.transaction_type.as_str())
    .bind(execution.contract.underlying.as_str())
    .bind(date_text(execution.contract.expiration))
    .bind(execution.contract.strike.to_canonical_string())
    .bind(execution.contract.option_type.as_str())
    .bind(execution.quantity)
    .bind(execution.price.to_canonical_string())
    .bind(amount.to_canonical_string())
    .bind(execution.commission.to_canonical_string())
    .bind(symbol)
    .bind(execution.description.as_str())
    .bind(execution.source.as_str())
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Bind the fill-identity columns shared by the paste lookups, in WHERE order.
fn bind_fill_identity<'q>(query: SqliteQuery<'q>, execution: &'q ParsedExecution) -> SqliteQuery<'q> {
    query
        .bind(date_text(execution.date))
        .bind(execution.contract.underlying.as_str())
        .bind(date_text(execution.contract.expiration))
        .bind(execution.contract.strike.to_canonical_string())
        .bind(execution.contract.option_type.as_str())
        .bind(execution.transaction_type.as_str())
        .bind(execution.quantity)
        .bind(execution.price.to_canonical_string())
}

async fn reconcile_execution(
    conn: &mut SqliteConnection,
    execution: &ParsedExecution,
    symbol: &str,
    amount: Decimal,
    created_at: i64,
) -> Result<PasteAction, sqlx::Error> {
    if let Some(time) = execution.time {
        let already_timed = bind_fill_identity(
            sqlx::query(
                r#"
                SELECT id FROM executions
                WHERE date = ? AND underlying = ? AND expiration = ? AND strike = ?
                  AND option_type = ? AND transaction_type = ? AND quantity = ? AND price = ?
                  AND time = ?
                LIMIT 1
                "#,
            ),
            execution,
        )
        .bind(time_text(time))
        .fetch_optional(&mut *conn)
        .await?;

        if already_timed.is_some() {
            return Ok(PasteAction::AlreadyTimed);
        }

        let backfilled = bind_fill_identity(
            sqlx::query(
                r#"
                UPDATE executions SET time = ?
                WHERE id = (
                    SELECT id FROM executions
                    WHERE date = ? AND underlying = ? AND expiration = ? AND strike = ?
                      AND option_type = ? AND transaction_type = ? AND quantity = ? AND price = ?
                      AND time IS NULL
                    ORDER BY id ASC
                    LIMIT 1
                )
                "#,
            )
            .bind(time_text(time)),
            execution,
        )
        .execute(&mut *conn)
        .await?;

        if backfilled.rows_affected() > 0 {
            return Ok(PasteAction::Backfilled);
        }
    }

    if insert_execution(conn, execution, symbol, amount, created_at).await? {
        Ok(PasteAction::Inserted)
    } else {
        Ok(PasteAction::Duplicate)
    }
}

fn execution_from_row(row: &SqliteRow) -> Result<Execution, StoreError> {
    Ok(Execution {
        id: row.try_get("id")?,
        date: decode_column(TABLE, row, "date")?,
        time: decode_optional(TABLE, row, "time")?,
        transaction_type: decode_column(TABLE, row, "transaction_type")?,
        contract: contract_from_row(TABLE, row)?,
        quantity: row.try_get("quantity")?,
        price: decode_column(TABLE, row, "price")?,
        amount: decode_column(TABLE, row, "amount")?,
        commission: decode_column(TABLE, row, "commission")?,
        symbol: row.try_get("symbol")?,
        description: row.try_get("description")?,
        source: decode_column(TABLE, row, "source")?,
    })
}
