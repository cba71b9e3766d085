//! In-memory journal store for tests and dry runs.
//!
//! Mirrors the SQLite repository's duplicate key, reconciliation and
//! review-carry rules without a database.

use crate::db::store::{
    CsvWriteOutcome, EmptyDayPolicy, ImportRecord, JournalStore, PasteWriteOutcome, StoreError,
};
use crate::domain::{
    ContractKey, DailySummary, Decimal, Execution, ParsedExecution, Review, ReviewUpdate, RoundTrip,
    RoundTripRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Default)]
struct State {
    last_execution_id: i64,
    executions: Vec<Execution>,
    last_round_trip_id: i64,
    round_trips: Vec<RoundTripRecord>,
    summaries: BTreeMap<NaiveDate, DailySummary>,
    imports: Vec<ImportRecord>,
}

impl State {
    fn is_duplicate(&self, candidate: &ParsedExecution, symbol: &str, amount: Decimal) -> bool {
        self.executions.iter().any(|e| {
            e.date == candidate.date
                && e.symbol == symbol
                && e.transaction_type == candidate.transaction_type
                && e.quantity == candidate.quantity
                && e.price == candidate.price
                && e.amount == amount
        })
    }

    /// Insert unless the duplicate key exists. Returns whether a row was added.
    fn insert(&mut self, candidate: &ParsedExecution, symbol: String, amount: Decimal) -> bool {
        if self.is_duplicate(candidate, &symbol, amount) {
            return false;
        }
        self.last_execution_id += 1;
        self.executions.push(Execution {
            id: self.last_execution_id,
            date: candidate.date,
            time: candidate.time,
            transaction_type: candidate.transaction_type,
            contract: candidate.contract.clone(),
            quantity: candidate.quantity,
            price: candidate.price,
            amount,
            commission: candidate.commission,
            symbol,
            description: candidate.description.clone(),
            source: candidate.source,
        });
        true
    }
}

fn same_fill(e: &Execution, candidate: &ParsedExecution) -> bool {
    e.date == candidate.date
        && e.contract == candidate.contract
        && e.transaction_type == candidate.transaction_type
        && e.quantity == candidate.quantity
        && e.price == candidate.price
}

/// Journal store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import audit rows recorded so far, oldest first.
    pub async fn imports(&self) -> Vec<ImportRecord> {
        self.state.lock().await.imports.clone()
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn insert_csv_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<CsvWriteOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let mut outcome = CsvWriteOutcome::default();

        for execution in executions {
            outcome.dates.insert(execution.date);
            match execution.ledger_entry() {
                Ok((symbol, amount)) => {
                    if state.insert(execution, symbol, amount) {
                        outcome.inserted += 1;
                    } else {
                        outcome.duplicates += 1;
                    }
                }
                Err(e) => {
                    warn!(date = %execution.date, error = %e, "Execution not writable, row skipped");
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn reconcile_paste_executions(
        &self,
        executions: &[ParsedExecution],
    ) -> Result<PasteWriteOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let mut outcome = PasteWriteOutcome::default();

        for execution in executions {
            outcome.dates.insert(execution.date);
            let (symbol, amount) = match execution.ledger_entry() {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(date = %execution.date, error = %e, "Execution not writable, row skipped");
                    outcome.failed += 1;
                    continue;
                }
            };

            if let Some(time) = execution.time {
                if state
                    .executions
                    .iter()
                    .any(|e| same_fill(e, execution) && e.time == Some(time))
                {
                    outcome.skipped += 1;
                    continue;
                }

                // Executions are kept in id order, so the first match is the lowest id.
                if let Some(untimed) = state
                    .executions
                    .iter_mut()
                    .find(|e| same_fill(e, execution) && e.time.is_none())
                {
                    untimed.time = Some(time);
                    outcome.updated += 1;
                    continue;
                }
            }

            if state.insert(execution, symbol, amount) {
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }

        Ok(outcome)
    }

    async fn executions_for_date(&self, date: NaiveDate) -> Result<Vec<Execution>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .executions
            .iter()
            .filter(|e| e.date == date)
            .cloned()
            .collect())
    }

    async fn execution_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let state = self.state.lock().await;
        let dates: BTreeSet<NaiveDate> = state.executions.iter().map(|e| e.date).collect();
        Ok(dates.into_iter().collect())
    }

    async fn replace_derived_for_date(
        &self,
        date: NaiveDate,
        round_trips: &[RoundTrip],
        summary: Option<&DailySummary>,
        policy: EmptyDayPolicy,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        let mut reviews: HashMap<(ContractKey, i64), Review> = state
            .round_trips
            .iter()
            .filter(|r| r.trip.date == date && !r.review.is_empty())
            .map(|r| ((r.trip.contract.clone(), r.trip.match_seq), r.review.clone()))
            .collect();
        state.round_trips.retain(|r| r.trip.date != date);

        for trip in round_trips {
            state.last_round_trip_id += 1;
            let id = state.last_round_trip_id;
            let review = reviews
                .remove(&(trip.contract.clone(), trip.match_seq))
                .unwrap_or_default();
            state.round_trips.push(RoundTripRecord {
                id,
                trip: trip.clone(),
                review,
            });
        }

        match (summary, policy) {
            (Some(s), _) => {
                let notes = state.summaries.get(&date).and_then(|old| old.notes.clone());
                let mut s = s.clone();
                s.notes = notes;
                state.summaries.insert(date, s);
            }
            (None, EmptyDayPolicy::Clear) => {
                state.summaries.remove(&date);
            }
            (None, EmptyDayPolicy::Keep) => {}
        }

        Ok(())
    }

    async fn round_trips_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RoundTripRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .round_trips
            .iter()
            .filter(|r| r.trip.date == date)
            .cloned()
            .collect())
    }

    async fn reviewed_round_trips(&self) -> Result<Vec<RoundTripRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut records: Vec<RoundTripRecord> = state
            .round_trips
            .iter()
            .filter(|r| r.review.setup_type.is_some())
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.trip.date, r.id));
        Ok(records)
    }

    async fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>, StoreError> {
        Ok(self.state.lock().await.summaries.get(&date).cloned())
    }

    async fn summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailySummary>, StoreError> {
        if from > to {
            return Ok(Vec::new());
        }
        let state = self.state.lock().await;
        Ok(state.summaries.range(from..=to).map(|(_, s)| s.clone()).collect())
    }

    async fn set_review(
        &self,
        round_trip_id: i64,
        update: &ReviewUpdate,
    ) -> Result<RoundTripRecord, StoreError> {
        let mut state = self.state.lock().await;
        let record = state
            .round_trips
            .iter_mut()
            .find(|r| r.id == round_trip_id)
            .ok_or_else(|| StoreError::NotFound(format!("round trip {}", round_trip_id)))?;
        update.apply(&mut record.review);
        Ok(record.clone())
    }

    async fn set_day_notes(
        &self,
        date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<DailySummary, StoreError> {
        let mut state = self.state.lock().await;
        let summary = state
            .summaries
            .get_mut(&date)
            .ok_or_else(|| StoreError::NotFound(format!("summary for {}", date)))?;
        summary.notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Ok(summary.clone())
    }

    async fn record_import(&self, record: &ImportRecord) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        state.imports.push(record.clone());
        Ok(state.imports.len() as i64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
