//! Closed positions produced by the FIFO matcher.

use crate::domain::{ContractKey, Decimal};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One matched buy/sell pair for a contract on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTrip {
    pub date: NaiveDate,
    pub contract: ContractKey,
    /// 1-based ordinal of this match within its contract and date.
    pub match_seq: i64,
    pub quantity: i64,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    /// Cash paid for the matched quantity, as a positive number.
    pub entry_amount: Decimal,
    /// Cash received for the matched quantity.
    pub exit_amount: Decimal,
    /// Price-only P/L, fees excluded.
    pub gross_pnl: Decimal,
    /// Cash P/L, fees included.
    pub net_pnl: Decimal,
    pub commission_total: Decimal,
    pub pnl_percent: Decimal,
    pub entry_time: Option<NaiveTime>,
    pub exit_time: Option<NaiveTime>,
    pub hold_minutes: Option<i64>,
}

/// Hand-entered review fields. The engine carries them across recomputes but never writes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub setup_type: Option<String>,
    pub notes: Option<String>,
    pub grade: Option<String>,
}

impl Review {
    pub fn is_empty(&self) -> bool {
        self.setup_type.is_none() && self.notes.is_none() && self.grade.is_none()
    }
}

/// Partial edit of review fields: `None` leaves a field alone, a blank string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    pub setup_type: Option<String>,
    pub notes: Option<String>,
    pub grade: Option<String>,
}

impl ReviewUpdate {
    pub fn apply(&self, review: &mut Review) {
        fn merge(target: &mut Option<String>, update: &Option<String>) {
            if let Some(value) = update {
                let value = value.trim();
                *target = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
        }
        merge(&mut review.setup_type, &self.setup_type);
        merge(&mut review.notes, &self.notes);
        merge(&mut review.grade, &self.grade);
    }
}

/// A persisted round trip with its row id and review fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTripRecord {
    pub id: i64,
    #[serde(flatten)]
    pub trip: RoundTrip,
    #[serde(flatten)]
    pub review: Review,
}
