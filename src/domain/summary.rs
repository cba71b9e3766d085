//! Per-day statistics and multi-day rollups.

use crate::domain::Decimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate statistics for one trading date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_trades: i64,
    pub winners: i64,
    pub losers: i64,
    pub scratches: i64,
    pub win_rate: Decimal,
    pub gross_pnl: Decimal,
    pub commissions: Decimal,
    pub net_pnl: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub avg_winner: Option<Decimal>,
    pub avg_loser: Option<Decimal>,
    pub avg_trade: Decimal,
    pub profit_factor: Decimal,
    /// Journal notes for the day; kept across recomputes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Rollup of daily summaries over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_traded: i64,
    pub total_trades: i64,
    pub winners: i64,
    pub losers: i64,
    pub win_rate: Decimal,
    pub net_pnl: Decimal,
    pub commissions: Decimal,
    pub best_day: Option<Decimal>,
    pub worst_day: Option<Decimal>,
    pub avg_daily: Option<Decimal>,
}

/// Performance of round trips grouped by their review setup type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPerformance {
    pub setup_type: String,
    pub trade_count: i64,
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
}
