//! Multi-day rollups over persisted summaries and reviewed round trips.

use super::daily_aggregator::win_rate;
use crate::domain::{DailySummary, Decimal, PeriodStats, RoundTripRecord, SetupPerformance};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Roll daily summaries within `[from, to]` up into period statistics.
pub fn period_stats(from: NaiveDate, to: NaiveDate, summaries: &[DailySummary]) -> PeriodStats {
    let days: Vec<&DailySummary> = summaries
        .iter()
        .filter(|s| s.date >= from && s.date <= to)
        .collect();

    let total_trades: i64 = days.iter().map(|s| s.total_trades).sum();
    let winners: i64 = days.iter().map(|s| s.winners).sum();
    let losers: i64 = days.iter().map(|s| s.losers).sum();
    let net_pnl: Decimal = days.iter().map(|s| s.net_pnl).sum();

    let avg_daily = if days.is_empty() {
        None
    } else {
        Some((net_pnl / Decimal::from_int(days.len() as i64)).round_dp(4))
    };

    PeriodStats {
        from,
        to,
        days_traded: days.len() as i64,
        total_trades,
        winners,
        losers,
        win_rate: win_rate(winners, total_trades),
        net_pnl,
        commissions: days.iter().map(|s| s.commissions).sum(),
        best_day: days.iter().map(|s| s.net_pnl).max(),
        worst_day: days.iter().map(|s| s.net_pnl).min(),
        avg_daily,
    }
}

/// Group reviewed round trips by setup type, best total first.
///
/// A trip counts as a win here when its net P/L is positive; the scratch
/// deadband only applies to daily summaries.
pub fn setup_performance(round_trips: &[RoundTripRecord]) -> Vec<SetupPerformance> {
    let mut groups: BTreeMap<&str, Vec<Decimal>> = BTreeMap::new();
    for record in round_trips {
        if let Some(setup) = record.review.setup_type.as_deref() {
            groups.entry(setup).or_default().push(record.trip.net_pnl);
        }
    }

    let mut performance: Vec<SetupPerformance> = groups
        .into_iter()
        .map(|(setup, nets)| {
            let trade_count = nets.len() as i64;
            let wins = nets.iter().filter(|n| n.is_positive()).count() as i64;
            let total_pnl: Decimal = nets.iter().sum();
            SetupPerformance {
                setup_type: setup.to_string(),
                trade_count,
                win_rate: win_rate(wins, trade_count),
                total_pnl,
                avg_pnl: (total_pnl / Decimal::from_int(trade_count)).round_dp(4),
            }
        })
        .collect();

    // Stable sort keeps the name order among equal totals.
    performance.sort_by(|a, b| b.total_pnl.cmp(&a.total_pnl));
    performance
}
