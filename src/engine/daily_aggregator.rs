//! Per-day statistics over a date's round trips.

use crate::domain::{DailySummary, Decimal, RoundTrip};
use chrono::NaiveDate;

/// Net P/L within plus or minus this many dollars counts as a scratch.
pub fn scratch_band() -> Decimal {
    Decimal::one()
}

/// Denominator floor for the profit factor on days without losses.
pub fn profit_factor_floor() -> Decimal {
    Decimal::from_scaled(1, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    Winner,
    Loser,
    Scratch,
}

/// Classify a net P/L against the scratch deadband (bounds inclusive).
pub fn classify(net_pnl: Decimal) -> TradeOutcome {
    let band = scratch_band();
    if net_pnl > band {
        TradeOutcome::Winner
    } else if net_pnl < -band {
        TradeOutcome::Loser
    } else {
        TradeOutcome::Scratch
    }
}

/// Win rate in percent, 4 dp; zero for an empty sample.
pub(crate) fn win_rate(winners: i64, total: i64) -> Decimal {
    if total == 0 {
        return Decimal::zero();
    }
    (Decimal::from_int(winners) * Decimal::hundred() / Decimal::from_int(total)).round_dp(4)
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().sum();
    Some((total / Decimal::from_int(values.len() as i64)).round_dp(4))
}

/// Summarize one date's round trips. Returns `None` when there are none.
pub fn summarize(date: NaiveDate, round_trips: &[RoundTrip]) -> Option<DailySummary> {
    if round_trips.is_empty() {
        return None;
    }

    let total_trades = round_trips.len() as i64;
    let mut winners = 0i64;
    let mut losers = 0i64;
    let mut scratches = 0i64;
    for rt in round_trips {
        match classify(rt.net_pnl) {
            TradeOutcome::Winner => winners += 1,
            TradeOutcome::Loser => losers += 1,
            TradeOutcome::Scratch => scratches += 1,
        }
    }

    let nets: Vec<Decimal> = round_trips.iter().map(|rt| rt.net_pnl).collect();
    let positive: Vec<Decimal> = nets.iter().copied().filter(|n| n.is_positive()).collect();
    let negative: Vec<Decimal> = nets.iter().copied().filter(|n| n.is_negative()).collect();

    let total_wins: Decimal = positive.iter().sum();
    let total_losses: Decimal = negative.iter().sum();
    let profit_factor = (total_wins / total_losses.abs().max(profit_factor_floor())).round_dp(4);

    // Non-empty input, so min/max exist.
    let largest_win = nets.iter().copied().max().unwrap_or_default();
    let largest_loss = nets.iter().copied().min().unwrap_or_default();

    Some(DailySummary {
        date,
        total_trades,
        winners,
        losers,
        scratches,
        win_rate: win_rate(winners, total_trades),
        gross_pnl: round_trips.iter().map(|rt| rt.gross_pnl).sum(),
        commissions: round_trips.iter().map(|rt| rt.commission_total).sum(),
        net_pnl: nets.iter().sum(),
        largest_win,
        largest_loss,
        avg_winner: mean(&positive),
        avg_loser: mean(&negative),
        avg_trade: mean(&nets).unwrap_or_default(),
        profit_factor,
        notes: None,
    })
}
