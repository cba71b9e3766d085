//! FIFO lot matching of one date's executions into round trips.

use crate::domain::{
    sort_fifo_queue, ContractKey, Decimal, Execution, RoundTrip, TransactionType,
    CONTRACT_MULTIPLIER,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Quantity left unmatched on one side of a contract at the end of the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residual {
    pub contract: ContractKey,
    pub transaction_type: TransactionType,
    pub quantity: i64,
}

/// Output of matching one date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub round_trips: Vec<RoundTrip>,
    /// Unmatched quantity; reported, never carried to another date.
    pub residuals: Vec<Residual>,
}

/// Head of the buy queue with its unconsumed quantity.
struct Lot<'a> {
    execution: &'a Execution,
    remaining: i64,
}

impl<'a> Lot<'a> {
    fn new(execution: &'a Execution) -> Self {
        Lot {
            execution,
            remaining: execution.quantity,
        }
    }
}

#[derive(Default)]
struct ContractQueues {
    buys: Vec<Execution>,
    sells: Vec<Execution>,
}

/// Match every contract traded on `date` first-in-first-out.
///
/// Executions dated on other days are ignored. Contracts are processed in key
/// order so the output is deterministic for a given input set.
pub fn match_executions(date: NaiveDate, executions: &[Execution]) -> MatchOutcome {
    let mut by_contract: BTreeMap<ContractKey, ContractQueues> = BTreeMap::new();
    for execution in executions.iter().filter(|e| e.date == date) {
        let queues = by_contract.entry(execution.contract.clone()).or_default();
        match execution.transaction_type {
            TransactionType::Bought => queues.buys.push(execution.clone()),
            TransactionType::Sold => queues.sells.push(execution.clone()),
        }
    }

    let mut outcome = MatchOutcome::default();
    for (contract, mut queues) in by_contract {
        sort_fifo_queue(&mut queues.buys);
        sort_fifo_queue(&mut queues.sells);
        match_contract(date, &contract, &queues.buys, &queues.sells, &mut outcome);
    }

    debug!(
        date = %date,
        round_trips = outcome.round_trips.len(),
        residuals = outcome.residuals.len(),
        "FIFO matching complete"
    );
    outcome
}

fn match_contract(
    date: NaiveDate,
    contract: &ContractKey,
    buys: &[Execution],
    sells: &[Execution],
    outcome: &mut MatchOutcome,
) {
    let mut buy_queue = buys.iter().map(Lot::new);
    let mut head = buy_queue.next();
    let mut unmatched_sold = 0i64;
    let mut match_seq = 0i64;

    for sell in sells {
        let mut remaining = sell.quantity;

        while remaining > 0 {
            let Some(lot) = head.as_mut() else {
                break;
            };

            let match_qty = remaining.min(lot.remaining);
            if match_qty > 0 {
                match_seq += 1;
                outcome.round_trips.push(build_round_trip(
                    date,
                    contract,
                    match_seq,
                    match_qty,
                    lot.execution,
                    sell,
                ));
            }

            remaining -= match_qty;
            lot.remaining -= match_qty;

            if lot.remaining <= 0 {
                head = buy_queue.next();
            }
        }

        unmatched_sold += remaining;
    }

    let unmatched_bought =
        head.map(|lot| lot.remaining).unwrap_or(0) + buy_queue.map(|lot| lot.remaining).sum::<i64>();

    for (transaction_type, quantity) in [
        (TransactionType::Bought, unmatched_bought),
        (TransactionType::Sold, unmatched_sold),
    ] {
        if quantity > 0 {
            debug!(
                date = %date,
                contract = %contract,
                side = %transaction_type,
                quantity,
                "Unmatched quantity dropped for the day"
            );
            outcome.residuals.push(Residual {
                contract: contract.clone(),
                transaction_type,
                quantity,
            });
        }
    }
}

fn build_round_trip(
    date: NaiveDate,
    contract: &ContractKey,
    match_seq: i64,
    match_qty: i64,
    buy: &Execution,
    sell: &Execution,
) -> RoundTrip {
    let qty = Decimal::from_int(match_qty);
    let multiplier = Decimal::from_int(CONTRACT_MULTIPLIER);

    let entry_cash = buy.amount_per_unit() * qty;
    let exit_cash = sell.amount_per_unit() * qty;

    let gross_pnl = (sell.price - buy.price) * qty * multiplier;
    let net_pnl = exit_cash + entry_cash;
    let commission_total = (buy.commission_per_unit() + sell.commission_per_unit()) * qty;

    let pnl_percent = sell
        .price
        .checked_div(buy.price)
        .and_then(|ratio| ratio.checked_sub(Decimal::one()))
        .and_then(|change| change.checked_mul(Decimal::hundred()))
        .unwrap_or_default();

    RoundTrip {
        date,
        contract: contract.clone(),
        match_seq,
        quantity: match_qty,
        entry_price: buy.price,
        exit_price: sell.price,
        entry_amount: entry_cash.abs().round_cents(),
        exit_amount: exit_cash.round_cents(),
        gross_pnl: gross_pnl.round_cents(),
        net_pnl: net_pnl.round_cents(),
        commission_total: commission_total.round_cents(),
        pnl_percent: pnl_percent.round_dp(4),
        entry_time: buy.time,
        exit_time: sell.time,
        hold_minutes: hold_minutes(buy, sell),
    }
}

/// Minutes between entry and exit; `None` when either time is unknown or the
/// exit precedes the entry (garbled time data, never an overnight hold).
fn hold_minutes(buy: &Execution, sell: &Execution) -> Option<i64> {
    match (buy.time, sell.time) {
        (Some(entry), Some(exit)) if exit >= entry => Some((exit - entry).num_minutes()),
        _ => None,
    }
}
