//! Order history pasted from the broker web UI.
//!
//! Each line is tab-separated:
//! `status \t description \t timestamp \t quantity \t price \t commission`.
//! The description follows a fixed grammar, e.g.
//! `Buy Open 2 QQQ Feb 05 '26 $609 Call Limit`, and the timestamp looks like
//! `02/02/26 9:41:07 AM EST`.

use super::{parse_us_date, NormalizeError, Normalized};
use crate::domain::{
    ContractKey, Decimal, ImportSource, OptionType, ParsedExecution, TransactionType,
};
use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};

/// Status column value of filled orders.
pub const EXECUTED_STATUS: &str = "Executed";

/// Minimum column count of an order line; the trailing commission column is
/// often dropped by the clipboard.
const MIN_COLUMNS: usize = 5;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parsed order description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDescription {
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub contract: ContractKey,
}

/// Normalize pasted order-history text.
///
/// # Errors
/// Returns [`NormalizeError::NotOrderHistory`] when non-blank text contains no
/// tab-separated order line at all.
pub fn parse_order_history(text: &str) -> Result<Normalized, NormalizeError> {
    let mut normalized = Normalized::default();
    let mut saw_order_line = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let columns: Vec<&str> = raw_line.split('\t').map(str::trim).collect();
        if columns.len() < MIN_COLUMNS {
            continue;
        }
        saw_order_line = true;

        if columns[0] != EXECUTED_STATUS {
            continue;
        }

        match parse_executed_line(&columns) {
            Ok(execution) => normalized.executions.push(execution),
            Err(reason) => {
                warn!(line = line_no, reason = %reason, "Unparseable executed order, skipping");
                normalized.rejected += 1;
            }
        }
    }

    if !saw_order_line && !text.trim().is_empty() {
        return Err(NormalizeError::NotOrderHistory);
    }

    debug!(
        executions = normalized.executions.len(),
        rejected = normalized.rejected,
        "Order history normalized"
    );
    Ok(normalized)
}

fn parse_executed_line(columns: &[&str]) -> Result<ParsedExecution, String> {
    let description = parse_description(columns[1])?;
    let (date, time) = parse_timestamp(columns[2])?;

    let quantity = if columns[3].is_empty() {
        description.quantity
    } else {
        Decimal::parse_money(columns[3])
            .ok()
            .and_then(|q| q.abs().to_i64_exact())
            .filter(|q| *q > 0)
            .ok_or_else(|| format!("invalid quantity {:?}", columns[3]))?
    };

    let price = parse_price(columns[4])?;

    let commission = match columns.get(5).copied().unwrap_or("") {
        "" | "-" | "--" => Decimal::zero(),
        raw => Decimal::parse_money(raw).map_err(|_| format!("invalid commission {:?}", raw))?,
    };

    let execution = ParsedExecution {
        date,
        time: Some(time),
        transaction_type: description.transaction_type,
        contract: description.contract,
        quantity,
        price,
        amount: None,
        commission,
        symbol: None,
        description: columns[1].to_string(),
        source: ImportSource::Paste,
    };
    execution.checked_amount().map_err(|e| e.to_string())?;
    Ok(execution)
}

fn parse_price(raw: &str) -> Result<Decimal, String> {
    if raw.is_empty() || raw.chars().all(|c| c == '-') {
        return Err("no fill price".to_string());
    }
    Decimal::parse_money(raw).map_err(|_| format!("invalid price {:?}", raw))
}

/// Parse `(Buy|Sell) (Open|Close) <qty> <TICKER> <Mon> <DD> '<YY> $<strike> (Call|Put) ...`.
pub fn parse_description(text: &str) -> Result<OrderDescription, String> {
    let bad = || format!("unrecognized order description {:?}", text);
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 9 {
        return Err(bad());
    }

    let transaction_type = match tokens[0] {
        "Buy" => TransactionType::Bought,
        "Sell" => TransactionType::Sold,
        _ => return Err(bad()),
    };
    if !matches!(tokens[1], "Open" | "Close") {
        return Err(bad());
    }
    let quantity: i64 = tokens[2]
        .parse()
        .ok()
        .filter(|q: &i64| *q > 0)
        .ok_or_else(bad)?;

    let underlying = tokens[3];
    if underlying.is_empty() || !underlying.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(bad());
    }

    let month = MONTHS
        .iter()
        .position(|m| *m == tokens[4])
        .map(|i| i as u32 + 1)
        .ok_or_else(bad)?;
    let day: u32 = tokens[5].parse().map_err(|_| bad())?;
    let year: i32 = tokens[6]
        .strip_prefix('\'')
        .and_then(|y| y.parse().ok())
        .ok_or_else(bad)?;
    let expiration = NaiveDate::from_ymd_opt(2000 + year, month, day).ok_or_else(bad)?;

    let strike = tokens[7]
        .strip_prefix('$')
        .and_then(|s| Decimal::parse_money(s).ok())
        .filter(|s| !s.is_negative())
        .ok_or_else(bad)?;

    let option_type = match tokens[8] {
        "Call" => OptionType::Call,
        "Put" => OptionType::Put,
        _ => return Err(bad()),
    };

    Ok(OrderDescription {
        transaction_type,
        quantity,
        contract: ContractKey::new(underlying, expiration, strike, option_type),
    })
}

/// Parse `MM/DD/YY H:MM[:SS] AM|PM <tz>` into a trade date and 24-hour time.
///
/// The timezone name is informational; times are kept in broker-local time.
pub fn parse_timestamp(text: &str) -> Result<(NaiveDate, NaiveTime), String> {
    let bad = || format!("unrecognized timestamp {:?}", text);
    let mut tokens = text.split_whitespace();

    let date = tokens.next().and_then(parse_us_date).ok_or_else(bad)?;
    let clock = tokens.next().ok_or_else(bad)?;
    let meridiem = tokens.next().ok_or_else(bad)?;

    let stamp = format!("{} {}", clock, meridiem);
    let time = NaiveTime::parse_from_str(&stamp, "%I:%M:%S %p")
        .or_else(|_| NaiveTime::parse_from_str(&stamp, "%I:%M %p"))
        .map_err(|_| bad())?;
    Ok((date, time))
}
