//! Account-activity CSV export.
//!
//! The export starts with a free-form preamble (account name, date range) and
//! the real table begins at the row whose first column is `TransactionDate`.

use super::{parse_us_date, NormalizeError, Normalized};
use crate::domain::{symbol, Decimal, ImportSource, ParsedExecution, TransactionType};
use csv::StringRecord;
use tracing::{debug, warn};

/// First-column name identifying the header row.
pub const HEADER_SENTINEL: &str = "TransactionDate";

const COL_DATE: &str = "TransactionDate";
const COL_TYPE: &str = "TransactionType";
const COL_SECURITY_TYPE: &str = "SecurityType";
const COL_SYMBOL: &str = "Symbol";
const COL_QUANTITY: &str = "Quantity";
const COL_PRICE: &str = "Price";
const COL_AMOUNT: &str = "Amount";
const COL_COMMISSION: &str = "Commission";
const COL_DESCRIPTION: &str = "Description";

/// Resolved positions of the required columns.
struct Columns {
    date: usize,
    transaction_type: usize,
    symbol: usize,
    quantity: usize,
    price: usize,
    amount: usize,
    commission: usize,
    description: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, NormalizeError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or(NormalizeError::MissingColumn(name))
        };
        // SecurityType is required for the format even though option rows are
        // recognised by their symbol.
        find(COL_SECURITY_TYPE)?;
        Ok(Columns {
            date: find(COL_DATE)?,
            transaction_type: find(COL_TYPE)?,
            symbol: find(COL_SYMBOL)?,
            quantity: find(COL_QUANTITY)?,
            price: find(COL_PRICE)?,
            amount: find(COL_AMOUNT)?,
            commission: find(COL_COMMISSION)?,
            description: find(COL_DESCRIPTION)?,
        })
    }
}

/// Why a data row did not become an execution.
enum RowOutcome {
    Execution(Box<ParsedExecution>),
    /// Blank trailer rows and non-option activity.
    Ignored,
    Rejected(String),
}

/// Normalize an account-activity CSV export.
///
/// # Errors
/// Returns an error if no header row is found or a required column is missing.
pub fn parse_csv_export(text: &str) -> Result<Normalized, NormalizeError> {
    let table = locate_table(text).ok_or(NormalizeError::MissingHeader(HEADER_SENTINEL))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(table.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| NormalizeError::Csv(e.to_string()))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut normalized = Normalized::default();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "Unreadable CSV row, skipping");
                normalized.rejected += 1;
                continue;
            }
        };

        match parse_row(&record, &columns) {
            RowOutcome::Execution(execution) => normalized.executions.push(*execution),
            RowOutcome::Ignored => {}
            RowOutcome::Rejected(reason) => {
                warn!(line, reason = %reason, "Malformed CSV row, skipping");
                normalized.rejected += 1;
            }
        }
    }

    debug!(
        executions = normalized.executions.len(),
        rejected = normalized.rejected,
        "CSV export normalized"
    );
    Ok(normalized)
}

/// Slice of `text` starting at the header row.
fn locate_table(text: &str) -> Option<&str> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let first = line
            .trim_start_matches('\u{feff}')
            .trim_start()
            .trim_start_matches('"');
        if first.starts_with(HEADER_SENTINEL) {
            return Some(&text[offset..]);
        }
        offset += line.len();
    }
    None
}

fn parse_row(record: &StringRecord, columns: &Columns) -> RowOutcome {
    let field = |i: usize| record.get(i).unwrap_or("").trim();

    let raw_date = field(columns.date);
    if raw_date.is_empty() {
        return RowOutcome::Ignored;
    }

    let raw_symbol = field(columns.symbol);
    let contract = match symbol::decode(raw_symbol) {
        Ok(c) => c,
        Err(_) => {
            debug!(symbol = raw_symbol, "Non-option row ignored");
            return RowOutcome::Ignored;
        }
    };

    let transaction_type = match field(columns.transaction_type).parse::<TransactionType>() {
        Ok(t) => t,
        Err(_) => {
            debug!(
                symbol = raw_symbol,
                transaction_type = field(columns.transaction_type),
                "Non-trade activity ignored"
            );
            return RowOutcome::Ignored;
        }
    };

    let Some(date) = parse_us_date(raw_date) else {
        return RowOutcome::Rejected(format!("invalid date {:?}", raw_date));
    };

    let quantity = match Decimal::parse_money(field(columns.quantity))
        .ok()
        .and_then(|q| q.abs().to_i64_exact())
    {
        Some(q) if q > 0 => q,
        _ => {
            return RowOutcome::Rejected(format!(
                "invalid quantity {:?}",
                field(columns.quantity)
            ))
        }
    };

    let price = match Decimal::parse_money(field(columns.price)) {
        Ok(p) => p,
        Err(_) => return RowOutcome::Rejected(format!("invalid price {:?}", field(columns.price))),
    };

    let amount = match Decimal::parse_money(field(columns.amount)) {
        Ok(a) => a,
        Err(_) => {
            return RowOutcome::Rejected(format!("invalid amount {:?}", field(columns.amount)))
        }
    };

    let raw_commission = field(columns.commission);
    let commission = if raw_commission.is_empty() {
        Decimal::zero()
    } else {
        match Decimal::parse_money(raw_commission) {
            Ok(c) => c,
            Err(_) => {
                return RowOutcome::Rejected(format!("invalid commission {:?}", raw_commission))
            }
        }
    };

    let execution = ParsedExecution {
        date,
        time: None,
        transaction_type,
        contract,
        quantity,
        price,
        amount: Some(amount),
        commission,
        symbol: Some(raw_symbol.to_string()),
        description: field(columns.description).to_string(),
        source: ImportSource::Csv,
    };
    if let Err(e) = execution.checked_amount() {
        return RowOutcome::Rejected(e.to_string());
    }
    RowOutcome::Execution(Box::new(execution))
}
