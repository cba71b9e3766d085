//! Broker executions: the normalizer output and the persisted ledger row.

use crate::domain::{
    symbol, ContractKey, Decimal, ImportSource, SymbolError, TransactionType, CONTRACT_MULTIPLIER,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest cash magnitude, in dollars, one fill may carry: notional, amount or commission.
pub const MAX_FILL_CASH: i64 = 1_000_000_000_000_000;

/// Why a parsed fill cannot enter the ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FillError {
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error("price {price} x {quantity} contracts overflows")]
    Overflow { price: Decimal, quantity: i64 },
    #[error("{field} {value} is outside the supported cash range")]
    CashOutOfRange { field: &'static str, value: Decimal },
}

/// A fill as read from one of the raw input formats, before it reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedExecution {
    pub date: NaiveDate,
    /// Time of day; CSV exports do not carry it.
    pub time: Option<NaiveTime>,
    pub transaction_type: TransactionType,
    pub contract: ContractKey,
    /// Number of contracts, always positive.
    pub quantity: i64,
    pub price: Decimal,
    /// Signed cash amount as reported by the broker (CSV only).
    pub amount: Option<Decimal>,
    pub commission: Decimal,
    /// Broker symbol string (CSV only); paste rows get one synthesized on insert.
    pub symbol: Option<String>,
    pub description: String,
    pub source: ImportSource,
}

impl ParsedExecution {
    /// `price * quantity * 100`, or `None` if it does not fit.
    pub fn notional(&self) -> Option<Decimal> {
        self.price
            .checked_mul(Decimal::from_int(self.quantity))?
            .checked_mul(Decimal::from_int(CONTRACT_MULTIPLIER))
    }

    /// Cash amount for this fill: the broker's figure when present, otherwise
    /// `price * quantity * 100 * sign - commission`. `None` on overflow.
    pub fn effective_amount(&self) -> Option<Decimal> {
        match self.amount {
            Some(amount) => Some(amount),
            None => self
                .notional()?
                .checked_mul(Decimal::from_int(self.transaction_type.cash_sign()))?
                .checked_sub(self.commission),
        }
    }

    /// Symbol string used for duplicate suppression.
    pub fn effective_symbol(&self) -> Result<String, symbol::SymbolError> {
        match &self.symbol {
            Some(s) => Ok(s.clone()),
            None => symbol::encode(&self.contract),
        }
    }

    /// Check every cash figure against [`MAX_FILL_CASH`] and return the amount to store.
    ///
    /// Inside the limit, all per-date P/L sums stay far from `Decimal` overflow.
    pub fn checked_amount(&self) -> Result<Decimal, FillError> {
        let overflow = || FillError::Overflow {
            price: self.price,
            quantity: self.quantity,
        };
        let notional = self.notional().ok_or_else(overflow)?;
        let amount = self.effective_amount().ok_or_else(overflow)?;

        let limit = Decimal::from_int(MAX_FILL_CASH);
        for (field, value) in [
            ("notional", notional),
            ("amount", amount),
            ("commission", self.commission),
        ] {
            if value.abs() > limit {
                return Err(FillError::CashOutOfRange { field, value });
            }
        }
        Ok(amount)
    }

    /// Symbol and amount as written to the ledger.
    ///
    /// # Errors
    /// Fails if the symbol cannot be encoded or a cash figure is out of range.
    pub fn ledger_entry(&self) -> Result<(String, Decimal), FillError> {
        Ok((self.effective_symbol()?, self.checked_amount()?))
    }
}

/// A persisted broker fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Surrogate id; ascending ids follow insertion order.
    pub id: i64,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub transaction_type: TransactionType,
    pub contract: ContractKey,
    pub quantity: i64,
    pub price: Decimal,
    pub amount: Decimal,
    pub commission: Decimal,
    pub symbol: String,
    pub description: String,
    pub source: ImportSource,
}

impl Execution {
    /// Cash amount per contract (negative for purchases). Quantity is always positive.
    pub fn amount_per_unit(&self) -> Decimal {
        self.amount / Decimal::from_int(self.quantity)
    }

    pub fn commission_per_unit(&self) -> Decimal {
        self.commission / Decimal::from_int(self.quantity)
    }
}
