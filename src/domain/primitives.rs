//! Domain primitives: TransactionType, OptionType, ContractKey, ImportSource.

use crate::domain::Decimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract multiplier for equity options.
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// Direction of a broker fill, named the way broker exports spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Bought,
    Sold,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Bought => "Bought",
            TransactionType::Sold => "Sold",
        }
    }

    /// Sign of the cash flow: purchases cost money, sales bring it in.
    pub fn cash_sign(&self) -> i64 {
        match self {
            TransactionType::Bought => -1,
            TransactionType::Sold => 1,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Bought" => Ok(TransactionType::Bought),
            "Sold" => Ok(TransactionType::Sold),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "Call",
            OptionType::Put => "Put",
        }
    }

    /// Single-letter code used inside option symbols.
    pub fn code(&self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'C' => Some(OptionType::Call),
            'P' => Some(OptionType::Put),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Call" => Ok(OptionType::Call),
            "Put" => Ok(OptionType::Put),
            other => Err(format!("unknown option type: {}", other)),
        }
    }
}

/// Identifies one option instrument independent of date or direction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractKey {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub option_type: OptionType,
}

impl ContractKey {
    pub fn new(
        underlying: impl Into<String>,
        expiration: NaiveDate,
        strike: Decimal,
        option_type: OptionType,
    ) -> Self {
        ContractKey {
            underlying: underlying.into(),
            expiration,
            strike,
            option_type,
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.underlying,
            self.expiration.format("%Y-%m-%d"),
            self.strike,
            self.option_type
        )
    }
}

/// Which broker view an execution was observed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    /// Tabular account-activity export: accurate amounts, no times.
    Csv,
    /// Pasted order history: times, no reliable amounts.
    Paste,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSource::Csv => "csv",
            ImportSource::Paste => "paste",
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ImportSource::Csv),
            "paste" => Ok(ImportSource::Paste),
            other => Err(format!("unknown import source: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_parse_and_sign() {
        assert_eq!(
            "Bought".parse::<TransactionType>().unwrap(),
            TransactionType::Bought
        );
        assert_eq!(
            " Sold ".parse::<TransactionType>().unwrap(),
            TransactionType::Sold
        );
        assert!("Dividend".parse::<TransactionType>().is_err());
        assert_eq!(TransactionType::Bought.cash_sign(), -1);
        assert_eq!(TransactionType::Sold.cash_sign(), 1);
    }

    #[test]
    fn test_option_type_codes() {
        assert_eq!(OptionType::from_code('C'), Some(OptionType::Call));
        assert_eq!(OptionType::from_code('P'), Some(OptionType::Put));
        assert_eq!(OptionType::from_code('X'), None);
        assert_eq!(OptionType::Put.code(), 'P');
    }

    #[test]
    fn test_contract_key_display() {
        let key = ContractKey::new(
            "QQQ",
            NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            Decimal::from_scaled(609000, 3),
            OptionType::Call,
        );
        assert_eq!(key.to_string(), "QQQ 2026-02-05 609 Call");
    }

    #[test]
    fn test_import_source_serialization() {
        let json = serde_json::to_string(&ImportSource::Paste).unwrap();
        assert_eq!(json, "\"paste\"");
    }
}
