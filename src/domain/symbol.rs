//! Compact option symbols, e.g. `QQQ---260205C00609000`.
//!
//! Layout: `<UNDERLYING><filler><YYMMDD><C|P><STRIKE x 1000, 8 digits>`. The
//! underlying is left-justified in a six character root field padded with `-`
//! (some feeds pad with spaces, which decode accepts as well).

use crate::domain::{ContractKey, Decimal, OptionType};
use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Width of the root field the underlying is padded to.
pub const ROOT_WIDTH: usize = 6;

const FILLER: char = '-';
const TAIL_LEN: usize = 15; // 6 date + 1 type + 8 strike
const STRIKE_SCALE: u32 = 3;
const MAX_STRIKE_MILLIS: i64 = 99_999_999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("malformed option symbol: {0}")]
    Malformed(String),
    #[error("invalid underlying: {0:?}")]
    InvalidUnderlying(String),
    #[error("strike {0} cannot be encoded")]
    StrikeOutOfRange(Decimal),
    #[error("expiration {0} cannot be encoded")]
    ExpirationOutOfRange(NaiveDate),
}

/// Decode a compact option symbol into its contract key.
pub fn decode(symbol: &str) -> Result<ContractKey, SymbolError> {
    let malformed = || SymbolError::Malformed(symbol.to_string());

    let sym = symbol.trim();
    if !sym.is_ascii() || sym.len() <= TAIL_LEN {
        return Err(malformed());
    }

    let split = sym.len() - TAIL_LEN;
    let (root, tail) = sym.split_at(split);

    let underlying = root.trim_end_matches([FILLER, ' ']);
    if underlying.is_empty() || !underlying.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(malformed());
    }

    let date_digits = &tail[0..6];
    let type_code = tail[6..7].chars().next().ok_or_else(malformed)?;
    let strike_digits = &tail[7..];

    if !date_digits.bytes().all(|b| b.is_ascii_digit())
        || !strike_digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let yy: i32 = date_digits[0..2].parse().map_err(|_| malformed())?;
    let mm: u32 = date_digits[2..4].parse().map_err(|_| malformed())?;
    let dd: u32 = date_digits[4..6].parse().map_err(|_| malformed())?;
    let expiration = NaiveDate::from_ymd_opt(2000 + yy, mm, dd).ok_or_else(malformed)?;

    let option_type = OptionType::from_code(type_code).ok_or_else(malformed)?;
    let strike_millis: i64 = strike_digits.parse().map_err(|_| malformed())?;

    Ok(ContractKey {
        underlying: underlying.to_string(),
        expiration,
        strike: Decimal::from_scaled(strike_millis, STRIKE_SCALE),
        option_type,
    })
}

/// Encode a contract key in the canonical `-`-padded form.
pub fn encode(key: &ContractKey) -> Result<String, SymbolError> {
    if key.underlying.is_empty() || !key.underlying.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(SymbolError::InvalidUnderlying(key.underlying.clone()));
    }

    let year = key.expiration.year();
    if !(2000..=2099).contains(&year) {
        return Err(SymbolError::ExpirationOutOfRange(key.expiration));
    }

    let strike_millis = key
        .strike
        .checked_mul(Decimal::from_int(1000))
        .and_then(|m| m.to_i64_exact())
        .filter(|m| (0..=MAX_STRIKE_MILLIS).contains(m))
        .ok_or(SymbolError::StrikeOutOfRange(key.strike))?;

    Ok(format!(
        "{:-<width$}{:02}{:02}{:02}{}{:08}",
        key.underlying,
        year - 2000,
        key.expiration.month(),
        key.expiration.day(),
        key.option_type.code(),
        strike_millis,
        width = ROOT_WIDTH
    ))
}
