//! Exact decimal <-> minor-unit conversion for token amounts.
//!
//! User input is parsed digit by digit into a `U256`; there is no floating
//! point anywhere on this path.

use alloy_primitives::U256;

use crate::error::CoreError;

/// Fixed precision at which payment amounts are parsed (USDC minor units).
pub const PAYMENT_DECIMALS: u8 = 6;

/// Largest precision accepted by `parse_units` / `format_units`.
const MAX_DECIMALS: u8 = 77;

/// Parse a non-negative decimal string into integer minor units.
///
/// Accepts `"12"`, `"12.34"`, `".5"` and `"5."`. Rejects signs, exponents,
/// separators, empty input and fractions longer than `decimals`.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, CoreError> {
    if decimals > MAX_DECIMALS {
        return Err(CoreError::InvalidAmount(format!(
            "unsupported precision: {decimals} decimals"
        )));
    }

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidAmount("amount is empty".into()));
    }
    if trimmed.starts_with('-') {
        return Err(CoreError::InvalidAmount(format!("negative amount: {trimmed}")));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(CoreError::InvalidAmount(format!("not a number: {trimmed}")));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(CoreError::InvalidAmount(format!("not a number: {trimmed}")));
    }
    if fraction.len() > decimals as usize {
        return Err(CoreError::InvalidAmount(format!(
            "fractional component exceeds {decimals} decimals: {trimmed}"
        )));
    }

    let overflow = || CoreError::InvalidAmount(format!("amount too large: {trimmed}"));
    let ten = U256::from(10u8);
    let mut value = U256::ZERO;

    let padding = decimals as usize - fraction.len();
    let digits = whole
        .bytes()
        .chain(fraction.bytes())
        .chain(std::iter::repeat(b'0').take(padding));

    for digit in digits {
        value = value
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(digit - b'0')))
            .ok_or_else(overflow)?;
    }

    Ok(value)
}

/// Parse a payment amount at `PAYMENT_DECIMALS` precision.
///
/// Zero is rejected in addition to everything `parse_units` rejects.
pub fn parse_payment_amount(input: &str) -> Result<U256, CoreError> {
    let value = parse_units(input, PAYMENT_DECIMALS)?;
    if value.is_zero() {
        return Err(CoreError::InvalidAmount(format!(
            "amount must be greater than zero: {}",
            input.trim()
        )));
    }
    Ok(value)
}

/// Render integer minor units as a decimal string.
///
/// Trailing fractional zeros are trimmed but at least one fractional digit is
/// kept, so `1_500_000` at 6 decimals renders as `"1.5"` and `1_000_000` as
/// `"1.0"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    if decimals == 0 {
        return format!("{value}.0");
    }

    let scale = U256::from(10u8).pow(U256::from(decimals));
    let whole = value / scale;
    let fraction = value % scale;

    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let trimmed = padded.trim_end_matches('0');
    let fraction_str = if trimmed.is_empty() { "0" } else { trimmed };

    format!("{whole}.{fraction_str}")
}
