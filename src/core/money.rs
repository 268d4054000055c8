//! Decimal parsing and formatting for credits and cash amounts

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parses a user-typed number, accepting `.` or `,` as the decimal separator.
///
/// Returns `None` for anything that is not a plain finite decimal
/// (`"12,5"` and `"12.5"` are the same value, `"1e3"` and `"abc"` are rejected).
pub fn parse_decimal(input: &str) -> Option<Decimal> {
    let normalized = input.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

/// Parses a single cash figure where `,` only groups thousands: `5,000` is 5000.
pub fn parse_grouped_decimal(input: &str) -> Option<Decimal> {
    let normalized = input.trim().replace(',', "");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

/// Whole credits bought by `cash` at `rate` cash units per credit, rounded down.
///
/// Returns `None` when the rate is not positive or the result does not fit i64.
pub fn credits_for(cash: Decimal, rate: Decimal) -> Option<i64> {
    if rate <= Decimal::ZERO {
        return None;
    }
    cash.checked_div(rate)?.floor().to_i64()
}

/// Renders a decimal without trailing zeros: `100`, `12.5`, `0.25`.
pub fn format_decimal(value: Decimal) -> String {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

/// Balance/price in the store's credit unit.
pub fn format_credits(value: Decimal) -> String {
    format!("{} credits", format_decimal(value))
}

/// Cash amount in the configured deposit currency.
pub fn format_cash(value: Decimal, currency: &str) -> String {
    format!("{} {}", format_decimal(value), currency)
}
