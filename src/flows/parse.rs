//! Field parsing shared by the flows and the operator commands.
//!
//! Multi-field input is split on `|` and trimmed; numbers accept either `.`
//! or `,` as the decimal separator, except the bare deposit amount where `,`
//! groups thousands. Every failure is a
//! [`AppError::Validation`] carrying the usage line for that input.

use rust_decimal::Decimal;

use crate::core::money::{parse_decimal, parse_grouped_decimal};
use crate::core::{AppError, AppResult};

pub mod usage {
    pub const EDIT_CATEGORY: &str = "Use: categoryId | new name";
    pub const NEW_PRODUCT: &str = "Use: categoryId | name | price | description (optional)";
    pub const EDIT_PRODUCT: &str = "Use: productId | name | price | description (empty keeps the value)";
    pub const DELETE_ITEM: &str = "Use: category <id> or product <id>";
    pub const REORDER: &str = "Use: category <id> <position> or product <id> <position>";
    pub const NEW_BUTTON: &str = "Use: parentType | parentId | label | action | payload";
    pub const BALANCE_ADJUST: &str = "Use: userId | amount (amount greater than 0)";
    pub const SHOW_BALANCE: &str = "Use: userId";
    pub const BAN_TOGGLE: &str = "Use: ban <id> or unban <id>";
    pub const DEPOSIT: &str = "Please send a valid amount, for example 5000.";
    pub const CONFIRM_DEPOSIT: &str = "Use: /confirm_deposit <deposit_id>";
    pub const REJECT_DEPOSIT: &str = "Use: /reject_deposit <deposit_id>";
    pub const SET_RATE: &str = "Use: /setrate <cash per credit>, for example /setrate 2500";
    pub const SET_MIN: &str = "Use: /setmin <credits>, for example /setmin 1";
    pub const ADD_CATEGORY: &str = "Use: /addcat <category name>";
    pub const ADD_PRODUCT: &str = "Use: /addprod categoryId|name|price|description";
    pub const DEPOSITS: &str = "Use: /deposits [pending|all]";
}

/// Rejects input with the given usage line.
pub fn invalid<T>(usage: &str) -> AppResult<T> {
    Err(AppError::Validation(usage.to_string()))
}

/// Splits `a | b | c` into trimmed fields. Empty input yields no fields.
pub fn split_fields(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split('|').map(str::trim).collect()
}

/// Splits `word id [n]` on whitespace.
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn parse_id(field: &str, usage: &str) -> AppResult<i64> {
    match field.trim().parse::<i64>() {
        Ok(id) => Ok(id),
        Err(_) => invalid(usage),
    }
}

pub fn parse_amount(field: &str, usage: &str) -> AppResult<Decimal> {
    match parse_decimal(field) {
        Some(amount) => Ok(amount),
        None => invalid(usage),
    }
}

/// An amount that must be strictly greater than zero.
pub fn parse_positive_amount(field: &str, usage: &str) -> AppResult<Decimal> {
    let amount = parse_amount(field, usage)?;
    if amount <= Decimal::ZERO {
        return invalid(usage);
    }
    Ok(amount)
}

/// A bare cash amount such as `5,000` or `2500.50`, greater than zero.
pub fn parse_cash_amount(text: &str, usage: &str) -> AppResult<Decimal> {
    match parse_grouped_decimal(text) {
        Some(amount) if amount > Decimal::ZERO => Ok(amount),
        _ => invalid(usage),
    }
}

/// `None` for an empty field (keep the current value).
pub fn optional_field(fields: &[&str], idx: usize) -> Option<String> {
    fields
        .get(idx)
        .filter(|field| !field.is_empty())
        .map(|field| field.to_string())
}

/// Everything from `idx` on, re-joined so a description may itself contain `|`.
pub fn rest_from(fields: &[&str], idx: usize) -> String {
    fields.get(idx..).map(|rest| rest.join(" | ")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_fields_trims() {
        assert_eq!(split_fields(" 3 | gold |100,5| "), vec!["3", "gold", "100,5", ""]);
        assert!(split_fields("   ").is_empty());
    }

    #[test]
    fn test_parse_amount_accepts_comma() {
        assert_eq!(parse_amount("100,5", "u").unwrap(), Decimal::new(1005, 1));
        assert!(matches!(parse_amount("ten", "u"), Err(AppError::Validation(u)) if u == "u"));
    }

    #[test]
    fn test_parse_positive_amount_rejects_zero() {
        assert!(parse_positive_amount("0", usage::BALANCE_ADJUST).is_err());
        assert!(parse_positive_amount("-5", usage::BALANCE_ADJUST).is_err());
        assert_eq!(parse_positive_amount("5", usage::BALANCE_ADJUST).unwrap(), Decimal::from(5));
    }

    #[test]
    fn test_rest_and_optional_fields() {
        let fields = split_fields("1 | gold | 100 | shiny | rare");
        assert_eq!(rest_from(&fields, 3), "shiny | rare");
        assert_eq!(rest_from(&fields, 9), "");

        let fields = split_fields("1 |  | 100");
        assert_eq!(optional_field(&fields, 1), None);
        assert_eq!(optional_field(&fields, 2), Some("100".to_string()));
        assert_eq!(optional_field(&fields, 3), None);
    }
}
