//! Persisted store-wide settings (welcome text, exchange rate, minimum deposit)

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::config::settings::{
    DEFAULT_EXCHANGE_RATE, DEFAULT_MIN_DEPOSIT, DEFAULT_WELCOME_MESSAGE, EXCHANGE_RATE_KEY, MIN_DEPOSIT_KEY,
    WELCOME_MESSAGE_KEY,
};
use crate::core::{AppError, AppResult};

pub fn get_setting(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn welcome_message(conn: &Connection) -> AppResult<String> {
    Ok(get_setting(conn, WELCOME_MESSAGE_KEY)?.unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()))
}

pub fn set_welcome_message(conn: &Connection, text: &str) -> AppResult<()> {
    set_setting(conn, WELCOME_MESSAGE_KEY, text)
}

fn default_exchange_rate() -> Decimal {
    Decimal::from_str(DEFAULT_EXCHANGE_RATE).unwrap_or(Decimal::ONE)
}

/// Cash units per credit. A missing or corrupt value falls back to the default.
pub fn exchange_rate(conn: &Connection) -> AppResult<Decimal> {
    let Some(raw) = get_setting(conn, EXCHANGE_RATE_KEY)? else {
        return Ok(default_exchange_rate());
    };
    match Decimal::from_str(raw.trim()) {
        Ok(rate) if rate > Decimal::ZERO => Ok(rate),
        _ => {
            log::warn!("Ignoring invalid stored exchange rate {:?}, using default", raw);
            Ok(default_exchange_rate())
        }
    }
}

/// Stores a new exchange rate; it must stay positive.
pub fn set_exchange_rate(conn: &Connection, rate: Decimal) -> AppResult<()> {
    if rate <= Decimal::ZERO {
        return Err(AppError::Validation("Exchange rate must be a positive number.".to_string()));
    }
    set_setting(conn, EXCHANGE_RATE_KEY, &rate.normalize().to_string())
}

/// Minimum deposit in credits.
pub fn min_deposit(conn: &Connection) -> AppResult<i64> {
    let Some(raw) = get_setting(conn, MIN_DEPOSIT_KEY)? else {
        return Ok(DEFAULT_MIN_DEPOSIT);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 0 => Ok(value),
        _ => {
            log::warn!("Ignoring invalid stored minimum deposit {:?}, using default", raw);
            Ok(DEFAULT_MIN_DEPOSIT)
        }
    }
}

pub fn set_min_deposit(conn: &Connection, credits: i64) -> AppResult<()> {
    if credits < 0 {
        return Err(AppError::Validation("Minimum deposit cannot be negative.".to_string()));
    }
    set_setting(conn, MIN_DEPOSIT_KEY, &credits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::open_in_memory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_when_unset() {
        let conn = open_in_memory().unwrap();
        assert_eq!(welcome_message(&conn).unwrap(), DEFAULT_WELCOME_MESSAGE);
        assert_eq!(exchange_rate(&conn).unwrap(), Decimal::from(2500));
        assert_eq!(min_deposit(&conn).unwrap(), 1);
    }

    #[test]
    fn test_welcome_message_round_trip() {
        let conn = open_in_memory().unwrap();
        let text = "Hi {user}!\nSecond line | with pipes, 100%";
        set_welcome_message(&conn, text).unwrap();
        assert_eq!(welcome_message(&conn).unwrap(), text);
    }

    #[test]
    fn test_exchange_rate_must_be_positive() {
        let conn = open_in_memory().unwrap();
        assert!(matches!(
            set_exchange_rate(&conn, Decimal::ZERO),
            Err(AppError::Validation(_))
        ));
        set_exchange_rate(&conn, Decimal::new(30005, 1)).unwrap();
        assert_eq!(exchange_rate(&conn).unwrap(), Decimal::new(30005, 1));
    }

    #[test]
    fn test_corrupt_rate_falls_back_to_default() {
        let conn = open_in_memory().unwrap();
        set_setting(&conn, EXCHANGE_RATE_KEY, "nan").unwrap();
        assert_eq!(exchange_rate(&conn).unwrap(), Decimal::from(2500));
        set_setting(&conn, MIN_DEPOSIT_KEY, "-3").unwrap();
        assert_eq!(min_deposit(&conn).unwrap(), 1);
    }
}
