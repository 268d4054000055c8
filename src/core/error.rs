use rust_decimal::Decimal;
use thiserror::Error;

use crate::core::money::format_decimal;

/// Centralized error types for the application
///
/// Flow handlers, stores and the dispatch front all return this enum. The
/// first group of variants is recoverable and is rendered back to whoever sent
/// the message; the infrastructure variants are logged and replaced by a
/// generic "try again" reply.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed input; carries the usage string to show the submitter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced category/product/deposit/user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Purchase attempted with a balance below the price
    #[error("Insufficient funds: {price} vs {balance}")]
    InsufficientFunds { price: Decimal, balance: Decimal },

    /// Non-operator invoking an operator-only path
    #[error("Unauthorized")]
    Unauthorized,

    /// Deposit confirmation idempotency guard
    #[error("Deposit #{0} is already confirmed")]
    AlreadyConfirmed(i64),

    /// Deposit was rejected earlier and can no longer be confirmed
    #[error("Deposit #{0} is already cancelled")]
    AlreadyCancelled(i64),

    /// A stored pending action could not be decoded
    #[error("Stale pending action: {0}")]
    StalePending(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] anyhow::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Reply shown when an unexpected fault reaches the dispatch boundary
pub const GENERIC_FAILURE_REPLY: &str = "⚠️ Something went wrong, please try again.";

impl AppError {
    /// Text for the person whose action failed.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(usage) => format!("❌ {}", usage),
            AppError::NotFound(what) => format!("❌ {} not found.", what),
            AppError::InsufficientFunds { price, balance } => format!(
                "❌ Not enough credits (price vs balance): {} vs {}",
                format_decimal(*price),
                format_decimal(*balance)
            ),
            AppError::Unauthorized => "⛔ This action is for the operator only.".to_string(),
            AppError::AlreadyConfirmed(id) => format!("ℹ️ Deposit #{} is already confirmed.", id),
            AppError::AlreadyCancelled(id) => format!("ℹ️ Deposit #{} is already cancelled.", id),
            _ => GENERIC_FAILURE_REPLY.to_string(),
        }
    }

    /// Whether this error is part of normal operation (bad input, missing ids)
    /// rather than a fault worth an error-level log line.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::InsufficientFunds { .. }
                | AppError::Unauthorized
                | AppError::AlreadyConfirmed(_)
                | AppError::AlreadyCancelled(_)
        )
    }
}
