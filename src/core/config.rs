use once_cell::sync::Lazy;
use secrecy::SecretString;
use std::env;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<Option<SecretString>> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .ok()
        .filter(|token| !token.trim().is_empty())
        .map(SecretString::from)
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: store_bot.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "store_bot.sqlite".to_string()));

/// Label printed after cash amounts (deposits are requested in this currency)
/// Read from CURRENCY environment variable
/// Default: SYP
pub static CURRENCY: Lazy<String> = Lazy::new(|| env::var("CURRENCY").unwrap_or_else(|_| "SYP".to_string()));

/// Operator configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    /// Parses the operator id; anything that is not a non-zero integer yields `None`.
    pub fn parse_admin_id(raw: &str) -> Option<i64> {
        raw.trim().parse::<i64>().ok().filter(|id| *id != 0)
    }

    /// The single privileged identity.
    /// Read from ADMIN_ID environment variable
    pub static ADMIN_ID: Lazy<Option<i64>> =
        Lazy::new(|| env::var("ADMIN_ID").ok().and_then(|raw| parse_admin_id(&raw)));
}

/// Broadcast fan-out configuration
pub mod broadcast {
    use once_cell::sync::Lazy;
    use std::env;
    use std::time::Duration;

    /// Default pause between two outbound broadcast messages (milliseconds)
    pub const DEFAULT_SEND_DELAY_MS: u64 = 70;

    /// Read from BROADCAST_DELAY_MS environment variable
    pub static SEND_DELAY_MS: Lazy<u64> = Lazy::new(|| {
        env::var("BROADCAST_DELAY_MS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_SEND_DELAY_MS)
    });

    /// Minimum interval between broadcast sends
    pub fn send_delay() -> Duration {
        Duration::from_millis(*SEND_DELAY_MS)
    }
}

/// Retry configuration for the update dispatcher
pub mod retry {
    use std::time::Duration;

    /// Base delay before restarting a crashed dispatcher (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Upper bound for the exponential backoff (in seconds)
    pub const MAX_BACKOFF_SECS: u64 = 300;

    /// Base for exponential backoff calculation
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;


    /// Counts consecutive restarts; a run that outlived the longest backoff starts over.
    pub fn next_attempt(previous: u32, ran_for: Duration) -> u32 {
        if ran_for >= Duration::from_secs(MAX_BACKOFF_SECS) {
            1
        } else {
            previous.saturating_add(1)
        }
    }

    /// Backoff before the given restart attempt (1-based)
    pub fn dispatcher_backoff(attempt: u32) -> Duration {
        let factor = EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt.saturating_sub(1));
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS.saturating_mul(factor).min(MAX_BACKOFF_SECS))
    }
}

/// Persisted setting keys and their fallbacks
pub mod settings {
    pub const WELCOME_MESSAGE_KEY: &str = "welcome_message";
    pub const EXCHANGE_RATE_KEY: &str = "exchange_rate";
    pub const MIN_DEPOSIT_KEY: &str = "min_deposit";

    pub const DEFAULT_WELCOME_MESSAGE: &str = "Welcome to the store! Use the buttons below to browse.";
    /// Cash units per one credit
    pub const DEFAULT_EXCHANGE_RATE: &str = "2500";
    /// Minimum deposit in credits
    pub const DEFAULT_MIN_DEPOSIT: i64 = 1;
}

/// Message layout limits
pub mod messages {
    /// Maximum message length for Telegram (with margin)
    pub const MAX_MESSAGE_LENGTH: usize = 4000;

    /// Rows shown by the operator deposit listing
    pub const DEPOSIT_LIST_LIMIT: usize = 100;

    /// Rows shown by the operator audit listing
    pub const AUDIT_LIST_LIMIT: usize = 20;
}
