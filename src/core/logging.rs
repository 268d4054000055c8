//! Logging initialization and startup diagnostics
//!
//! Code logs through the `log` facade; `tracing-subscriber` formats the
//! records and picks the level from `RUST_LOG` (default `info`).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::core::config;

const DEFAULT_FILTER: &str = "info";

/// Initialize the console logger
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - A global logger was already installed
pub fn init_logger() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// The bot token is never printed, only whether it is present.
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🛒 Store bot configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config::BOT_TOKEN.is_some() {
        log::info!("✅ BOT_TOKEN: set");
    } else {
        log::error!("❌ BOT_TOKEN: not set");
    }

    match *config::admin::ADMIN_ID {
        Some(id) => log::info!("✅ ADMIN_ID: {}", id),
        None => log::error!("❌ ADMIN_ID: not set or invalid"),
    }

    log::info!("📁 DATABASE_PATH: {}", config::DATABASE_PATH.as_str());
    log::info!("💱 CURRENCY: {}", config::CURRENCY.as_str());
    log::info!("📣 Broadcast delay: {:?}", config::broadcast::send_delay());
}
