//! Telegram transport: bot setup, update schema and outbound messages

pub mod bot;
pub mod handlers;
pub mod keyboards;
pub mod notifier;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use notifier::TelegramNotifier;

pub type Bot = teloxide::Bot;
