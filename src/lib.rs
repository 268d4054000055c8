//! Storebot - Telegram storefront with credit balances and manual deposits
//!
//! This library provides the catalog, the balance/order/deposit ledger, the
//! multi-step chat flows and the Telegram integration of the store bot.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, money formatting, send pacing
//! - `storage`: SQLite pool, migrations and the per-table stores
//! - `flows`: pending actions and the handlers that complete them
//! - `dispatch`: transport-agnostic front (commands, menus, broadcast)
//! - `telegram`: teloxide adapter
//! - `notify`: outbound notification capability
//! - `testing`: notifier doubles for tests

pub mod cli;
pub mod core;
pub mod dispatch;
pub mod flows;
pub mod notify;
pub mod storage;
pub mod telegram;
pub mod testing;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use dispatch::{CallbackResponse, Reply, Sender, Shop, ShopConfig};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
