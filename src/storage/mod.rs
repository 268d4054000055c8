//! SQLite persistence: pool, migrations and the per-table stores

pub mod audit;
pub mod catalog;
pub mod db;
pub mod ledger;
pub mod migrations;
pub mod pending;
pub mod settings;
pub mod users;

// Re-exports for convenience
pub use db::{create_pool, get_connection, open_in_memory, DbConnection, DbPool};
