//! Test fixtures for end-to-end tests
//!
//! [`TestEnvironment`] wires a [`Shop`] to a temporary SQLite file and a
//! recording notifier, so a test can drive the bot exactly like Telegram does
//! and inspect both the database and everything that was sent.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use storebot::notify::Notifier;
use storebot::storage::{catalog, create_pool, get_connection, DbConnection, DbPool};
use storebot::testing::RecordingNotifier;
use storebot::{Shop, ShopConfig};
use tempfile::TempDir;

pub const OPERATOR: i64 = 1000;
pub const CUSTOMER: i64 = 2000;
pub const OTHER_CUSTOMER: i64 = 3000;

pub struct TestEnvironment {
    pub shop: Shop,
    /// Everything sent outside direct replies
    pub notifier: RecordingNotifier,
    pub pool: DbPool,
    /// Keeps the database file alive for the test's duration
    _dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let notifier = RecordingNotifier::default();
        Self::with_notifier(notifier.clone(), notifier)
    }

    /// Environment whose shop sends through `sender`; `recorder` is kept for inspection.
    pub fn with_notifier(recorder: RecordingNotifier, sender: impl Notifier + 'static) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();

        let shop = Shop::new(
            pool.clone(),
            Arc::new(sender),
            ShopConfig {
                operator_id: Some(OPERATOR),
                currency: "SYP".to_string(),
                bot_username: "store_bot".to_string(),
                broadcast_interval: Duration::from_millis(1),
            },
        );

        Self {
            shop,
            notifier: recorder,
            pool,
            _dir: dir,
        }
    }

    pub fn conn(&self) -> DbConnection {
        get_connection(&self.pool).unwrap()
    }

    /// Creates a category with one product and returns the product id.
    pub fn seed_product(&self, category: &str, product: &str, price: i64) -> i64 {
        let conn = self.conn();
        let category = catalog::add_category(&conn, category).unwrap();
        catalog::add_product(&conn, category.id, product, Decimal::from(price), "")
            .unwrap()
            .id
    }
}
