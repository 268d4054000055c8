//! Ledger invariants exercised against a real SQLite file
//!
//! Run with: cargo test --test ledger_properties_test

mod common;

use std::thread;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use storebot::core::AppError;
use storebot::flows::{self, FlowContext, PendingAction};
use storebot::storage::ledger::{self, DepositFilter, DepositStatus, RejectOutcome};
use storebot::storage::{catalog, get_connection, settings};

use common::{TestEnvironment, CUSTOMER, OPERATOR, OTHER_CUSTOMER};

fn ctx() -> FlowContext {
    FlowContext {
        operator_id: Some(OPERATOR),
        currency: "SYP".to_string(),
    }
}

#[test]
fn test_insufficient_funds_changes_nothing() {
    let env = TestEnvironment::new();
    let product = env.seed_product("Games", "gold", 100);
    let mut conn = env.conn();
    ledger::adjust_balance(&mut conn, CUSTOMER, Decimal::from(99)).unwrap();

    let result = ledger::purchase(&mut conn, CUSTOMER, product);

    assert!(matches!(
        result,
        Err(AppError::InsufficientFunds { price, balance })
            if price == Decimal::from(100) && balance == Decimal::from(99)
    ));
    assert_eq!(ledger::balance_of(&conn, CUSTOMER).unwrap(), Decimal::from(99));
    assert_eq!(ledger::count_orders(&conn).unwrap(), 0);
}

#[test]
fn test_purchase_at_exact_balance_leaves_zero() {
    let env = TestEnvironment::new();
    let product = env.seed_product("Games", "gold", 100);
    let mut conn = env.conn();
    ledger::adjust_balance(&mut conn, CUSTOMER, Decimal::from(100)).unwrap();

    let receipt = ledger::purchase(&mut conn, CUSTOMER, product).unwrap();

    assert_eq!(receipt.balance, Decimal::ZERO);
    assert_eq!(receipt.order.price, Decimal::from(100));
    assert_eq!(ledger::list_orders_for_user(&conn, CUSTOMER).unwrap().len(), 1);
}

#[test]
fn test_order_keeps_price_after_product_changes() {
    let env = TestEnvironment::new();
    let product = env.seed_product("Games", "gold", 100);
    let mut conn = env.conn();
    ledger::adjust_balance(&mut conn, CUSTOMER, Decimal::from(100)).unwrap();
    ledger::purchase(&mut conn, CUSTOMER, product).unwrap();

    catalog::delete_product(&conn, product).unwrap();

    let orders = ledger::list_orders_for_user(&conn, CUSTOMER).unwrap();
    assert_eq!(orders[0].price, Decimal::from(100));
    assert_eq!(orders[0].product_name, None);
}

#[test]
fn test_double_confirmation_credits_once() {
    let env = TestEnvironment::new();
    let mut conn = env.conn();
    let deposit = ledger::create_deposit(&conn, CUSTOMER, Decimal::from(5000), 2).unwrap();

    ledger::confirm_deposit(&mut conn, deposit.id).unwrap();
    let second = ledger::confirm_deposit(&mut conn, deposit.id);

    assert!(matches!(second, Err(AppError::AlreadyConfirmed(id)) if id == deposit.id));
    assert_eq!(ledger::balance_of(&conn, CUSTOMER).unwrap(), Decimal::from(2));
    let stored = ledger::get_deposit(&conn, deposit.id).unwrap().unwrap();
    assert_eq!(stored.status, DepositStatus::Confirmed);
}

#[test]
fn test_rejected_deposit_cannot_be_confirmed() {
    let env = TestEnvironment::new();
    let mut conn = env.conn();
    let deposit = ledger::create_deposit(&conn, CUSTOMER, Decimal::from(5000), 2).unwrap();

    assert!(matches!(
        ledger::reject_deposit(&mut conn, deposit.id).unwrap(),
        RejectOutcome::Rejected(_)
    ));
    assert!(matches!(
        ledger::confirm_deposit(&mut conn, deposit.id),
        Err(AppError::AlreadyCancelled(_))
    ));
    assert!(matches!(
        ledger::reject_deposit(&mut conn, deposit.id).unwrap(),
        RejectOutcome::NotPending(_)
    ));
    assert_eq!(ledger::balance_of(&conn, CUSTOMER).unwrap(), Decimal::ZERO);
}

#[test]
fn test_sub_minimum_deposit_creates_no_row() {
    let env = TestEnvironment::new();
    let mut conn = env.conn();
    settings::set_min_deposit(&conn, 3).unwrap();

    // 5000 SYP at 2500 per credit is 2 credits, below the minimum of 3
    let result = flows::submit(&mut conn, &ctx(), CUSTOMER, &PendingAction::Deposit, "5000");

    assert!(matches!(result, Err(AppError::Validation(message)) if message.contains("3 credit(s)")));
    assert!(ledger::list_deposits(&conn, DepositFilter::All, 10).unwrap().is_empty());
}

#[test]
fn test_concurrent_debits_and_credits_lose_nothing() {
    const ROUNDS: i64 = 25;

    let env = TestEnvironment::new();
    {
        let mut conn = env.conn();
        ledger::adjust_balance(&mut conn, CUSTOMER, Decimal::from(1000)).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let pool = env.pool.clone();
            thread::spawn(move || {
                let mut conn = get_connection(&pool).unwrap();
                let delta = if worker % 2 == 0 { 3 } else { -2 };
                for _ in 0..ROUNDS {
                    ledger::adjust_balance(&mut conn, CUSTOMER, Decimal::from(delta)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Two workers add 3, two subtract 2
    let expected = 1000 + ROUNDS * (3 + 3 - 2 - 2);
    assert_eq!(ledger::balance_of(&env.conn(), CUSTOMER).unwrap(), Decimal::from(expected));
}

#[test]
fn test_concurrent_purchases_never_overdraw() {
    let env = TestEnvironment::new();
    let product = env.seed_product("Games", "gold", 10);
    {
        let mut conn = env.conn();
        ledger::adjust_balance(&mut conn, OTHER_CUSTOMER, Decimal::from(55)).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pool = env.pool.clone();
            thread::spawn(move || {
                let mut conn = get_connection(&pool).unwrap();
                (0..5)
                    .filter(|_| ledger::purchase(&mut conn, OTHER_CUSTOMER, product).is_ok())
                    .count()
            })
        })
        .collect();
    let bought: usize = handles.into_iter().map(|handle| handle.join().unwrap()).sum();

    let conn = env.conn();
    assert_eq!(bought, 5);
    assert_eq!(ledger::balance_of(&conn, OTHER_CUSTOMER).unwrap(), Decimal::from(5));
    assert_eq!(ledger::count_orders(&conn).unwrap(), 5);
}

#[test]
fn test_purchases_racing_credits_balance_out() {
    const CREDITS: i64 = 40;

    let env = TestEnvironment::new();
    let product = env.seed_product("Games", "gold", 10);

    let creditor = {
        let pool = env.pool.clone();
        thread::spawn(move || {
            let mut conn = get_connection(&pool).unwrap();
            for _ in 0..CREDITS {
                ledger::adjust_balance(&mut conn, CUSTOMER, Decimal::from(3)).unwrap();
            }
        })
    };
    let buyers: Vec<_> = (0..3)
        .map(|_| {
            let pool = env.pool.clone();
            thread::spawn(move || {
                let mut conn = get_connection(&pool).unwrap();
                let mut bought = 0;
                for _ in 0..20 {
                    match ledger::purchase(&mut conn, CUSTOMER, product) {
                        Ok(receipt) => {
                            assert!(receipt.balance >= Decimal::ZERO);
                            bought += 1;
                        }
                        Err(AppError::InsufficientFunds { .. }) => thread::yield_now(),
                        Err(other) => panic!("unexpected purchase error: {other:?}"),
                    }
                }
                bought
            })
        })
        .collect();
    creditor.join().unwrap();
    let bought: i64 = buyers.into_iter().map(|handle| handle.join().unwrap()).sum();

    let conn = env.conn();
    let orders = ledger::list_orders_for_user(&conn, CUSTOMER).unwrap();
    let spent: Decimal = orders.iter().map(|order| order.price).sum();
    assert_eq!(orders.len() as i64, bought);
    assert_eq!(
        ledger::balance_of(&conn, CUSTOMER).unwrap(),
        Decimal::from(CREDITS * 3) - spent
    );
    assert!(ledger::balance_of(&conn, CUSTOMER).unwrap() >= Decimal::ZERO);
}

#[test]
fn test_welcome_message_round_trips() {
    let env = TestEnvironment::new();
    let conn = env.conn();
    let text = "Hi {user}! 🎮\nNew items every Friday.";

    settings::set_welcome_message(&conn, text).unwrap();

    assert_eq!(settings::welcome_message(&conn).unwrap(), text);
}

#[test]
fn test_category_delete_removes_exactly_its_products() {
    let env = TestEnvironment::new();
    let mut conn = env.conn();
    let games = catalog::add_category(&conn, "Games").unwrap();
    let cards = catalog::add_category(&conn, "Cards").unwrap();
    for name in ["gold", "gems"] {
        catalog::add_product(&conn, games.id, name, Decimal::from(5), "").unwrap();
    }
    let kept = catalog::add_product(&conn, cards.id, "gift", Decimal::from(7), "").unwrap();

    let removed = catalog::delete_category(&mut conn, games.id).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(catalog::list_products(&conn, games.id).unwrap(), vec![]);
    assert_eq!(catalog::list_products(&conn, cards.id).unwrap(), vec![kept]);
    assert_eq!(catalog::count_products(&conn).unwrap(), 1);
}
