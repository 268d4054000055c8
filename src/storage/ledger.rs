//! Balances, orders and deposit requests.
//!
//! Every write that reads a balance before changing it runs inside a
//! `BEGIN IMMEDIATE` transaction: SQLite hands out the write lock up front, so
//! two writers can never both read the same old balance. Together with the
//! busy timeout set on every connection this serializes all ledger writes.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use rust_decimal::Decimal;
use strum::{Display, EnumString};

use crate::core::{AppError, AppResult};
use crate::storage::catalog::{get_product, Product};
use crate::storage::db::{decimal_column, parsed_column};
use crate::storage::users::ensure_user_row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    New,
}

/// Lifecycle of a deposit request. `Pending` is left at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    /// Product name at read time; `None` once the product was deleted
    pub product_name: Option<String>,
    /// Price frozen at purchase time
    pub price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    pub id: i64,
    pub user_id: i64,
    pub cash_amount: Decimal,
    pub credits: i64,
    pub status: DepositStatus,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub order: Order,
    pub product: Product,
    /// Buyer's balance after the debit
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectOutcome {
    /// The request was pending and is now cancelled
    Rejected(DepositRequest),
    /// Nothing changed; the request had already left `pending`
    NotPending(DepositRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositFilter {
    Pending,
    All,
}

/// Store-wide figures for the operator statistics view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerTotals {
    pub users: i64,
    pub banned_users: i64,
    pub orders: i64,
    /// Sum of frozen order prices
    pub revenue: Decimal,
    /// Sum of all user balances
    pub outstanding_balance: Decimal,
    pub pending_deposits: i64,
    pub confirmed_credits: i64,
}

const ORDER_SELECT: &str = "SELECT o.id, o.user_id, o.product_id, p.name, o.price, o.status, o.created_at
     FROM orders o LEFT JOIN products p ON p.id = o.product_id";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        product_id: row.get(2)?,
        product_name: row.get(3)?,
        price: decimal_column(row, 4)?,
        status: parsed_column(row, 5)?,
        created_at: row.get(6)?,
    })
}

const DEPOSIT_COLUMNS: &str = "id, user_id, cash_amount, credits, status, created_at";

fn deposit_from_row(row: &Row<'_>) -> rusqlite::Result<DepositRequest> {
    Ok(DepositRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        cash_amount: decimal_column(row, 2)?,
        credits: row.get(3)?,
        status: parsed_column(row, 4)?,
        created_at: row.get(5)?,
    })
}

fn out_of_range(user_id: i64) -> AppError {
    AppError::Validation(format!("The balance of user {} would be out of range.", user_id))
}

/// Balance of a user; unknown users hold zero.
pub fn balance_of(conn: &Connection, user_id: i64) -> AppResult<Decimal> {
    let balance = conn
        .query_row("SELECT balance FROM users WHERE user_id = ?1", [user_id], |row| {
            decimal_column(row, 0)
        })
        .optional()?;
    Ok(balance.unwrap_or(Decimal::ZERO))
}

fn write_balance(conn: &Connection, user_id: i64, balance: Decimal) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET balance = ?1 WHERE user_id = ?2",
        params![balance.normalize().to_string(), user_id],
    )?;
    Ok(())
}

/// Applies a signed delta to a balance, creating the user row if needed.
///
/// Returns the new balance. A deduction may take the balance below zero.
pub fn adjust_balance(conn: &mut Connection, user_id: i64, delta: Decimal) -> AppResult<Decimal> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_user_row(&tx, user_id)?;
    let balance = balance_of(&tx, user_id)?
        .checked_add(delta)
        .ok_or_else(|| out_of_range(user_id))?;
    write_balance(&tx, user_id, balance)?;
    tx.commit()?;

    log::info!("Balance of user {} adjusted by {} to {}", user_id, delta, balance);
    Ok(balance)
}

/// Buys one product: debit and order insert commit together or not at all.
///
/// # Errors
///
/// * [`AppError::NotFound`] - the product does not exist
/// * [`AppError::InsufficientFunds`] - the balance is below the price; nothing changes
pub fn purchase(conn: &mut Connection, user_id: i64, product_id: i64) -> AppResult<PurchaseReceipt> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let product = get_product(&tx, product_id)?.ok_or_else(|| AppError::NotFound(format!("Product #{}", product_id)))?;
    let balance = balance_of(&tx, user_id)?;
    if balance < product.price {
        return Err(AppError::InsufficientFunds {
            price: product.price,
            balance,
        });
    }

    ensure_user_row(&tx, user_id)?;
    let balance = balance
        .checked_sub(product.price)
        .ok_or_else(|| out_of_range(user_id))?;
    write_balance(&tx, user_id, balance)?;

    let created_at = Utc::now();
    tx.execute(
        "INSERT INTO orders (user_id, product_id, price, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            product.id,
            product.price.to_string(),
            OrderStatus::New.to_string(),
            created_at
        ],
    )?;
    let order = Order {
        id: tx.last_insert_rowid(),
        user_id,
        product_id: product.id,
        product_name: Some(product.name.clone()),
        price: product.price,
        status: OrderStatus::New,
        created_at,
    };
    tx.commit()?;

    log::info!(
        "Order #{} placed by user {} for product {} at {}",
        order.id,
        user_id,
        product.id,
        product.price
    );
    Ok(PurchaseReceipt {
        order,
        product,
        balance,
    })
}

pub fn list_orders_for_user(conn: &Connection, user_id: i64) -> AppResult<Vec<Order>> {
    let mut stmt = conn.prepare(&format!("{} WHERE o.user_id = ?1 ORDER BY o.id DESC", ORDER_SELECT))?;
    let orders = stmt.query_map([user_id], order_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(orders)
}

pub fn count_orders(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?)
}

/// Records a pending deposit request. Minimum checks belong to the caller.
pub fn create_deposit(
    conn: &Connection,
    user_id: i64,
    cash_amount: Decimal,
    credits: i64,
) -> AppResult<DepositRequest> {
    let created_at = Utc::now();
    let cash_amount = cash_amount.normalize();
    conn.execute(
        "INSERT INTO deposits (user_id, cash_amount, credits, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            cash_amount.to_string(),
            credits,
            DepositStatus::Pending.to_string(),
            created_at
        ],
    )?;
    Ok(DepositRequest {
        id: conn.last_insert_rowid(),
        user_id,
        cash_amount,
        credits,
        status: DepositStatus::Pending,
        created_at,
    })
}

pub fn get_deposit(conn: &Connection, id: i64) -> AppResult<Option<DepositRequest>> {
    let deposit = conn
        .query_row(
            &format!("SELECT {} FROM deposits WHERE id = ?1", DEPOSIT_COLUMNS),
            [id],
            deposit_from_row,
        )
        .optional()?;
    Ok(deposit)
}

/// Newest first.
pub fn list_deposits(conn: &Connection, filter: DepositFilter, limit: usize) -> AppResult<Vec<DepositRequest>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let deposits = match filter {
        DepositFilter::Pending => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM deposits WHERE status = ?1 ORDER BY id DESC LIMIT ?2",
                DEPOSIT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![DepositStatus::Pending.to_string(), limit], deposit_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        DepositFilter::All => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM deposits ORDER BY id DESC LIMIT ?1",
                DEPOSIT_COLUMNS
            ))?;
            let rows = stmt.query_map([limit], deposit_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(deposits)
}

/// Credits a pending deposit and marks it confirmed, atomically.
///
/// A second confirmation is [`AppError::AlreadyConfirmed`] and a rejected
/// request is [`AppError::AlreadyCancelled`]; neither touches any row.
pub fn confirm_deposit(conn: &mut Connection, id: i64) -> AppResult<DepositRequest> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut deposit = get_deposit(&tx, id)?.ok_or_else(|| AppError::NotFound(format!("Deposit #{}", id)))?;
    match deposit.status {
        DepositStatus::Confirmed => return Err(AppError::AlreadyConfirmed(id)),
        DepositStatus::Cancelled => return Err(AppError::AlreadyCancelled(id)),
        DepositStatus::Pending => {}
    }

    let changed = tx.execute(
        "UPDATE deposits SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![
            DepositStatus::Confirmed.to_string(),
            id,
            DepositStatus::Pending.to_string()
        ],
    )?;
    if changed != 1 {
        return Err(AppError::AlreadyConfirmed(id));
    }

    ensure_user_row(&tx, deposit.user_id)?;
    let balance = balance_of(&tx, deposit.user_id)?
        .checked_add(Decimal::from(deposit.credits))
        .ok_or_else(|| out_of_range(deposit.user_id))?;
    write_balance(&tx, deposit.user_id, balance)?;
    tx.commit()?;

    deposit.status = DepositStatus::Confirmed;
    log::info!(
        "Deposit #{} confirmed: user {} credited {} (balance {})",
        id,
        deposit.user_id,
        deposit.credits,
        balance
    );
    Ok(deposit)
}

/// Cancels a deposit that is still pending; any other state is left as is.
pub fn reject_deposit(conn: &mut Connection, id: i64) -> AppResult<RejectOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut deposit = get_deposit(&tx, id)?.ok_or_else(|| AppError::NotFound(format!("Deposit #{}", id)))?;
    if deposit.status != DepositStatus::Pending {
        return Ok(RejectOutcome::NotPending(deposit));
    }

    tx.execute(
        "UPDATE deposits SET status = ?1 WHERE id = ?2",
        params![DepositStatus::Cancelled.to_string(), id],
    )?;
    tx.commit()?;

    deposit.status = DepositStatus::Cancelled;
    log::info!("Deposit #{} of user {} rejected", id, deposit.user_id);
    Ok(RejectOutcome::Rejected(deposit))
}

fn sum_decimal_column(conn: &Connection, sql: &str) -> AppResult<Decimal> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map([], |row| decimal_column(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| AppError::Validation("The totals are too large to add up.".to_string()))
}

pub fn ledger_totals(conn: &Connection) -> AppResult<LedgerTotals> {
    let users = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    let banned_users = conn.query_row("SELECT COUNT(*) FROM users WHERE banned = 1", [], |row| row.get(0))?;
    let pending_deposits = conn.query_row(
        "SELECT COUNT(*) FROM deposits WHERE status = ?1",
        [DepositStatus::Pending.to_string()],
        |row| row.get(0),
    )?;
    let confirmed_credits = conn.query_row(
        "SELECT COALESCE(SUM(credits), 0) FROM deposits WHERE status = ?1",
        [DepositStatus::Confirmed.to_string()],
        |row| row.get(0),
    )?;

    Ok(LedgerTotals {
        users,
        banned_users,
        orders: count_orders(conn)?,
        revenue: sum_decimal_column(conn, "SELECT price FROM orders")?,
        outstanding_balance: sum_decimal_column(conn, "SELECT balance FROM users")?,
        pending_deposits,
        confirmed_credits,
    })
}
