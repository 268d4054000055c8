//! Identity rows: names, balance snapshot and the ban flag

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::core::AppResult;
use crate::storage::db::decimal_column;

/// Structure representing a store user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Telegram ID of the user
    pub id: i64,
    /// Username (without @), if the user has one
    pub username: Option<String>,
    pub first_name: Option<String>,
    /// Current credit balance; may be negative after an operator deduction
    pub balance: Decimal,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// `@username` when available, otherwise the numeric id.
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => format!("@{}", name),
            _ => self.id.to_string(),
        }
    }
}

const USER_COLUMNS: &str = "user_id, username, first_name, balance, banned, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        balance: decimal_column(row, 3)?,
        banned: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

/// Records a contact: creates the row on first sight and refreshes the names
/// on every later one. The balance is never touched here.
pub fn ensure_user(
    conn: &Connection,
    user_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (user_id, username, first_name, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET username = excluded.username, first_name = excluded.first_name",
        params![user_id, username, first_name, Utc::now()],
    )?;
    Ok(())
}

/// Creates a bare row for an id seen only through an operator command.
pub(crate) fn ensure_user_row(conn: &Connection, user_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (user_id, created_at) VALUES (?1, ?2)",
        params![user_id, Utc::now()],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS),
            [user_id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// All known users, oldest first.
pub fn list_users(conn: &Connection) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY created_at, user_id", USER_COLUMNS))?;
    let users = stmt.query_map([], user_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Ids of every known user (broadcast recipients).
pub fn list_user_ids(conn: &Connection) -> AppResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY user_id")?;
    let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Sets the ban flag. Idempotent; unknown ids get a row so the ban sticks
/// once they show up.
pub fn set_banned(conn: &Connection, user_id: i64, banned: bool) -> AppResult<()> {
    ensure_user_row(conn, user_id)?;
    conn.execute(
        "UPDATE users SET banned = ?1 WHERE user_id = ?2",
        params![banned as i64, user_id],
    )?;
    Ok(())
}

pub fn is_banned(conn: &Connection, user_id: i64) -> AppResult<bool> {
    let banned: Option<i64> = conn
        .query_row("SELECT banned FROM users WHERE user_id = ?1", [user_id], |row| row.get(0))
        .optional()?;
    Ok(banned.unwrap_or(0) != 0)
}

pub fn count_users(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}
