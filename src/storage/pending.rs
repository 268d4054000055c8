//! Per-user pending action rows.
//!
//! At most one row per user; the action is stored as tagged JSON so every
//! state of the flow machine round-trips through the same column.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::{AppError, AppResult};
use crate::flows::PendingAction;

/// Records what the user's next text message means, replacing any earlier action.
pub fn set_pending(conn: &Connection, user_id: i64, action: &PendingAction) -> AppResult<()> {
    let encoded = serde_json::to_string(action).map_err(|e| AppError::StalePending(e.to_string()))?;
    conn.execute(
        "INSERT INTO pending_actions (user_id, action, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET action = excluded.action, created_at = excluded.created_at",
        params![user_id, encoded, Utc::now()],
    )?;
    Ok(())
}

/// Current pending action, if any.
///
/// A row that no longer decodes (unknown tag written by another build) is
/// reported as [`AppError::StalePending`]; the caller decides whether to clear it.
pub fn get_pending(conn: &Connection, user_id: i64) -> AppResult<Option<PendingAction>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT action FROM pending_actions WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|_| AppError::StalePending(raw)),
    }
}

/// Idempotent.
pub fn clear_pending(conn: &Connection, user_id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM pending_actions WHERE user_id = ?1", [user_id])?;
    Ok(())
}
