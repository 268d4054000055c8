use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::core::AppResult;

/// One successful operator mutation
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: i64,
    pub operator_id: i64,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

pub fn record(conn: &Connection, operator_id: i64, action: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO audit_log (operator_id, action, created_at) VALUES (?1, ?2, ?3)",
        params![operator_id, action, Utc::now()],
    )?;
    Ok(())
}

/// Most recent entries first.
pub fn recent(conn: &Connection, limit: usize) -> AppResult<Vec<AuditEntry>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt =
        conn.prepare("SELECT id, operator_id, action, created_at FROM audit_log ORDER BY id DESC LIMIT ?1")?;
    let entries = stmt
        .query_map([limit], |row| {
            Ok(AuditEntry {
                id: row.get(0)?,
                operator_id: row.get(1)?,
                action: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::open_in_memory;

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let conn = open_in_memory().unwrap();
        record(&conn, 1, "add_category Games").unwrap();
        record(&conn, 1, "ban 7").unwrap();
        record(&conn, 1, "set_rate 3000").unwrap();

        let entries = recent(&conn, 2).unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["set_rate 3000", "ban 7"]);
    }
}
