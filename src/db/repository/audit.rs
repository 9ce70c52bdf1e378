use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// One row of the access trail.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub detail: String,
}

pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, actor, action, detail) VALUES (?1, ?2, ?3, ?4)",
        params![entry.timestamp, entry.actor, entry.action, entry.detail],
    )?;
    Ok(())
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < strftime('%Y-%m-%dT%H:%M:%SZ', 'now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

/// Most recent entries first.
pub fn recent_audit_entries(conn: &Connection, limit: u32) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, actor, action, detail FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(AuditEntry {
                timestamp: row.get(0)?,
                actor: row.get(1)?,
                action: row.get(2)?,
                detail: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn entry(timestamp: &str, action: &str) -> AuditEntry {
        AuditEntry {
            timestamp: timestamp.into(),
            actor: "user:1".into(),
            action: action.into(),
            detail: "status:200".into(),
        }
    }

    #[test]
    fn recent_entries_newest_first() {
        let conn = open_memory_database().unwrap();
        insert_audit_entry(&conn, &entry("2026-01-01T10:00:00Z", "GET /api/patients")).unwrap();
        insert_audit_entry(&conn, &entry("2026-01-01T10:00:05Z", "POST /api/patients")).unwrap();
        let recent = recent_audit_entries(&conn, 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "POST /api/patients");
    }

    #[test]
    fn prune_removes_old_entries_only() {
        let conn = open_memory_database().unwrap();
        insert_audit_entry(&conn, &entry("2000-01-01T00:00:00Z", "old")).unwrap();
        let fresh = crate::db::format_timestamp(&chrono::Utc::now());
        insert_audit_entry(&conn, &entry(&fresh, "fresh")).unwrap();
        assert_eq!(prune_audit_log(&conn, 90).unwrap(), 1);
        let left = recent_audit_entries(&conn, 10).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].action, "fresh");
    }
}
