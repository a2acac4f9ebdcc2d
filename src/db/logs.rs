use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::*;

fn log_from_row(row: &Row) -> rusqlite::Result<DbLogEntry> {
    Ok(DbLogEntry {
        id: row.get(0)?,
        record_id: row.get(1)?,
        action: row.get(2)?,
        details: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl CrmDb {
    // =========================================================================
    // Activity log (append-only)
    // =========================================================================

    pub fn append_log(
        &self,
        record_id: &str,
        action: &str,
        details: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO logs (id, record_id, action, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                record_id,
                action,
                details,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// History for one record, newest first.
    pub fn get_logs_for_record(&self, record_id: &str) -> Result<Vec<DbLogEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, record_id, action, details, created_at
             FROM logs WHERE record_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![record_id], log_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

/// Append an activity entry, swallowing failures. History is best-effort
/// telemetry, not a correctness dependency; a failed write must never abort
/// the operation that produced it.
pub fn record_activity(db: &CrmDb, record_id: &str, action: &str, details: Option<&str>) {
    if let Err(e) = db.append_log(record_id, action, details) {
        log::warn!("activity log write failed for {record_id} ({action}): {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    #[test]
    fn test_append_and_read_back() {
        let db = test_db();
        db.append_log("lead-1", "stage_changed", Some("new_lead → meeting_booked"))
            .expect("append");
        db.append_log("lead-1", "reassigned", None).expect("append");
        db.append_log("lead-2", "created", None).expect("append");

        let entries = db.get_logs_for_record("lead-1").expect("read");
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.action == "stage_changed"));
    }

    #[test]
    fn test_record_activity_swallows_failure() {
        let db = test_db();
        // Break the table so the write fails; the helper must not panic.
        db.conn_ref()
            .execute_batch("DROP TABLE logs;")
            .expect("drop");
        record_activity(&db, "lead-1", "created", None);
    }
}
