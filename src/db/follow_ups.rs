use rusqlite::{params, Row};

use super::*;

fn follow_up_from_row(row: &Row) -> rusqlite::Result<DbFollowUp> {
    let status_raw: String = row.get(4)?;
    Ok(DbFollowUp {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        follow_up_date: row.get(2)?,
        details: row.get(3)?,
        status: FollowUpStatus::parse(&status_raw),
        created_at: row.get(5)?,
    })
}

const FOLLOW_UP_COLUMNS: &str = "id, lead_id, follow_up_date, details, status, created_at";

impl CrmDb {
    // =========================================================================
    // Follow-up occurrences
    // =========================================================================

    pub fn insert_follow_up(&self, follow_up: &DbFollowUp) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO follow_ups (id, lead_id, follow_up_date, details, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                follow_up.id,
                follow_up.lead_id,
                follow_up.follow_up_date,
                follow_up.details,
                follow_up.status.as_str(),
                follow_up.created_at,
            ],
        )?;
        Ok(())
    }

    /// Mark one occurrence done. Other occurrences on the same lead are
    /// independent and unaffected.
    pub fn mark_follow_up_done(&self, id: &str) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE follow_ups SET status = 'done' WHERE id = ?1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// All occurrences attached to a lead, earliest first.
    pub fn get_follow_ups_for_lead(&self, lead_id: &str) -> Result<Vec<DbFollowUp>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM follow_ups WHERE lead_id = ?1 ORDER BY follow_up_date",
            FOLLOW_UP_COLUMNS
        ))?;
        let rows = stmt.query_map(params![lead_id], follow_up_from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Occurrences whose date falls within an inclusive ISO-date window,
    /// earliest first.
    pub fn get_follow_ups_in_window(
        &self,
        window_start: &str,
        window_end: &str,
    ) -> Result<Vec<DbFollowUp>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM follow_ups
             WHERE follow_up_date >= ?1 AND follow_up_date <= ?2
             ORDER BY follow_up_date",
            FOLLOW_UP_COLUMNS
        ))?;
        let rows = stmt.query_map(params![window_start, window_end], follow_up_from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}
