use rusqlite::{params, Row};

use super::*;

fn achievement_from_row(row: &Row) -> rusqlite::Result<DbAchievement> {
    Ok(DbAchievement {
        id: row.get(0)?,
        counsellor_user_id: row.get(1)?,
        counsellor_name: row.get(2)?,
        stage_key: row.get(3)?,
        lead_id: row.get(4)?,
        achieved_at: row.get(5)?,
    })
}

const ACHIEVEMENT_COLUMNS: &str =
    "id, counsellor_user_id, counsellor_name, stage_key, lead_id, achieved_at";

impl CrmDb {
    // =========================================================================
    // Counsellor stage achievements
    // =========================================================================

    /// Fast-path duplicate probe for the recorder. The unique index on
    /// (counsellor_user_id, stage_key, lead_id) remains the authoritative
    /// guard under concurrent writers.
    pub fn achievement_exists(
        &self,
        counsellor_user_id: &str,
        stage_key: &str,
        lead_id: &str,
    ) -> Result<bool, DbError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM counsellor_stage_achievements
                WHERE counsellor_user_id = ?1 AND stage_key = ?2 AND lead_id = ?3
             )",
            params![counsellor_user_id, stage_key, lead_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Idempotent insert. `INSERT OR IGNORE` turns a uniqueness violation
    /// into a benign no-op, so a duplicate racing past the application-level
    /// check is absorbed here rather than surfaced as an error.
    /// Returns true if a row was actually written.
    pub fn insert_achievement(&self, achievement: &DbAchievement) -> Result<bool, DbError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO counsellor_stage_achievements
                (id, counsellor_user_id, counsellor_name, stage_key, lead_id, achieved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                achievement.id,
                achievement.counsellor_user_id,
                achievement.counsellor_name,
                achievement.stage_key,
                achievement.lead_id,
                achievement.achieved_at,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Achievements within an optional inclusive RFC 3339 window, oldest
    /// first. `None` bounds are open-ended.
    pub fn get_achievements_between(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<DbAchievement>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM counsellor_stage_achievements
             WHERE (?1 IS NULL OR achieved_at >= ?1)
               AND (?2 IS NULL OR achieved_at <= ?2)
             ORDER BY achieved_at",
            ACHIEVEMENT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![from, to], achievement_from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn achievement(id: &str, user: &str, stage: &str, lead: &str, at: &str) -> DbAchievement {
        DbAchievement {
            id: id.to_string(),
            counsellor_user_id: user.to_string(),
            counsellor_name: "Priya".to_string(),
            stage_key: stage.to_string(),
            lead_id: lead.to_string(),
            achieved_at: at.to_string(),
        }
    }

    #[test]
    fn test_insert_is_idempotent_per_fact() {
        let db = test_db();
        let first = db
            .insert_achievement(&achievement(
                "a1",
                "u1",
                "meeting_booked",
                "lead-1",
                "2026-01-01T00:00:00Z",
            ))
            .expect("insert");
        assert!(first);

        // Same fact under a different row id and timestamp must be ignored
        let second = db
            .insert_achievement(&achievement(
                "a2",
                "u1",
                "meeting_booked",
                "lead-1",
                "2026-01-05T00:00:00Z",
            ))
            .expect("insert");
        assert!(!second);

        let count: i32 = db
            .conn_ref()
            .query_row(
                "SELECT COUNT(*) FROM counsellor_stage_achievements",
                [],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_exists_probe() {
        let db = test_db();
        assert!(!db
            .achievement_exists("u1", "meeting_booked", "lead-1")
            .expect("probe"));
        db.insert_achievement(&achievement(
            "a1",
            "u1",
            "meeting_booked",
            "lead-1",
            "2026-01-01T00:00:00Z",
        ))
        .expect("insert");
        assert!(db
            .achievement_exists("u1", "meeting_booked", "lead-1")
            .expect("probe"));
        // Different lead is a different fact
        assert!(!db
            .achievement_exists("u1", "meeting_booked", "lead-2")
            .expect("probe"));
    }

    #[test]
    fn test_window_bounds_inclusive_and_open_ended() {
        let db = test_db();
        for (id, at) in [
            ("a1", "2026-01-01T00:00:00Z"),
            ("a2", "2026-02-01T00:00:00Z"),
            ("a3", "2026-03-01T00:00:00Z"),
        ] {
            db.insert_achievement(&achievement(id, "u1", "admission", &format!("lead-{id}"), at))
                .expect("insert");
        }

        let bounded = db
            .get_achievements_between(Some("2026-02-01T00:00:00Z"), Some("2026-03-01T00:00:00Z"))
            .expect("query");
        assert_eq!(bounded.len(), 2);

        let open_start = db
            .get_achievements_between(None, Some("2026-01-31T23:59:59Z"))
            .expect("query");
        assert_eq!(open_start.len(), 1);

        let all = db.get_achievements_between(None, None).expect("query");
        assert_eq!(all.len(), 3);
    }
}
