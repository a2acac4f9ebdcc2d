use rusqlite::{params, Row};

use super::*;

fn lead_from_row(row: &Row) -> rusqlite::Result<DbLead> {
    Ok(DbLead {
        id: row.get(0)?,
        parent_name: row.get(1)?,
        child_name: row.get(2)?,
        phone: row.get(3)?,
        alternate_phone: row.get(4)?,
        email: row.get(5)?,
        stage: row.get(6)?,
        score: row.get(7)?,
        category: row.get(8)?,
        counsellor: row.get(9)?,
        previous_stage: row.get(10)?,
        source: row.get(11)?,
        grade: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

const LEAD_COLUMNS: &str = "id, parent_name, child_name, phone, alternate_phone, email, \
     stage, score, category, counsellor, previous_stage, source, grade, \
     created_at, updated_at";

impl CrmDb {
    // =========================================================================
    // Leads
    // =========================================================================

    /// Insert a new lead row.
    pub fn insert_lead(&self, lead: &DbLead) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO leads (
                id, parent_name, child_name, phone, alternate_phone, email,
                stage, score, category, counsellor, previous_stage, source, grade,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                lead.id,
                lead.parent_name,
                lead.child_name,
                lead.phone,
                lead.alternate_phone,
                lead.email,
                lead.stage,
                lead.score,
                lead.category,
                lead.counsellor,
                lead.previous_stage,
                lead.source,
                lead.grade,
                lead.created_at,
                lead.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Fetch a single lead by id.
    pub fn get_lead(&self, id: &str) -> Result<Option<DbLead>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLUMNS))?;
        let mut rows = stmt.query_map(params![id], lead_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// All leads, newest first.
    pub fn get_all_leads(&self) -> Result<Vec<DbLead>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM leads ORDER BY created_at DESC",
            LEAD_COLUMNS
        ))?;
        let rows = stmt.query_map([], lead_from_row)?;
        let mut leads = Vec::new();
        for row in rows {
            leads.push(row?);
        }
        Ok(leads)
    }

    /// Leads created within an inclusive RFC 3339 window, newest first.
    pub fn get_leads_created_between(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<DbLead>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM leads
             WHERE created_at >= ?1 AND created_at <= ?2
             ORDER BY created_at DESC",
            LEAD_COLUMNS
        ))?;
        let rows = stmt.query_map(params![from, to], lead_from_row)?;
        let mut leads = Vec::new();
        for row in rows {
            leads.push(row?);
        }
        Ok(leads)
    }

    /// Persist the outcome of a stage transition: stage, derived score and
    /// category, and the reactivation breadcrumb, in one statement so the
    /// derived fields can never be observed out of sync with the stage.
    pub fn update_lead_stage(
        &self,
        id: &str,
        stage: &str,
        score: i64,
        category: &str,
        previous_stage: Option<&str>,
        updated_at: &str,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE leads
             SET stage = ?2, score = ?3, category = ?4, previous_stage = ?5, updated_at = ?6
             WHERE id = ?1",
            params![id, stage, score, category, previous_stage, updated_at],
        )?;
        Ok(changed > 0)
    }

    /// Update the editable contact/classification fields of a lead.
    /// Derived fields (stage, score, category, previous_stage) are not
    /// touched here; those only move through `update_lead_stage`.
    pub fn update_lead_fields(&self, lead: &DbLead) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE leads
             SET parent_name = ?2, child_name = ?3, phone = ?4, alternate_phone = ?5,
                 email = ?6, counsellor = ?7, source = ?8, grade = ?9, updated_at = ?10
             WHERE id = ?1",
            params![
                lead.id,
                lead.parent_name,
                lead.child_name,
                lead.phone,
                lead.alternate_phone,
                lead.email,
                lead.counsellor,
                lead.source,
                lead.grade,
                lead.updated_at,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Bulk-reassign a set of leads to a counsellor (by display name).
    /// Returns the number of rows updated.
    pub fn reassign_leads(
        &self,
        ids: &[String],
        counsellor: &str,
        updated_at: &str,
    ) -> Result<usize, DbError> {
        let mut changed = 0;
        for id in ids {
            changed += self.conn.execute(
                "UPDATE leads SET counsellor = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, counsellor, updated_at],
            )?;
        }
        Ok(changed)
    }

    /// Delete a set of leads together with the custom-field values and
    /// follow-up occurrences they own. Storage does not cascade; this is the
    /// explicit dependent purge bulk delete correctness relies on.
    /// Achievements and activity logs are append-only audit facts and are
    /// deliberately retained.
    pub fn delete_leads(&self, ids: &[String]) -> Result<usize, DbError> {
        self.with_transaction(|tx| {
            let mut deleted = 0;
            for id in ids {
                tx.conn.execute(
                    "DELETE FROM custom_field_values WHERE lead_id = ?1",
                    params![id],
                )?;
                tx.conn
                    .execute("DELETE FROM follow_ups WHERE lead_id = ?1", params![id])?;
                deleted += tx
                    .conn
                    .execute("DELETE FROM leads WHERE id = ?1", params![id])?;
            }
            Ok(deleted)
        })
    }

    // =========================================================================
    // Custom field values (owned by leads)
    // =========================================================================

    /// Write a custom field value for a lead, replacing any prior value for
    /// the same field key.
    pub fn set_custom_field_value(
        &self,
        id: &str,
        lead_id: &str,
        field_key: &str,
        value: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO custom_field_values (id, lead_id, field_key, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(lead_id, field_key) DO UPDATE SET value = excluded.value",
            params![id, lead_id, field_key, value],
        )?;
        Ok(())
    }

    /// All custom field values owned by a lead.
    pub fn get_custom_field_values(
        &self,
        lead_id: &str,
    ) -> Result<Vec<DbCustomFieldValue>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lead_id, field_key, value
             FROM custom_field_values WHERE lead_id = ?1 ORDER BY field_key",
        )?;
        let rows = stmt.query_map(params![lead_id], |row| {
            Ok(DbCustomFieldValue {
                id: row.get(0)?,
                lead_id: row.get(1)?,
                field_key: row.get(2)?,
                value: row.get(3)?,
            })
        })?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }
}
