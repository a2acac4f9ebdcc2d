use rusqlite::{params, Row};

use super::*;

fn setting_from_row(row: &Row) -> rusqlite::Result<DbSetting> {
    let kind_raw: String = row.get(1)?;
    Ok(DbSetting {
        id: row.get(0)?,
        kind: SettingKind::parse(&kind_raw).unwrap_or(SettingKind::Stage),
        key: row.get(2)?,
        display_name: row.get(3)?,
        color: row.get(4)?,
        score: row.get(5)?,
        category: row.get(6)?,
        sort_order: row.get(7)?,
        active: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const SETTING_COLUMNS: &str = "id, kind, key, display_name, color, score, category, \
     sort_order, active, created_at, updated_at";

impl CrmDb {
    // =========================================================================
    // Settings: stage / source / grade catalogs
    // =========================================================================

    /// Insert a catalog entry. The (kind, key) pair must be new; keys are
    /// immutable once assigned.
    pub fn insert_setting(&self, setting: &DbSetting) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO settings (
                id, kind, key, display_name, color, score, category,
                sort_order, active, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                setting.id,
                setting.kind.as_str(),
                setting.key,
                setting.display_name,
                setting.color,
                setting.score,
                setting.category,
                setting.sort_order,
                setting.active as i64,
                setting.created_at,
                setting.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Active entries of one catalog, in sort order.
    pub fn get_active_settings(&self, kind: SettingKind) -> Result<Vec<DbSetting>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM settings
             WHERE kind = ?1 AND active = 1
             ORDER BY sort_order, key",
            SETTING_COLUMNS
        ))?;
        let rows = stmt.query_map(params![kind.as_str()], setting_from_row)?;
        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    /// Fetch one catalog entry by key.
    pub fn get_setting(&self, kind: SettingKind, key: &str) -> Result<Option<DbSetting>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM settings WHERE kind = ?1 AND key = ?2",
            SETTING_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![kind.as_str(), key], setting_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Rename the display name of a catalog entry. The key never changes, so
    /// lead rows referencing it resolve to the new name without being
    /// rewritten.
    pub fn rename_setting(
        &self,
        kind: SettingKind,
        key: &str,
        display_name: &str,
        updated_at: &str,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE settings SET display_name = ?3, updated_at = ?4
             WHERE kind = ?1 AND key = ?2",
            params![kind.as_str(), key, display_name, updated_at],
        )?;
        Ok(changed > 0)
    }

    /// Soft-deactivate a catalog entry. Referenced keys keep resolving; the
    /// entry just stops being offered for new assignments.
    pub fn deactivate_setting(
        &self,
        kind: SettingKind,
        key: &str,
        updated_at: &str,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE settings SET active = 0, updated_at = ?3
             WHERE kind = ?1 AND key = ?2",
            params![kind.as_str(), key, updated_at],
        )?;
        Ok(changed > 0)
    }
}
