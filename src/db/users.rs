use rusqlite::{params, Row};

use super::*;

fn user_from_row(row: &Row) -> rusqlite::Result<DbUser> {
    Ok(DbUser {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

const USER_COLUMNS: &str = "id, name, email, role, active, created_at";

impl CrmDb {
    // =========================================================================
    // Users
    // =========================================================================

    pub fn upsert_user(&self, user: &DbUser) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, role, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = COALESCE(excluded.email, users.email),
                role = excluded.role,
                active = excluded.active",
            params![
                user.id,
                user.name,
                user.email,
                user.role,
                user.active as i64,
                user.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))?;
        let mut rows = stmt.query_map(params![id], user_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn get_all_users(&self) -> Result<Vec<DbUser>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM users ORDER BY name", USER_COLUMNS))?;
        let rows = stmt.query_map([], user_from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
