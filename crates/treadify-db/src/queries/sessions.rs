use anyhow::Result;

use super::OptionalExt;
use crate::{Database, is_unique_violation};

impl Database {
    // -- Sessions --

    /// Insert a new session record. Returns `false` if the id already exists.
    pub fn create_session(&self, id: &str, data: &str, expiry_date: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            match conn.execute(
                "INSERT INTO sessions (id, data, expiry_date) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, data, expiry_date],
            ) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn save_session(&self, id: &str, data: &str, expiry_date: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, data, expiry_date) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data, expiry_date = excluded.expiry_date",
                rusqlite::params![id, data, expiry_date],
            )?;
            Ok(())
        })
    }

    /// Session payload if the record exists and expires after `now`.
    pub fn load_session(&self, id: &str, now: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT data FROM sessions WHERE id = ?1 AND expiry_date > ?2",
                rusqlite::params![id, now],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn delete_expired_sessions(&self, now: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM sessions WHERE expiry_date <= ?1", [now])?)
        })
    }
}
