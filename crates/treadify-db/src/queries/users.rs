use anyhow::Result;
use rusqlite::Connection;
use treadify_types::Role;

use super::OptionalExt;
use crate::models::UserRow;
use crate::{Database, is_unique_violation};

const USER_COLUMNS: &str = "SELECT u.id, u.username, u.email, u.password, r.name, u.created_at
     FROM users u
     LEFT JOIN roles r ON r.id = u.role_id";

impl Database {
    // -- Users --

    /// Insert a user with the given role. Returns `false` if the username is taken.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, email, password, role_id)
                 VALUES (?1, ?2, ?3, ?4, (SELECT id FROM roles WHERE name = ?5))",
                (id, username, email, password_hash, role.as_str()),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.username", username))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("{USER_COLUMNS} WHERE {column} = ?1"))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}
