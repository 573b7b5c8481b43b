use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::GitHubIntegrationRow;

impl Database {
    // -- GitHub --

    /// Link (or relink) a GitHub account to a user.
    pub fn upsert_github_integration(
        &self,
        user_id: &str,
        github_username: &str,
        access_token: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_github_integrations (user_id, github_username, access_token)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    github_username = excluded.github_username,
                    access_token = excluded.access_token,
                    linked_at = datetime('now')",
                [user_id, github_username, access_token],
            )?;
            Ok(())
        })
    }

    pub fn get_github_integration(&self, user_id: &str) -> Result<Option<GitHubIntegrationRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, github_username, access_token
                 FROM user_github_integrations WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(GitHubIntegrationRow {
                        user_id: row.get(0)?,
                        github_username: row.get(1)?,
                        access_token: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }
}
