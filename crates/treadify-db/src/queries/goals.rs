use anyhow::Result;
use rusqlite::Row;

use super::OptionalExt;
use crate::Database;
use crate::models::{CommitRow, GoalProgressRow, GoalRow, NewGoal};

const GOAL_COLUMNS: &str =
    "SELECT g.id, g.feature_id, g.title, g.description, g.status, g.created_by, g.created_at
     FROM goals g";

const COMMIT_COLUMNS: &str = "SELECT c.id, c.goal_id, c.author_id, u.username, c.message, c.sha, c.url,
            c.status, c.reviewer_id, c.review_comment, c.created_at
     FROM commits c
     JOIN goals g ON g.id = c.goal_id
     LEFT JOIN users u ON u.id = c.author_id";

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<GoalRow> {
    Ok(GoalRow {
        id: row.get(0)?,
        feature_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        created_by: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn commit_from_row(row: &Row<'_>) -> rusqlite::Result<CommitRow> {
    Ok(CommitRow {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        message: row.get(4)?,
        sha: row.get(5)?,
        url: row.get(6)?,
        status: row.get(7)?,
        reviewer_id: row.get(8)?,
        review_comment: row.get(9)?,
        created_at: row.get(10)?,
    })
}

impl Database {
    // -- Goals --

    /// Insert a goal and, if present, its channel announcement in one transaction.
    pub fn create_goal(&self, goal: &NewGoal<'_>) -> Result<()> {
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO goals (id, feature_id, title, description, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    goal.id,
                    goal.feature_id,
                    goal.title,
                    goal.description,
                    goal.created_by
                ],
            )?;
            if let Some(announcement) = &goal.announcement {
                tx.execute(
                    "INSERT INTO messages (id, channel_id, sender_id, content) VALUES (?1, ?2, ?3, ?4)",
                    (
                        announcement.message_id,
                        announcement.channel_id,
                        goal.created_by,
                        announcement.content,
                    ),
                )?;
            }
            Ok(())
        })
    }

    pub fn get_goal(&self, id: &str) -> Result<Option<GoalRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{GOAL_COLUMNS} WHERE g.id = ?1"), [id], goal_from_row)
                .optional()
        })
    }

    pub fn list_goals_for_feature(&self, feature_id: &str) -> Result<Vec<GoalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{GOAL_COLUMNS} WHERE g.feature_id = ?1 ORDER BY g.created_at, g.rowid"
            ))?;
            let rows = stmt
                .query_map([feature_id], goal_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_goals_for_product(&self, product_id: &str) -> Result<Vec<GoalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{GOAL_COLUMNS} JOIN features f ON f.id = g.feature_id
                 WHERE f.product_id = ?1
                 ORDER BY f.created_at, g.created_at, g.rowid"
            ))?;
            let rows = stmt
                .query_map([product_id], goal_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark a goal completed, only if it belongs to `feature_id`.
    pub fn complete_goal(&self, goal_id: &str, feature_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE goals SET status = 'completed', completed_at = datetime('now')
                 WHERE id = ?1 AND feature_id = ?2",
                [goal_id, feature_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Per-goal commit counts for a feature.
    pub fn feature_progress(&self, feature_id: &str) -> Result<Vec<GoalProgressRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.title, g.status,
                        COUNT(c.id),
                        COALESCE(SUM(c.status = 'approved'), 0)
                 FROM goals g
                 LEFT JOIN commits c ON c.goal_id = g.id
                 WHERE g.feature_id = ?1
                 GROUP BY g.id
                 ORDER BY g.created_at, g.rowid",
            )?;
            let rows = stmt
                .query_map([feature_id], |row| {
                    Ok(GoalProgressRow {
                        goal_id: row.get(0)?,
                        title: row.get(1)?,
                        status: row.get(2)?,
                        commits_total: row.get(3)?,
                        commits_approved: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Commits --

    pub fn insert_commit(
        &self,
        id: &str,
        goal_id: &str,
        author_id: &str,
        message: &str,
        sha: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO commits (id, goal_id, author_id, message, sha, url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, goal_id, author_id, message, sha, url],
            )?;
            Ok(())
        })
    }

    pub fn get_commit(&self, id: &str) -> Result<Option<CommitRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{COMMIT_COLUMNS} WHERE c.id = ?1"), [id], commit_from_row)
                .optional()
        })
    }

    pub fn list_commits_for_feature(&self, feature_id: &str) -> Result<Vec<CommitRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMIT_COLUMNS} WHERE g.feature_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC"
            ))?;
            let rows = stmt
                .query_map([feature_id], commit_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_commits_by_author(&self, author_id: &str) -> Result<Vec<CommitRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMMIT_COLUMNS} WHERE c.author_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC"
            ))?;
            let rows = stmt
                .query_map([author_id], commit_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record a review decision on a commit whose goal belongs to `feature_id`.
    pub fn review_commit(
        &self,
        commit_id: &str,
        feature_id: &str,
        reviewer_id: &str,
        status: &str,
        comment: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE commits
                 SET status = ?1, reviewer_id = ?2, review_comment = ?3, reviewed_at = datetime('now')
                 WHERE id = ?4
                   AND goal_id IN (SELECT id FROM goals WHERE feature_id = ?5)",
                rusqlite::params![status, reviewer_id, comment, commit_id, feature_id],
            )?;
            Ok(changed > 0)
        })
    }
}
