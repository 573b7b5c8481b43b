use anyhow::Result;
use rusqlite::Row;

use super::OptionalExt;
use crate::models::{ChannelRow, MemberRow};
use crate::{Database, is_unique_violation};

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        product_id: row.get(1)?,
        feature_id: row.get(2)?,
    })
}

impl Database {
    // -- Channels --

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, product_id, feature_id FROM channels WHERE id = ?1",
                [id],
                channel_from_row,
            )
            .optional()
        })
    }

    /// The channel the user joined most recently, used to scope a fresh login.
    pub fn latest_membership(&self, user_id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT c.id, c.product_id, c.feature_id
                 FROM channel_members m
                 JOIN channels c ON c.id = m.channel_id
                 WHERE m.user_id = ?1
                 ORDER BY m.joined_at DESC, m.rowid DESC
                 LIMIT 1",
                [user_id],
                channel_from_row,
            )
            .optional()
        })
    }

    pub fn is_channel_member(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM channel_members WHERE channel_id = ?1 AND user_id = ?2",
                    [channel_id, user_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Members of every channel (product-level and feature-level) under a product.
    pub fn product_members(&self, product_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, r.name, c.id, c.feature_id
                 FROM channel_members m
                 JOIN channels c ON c.id = m.channel_id
                 JOIN users u ON u.id = m.user_id
                 LEFT JOIN roles r ON r.id = u.role_id
                 WHERE c.product_id = ?1
                 ORDER BY c.feature_id IS NOT NULL, c.created_at, u.username",
            )?;
            let rows = stmt
                .query_map([product_id], |row| {
                    Ok(MemberRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        role: row.get(2)?,
                        channel_id: row.get(3)?,
                        feature_id: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Invites --

    /// Persist an invite code. Returns `false` when the code is already taken;
    /// the UNIQUE constraint on `code` is what guarantees distinct live codes.
    pub fn insert_invite(&self, code: &str, channel_id: &str, created_by: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            match conn.execute(
                "INSERT INTO channel_invites (code, channel_id, created_by) VALUES (?1, ?2, ?3)",
                [code, channel_id, created_by],
            ) {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Redeem an invite: resolve its channel and record the membership in one
    /// transaction. Codes stay valid after use.
    pub fn redeem_invite(&self, code: &str, user_id: &str) -> Result<Option<ChannelRow>> {
        self.with_transaction(|tx| {
            let channel = tx
                .query_row(
                    "SELECT c.id, c.product_id, c.feature_id
                     FROM channel_invites i
                     JOIN channels c ON c.id = i.channel_id
                     WHERE i.code = ?1",
                    [code],
                    channel_from_row,
                )
                .optional()?;

            if let Some(channel) = &channel {
                tx.execute(
                    "INSERT OR IGNORE INTO channel_members (channel_id, user_id) VALUES (?1, ?2)",
                    [channel.id.as_str(), user_id],
                )?;
            }
            Ok(channel)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::queries::fixtures;
    use treadify_types::Role;

    #[test]
    fn invite_codes_are_unique_and_reusable() {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "pm", Role::ProductManager);
        fixtures::user(&db, "dev", Role::Developer);
        fixtures::user(&db, "dev2", Role::Developer);
        fixtures::product(&db, "p1", "chan-1", "pm");

        assert!(db.insert_invite("AbC123xy", "chan-1", "pm").unwrap());
        assert!(!db.insert_invite("AbC123xy", "chan-1", "pm").unwrap());

        let first = db.redeem_invite("AbC123xy", "dev").unwrap().unwrap();
        assert_eq!(first.id, "chan-1");
        assert_eq!(first.product_id, "p1");
        let second = db.redeem_invite("AbC123xy", "dev2").unwrap().unwrap();
        assert_eq!(second.id, "chan-1");

        assert!(db.is_channel_member("chan-1", "dev").unwrap());
        assert!(db.redeem_invite("nope", "dev").unwrap().is_none());
    }

    #[test]
    fn redeeming_twice_keeps_one_membership() {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "pm", Role::ProductManager);
        fixtures::user(&db, "dev", Role::Developer);
        fixtures::product(&db, "p1", "chan-1", "pm");
        db.insert_invite("code0001", "chan-1", "pm").unwrap();

        db.redeem_invite("code0001", "dev").unwrap();
        db.redeem_invite("code0001", "dev").unwrap();

        let members = db.product_members("p1").unwrap();
        assert_eq!(members.iter().filter(|m| m.user_id == "dev").count(), 1);
    }

    #[test]
    fn latest_membership_prefers_most_recent_join() {
        let db = Database::open_in_memory().unwrap();
        fixtures::user(&db, "pm", Role::ProductManager);
        fixtures::user(&db, "tl", Role::TechnicalLead);
        fixtures::product(&db, "p1", "c-p1", "pm");
        fixtures::feature(&db, "f1", "c-f1", "p1", "pm");

        assert!(db.latest_membership("tl").unwrap().is_none());

        db.insert_invite("code-p1", "c-p1", "pm").unwrap();
        db.insert_invite("code-f1", "c-f1", "pm").unwrap();
        db.redeem_invite("code-p1", "tl").unwrap();
        db.redeem_invite("code-f1", "tl").unwrap();

        let latest = db.latest_membership("tl").unwrap().unwrap();
        assert_eq!(latest.id, "c-f1");
        assert_eq!(latest.feature_id.as_deref(), Some("f1"));
    }
}
