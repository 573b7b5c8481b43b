use anyhow::Result;
use chrono::NaiveDate;

use super::OptionalExt;
use crate::Database;
use crate::models::{FeatureRow, FeatureSummaryRow, NewFeature, NewProduct, ProductRow};

impl Database {
    // -- Products --

    /// Create a product with its repository, product-level channel, and the
    /// owning PM's membership, all in one transaction.
    pub fn create_product(&self, product: &NewProduct<'_>) -> Result<()> {
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO products (id, pm_id, name, description, deadline)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    product.id,
                    product.pm_id,
                    product.name,
                    product.description,
                    product.deadline
                ],
            )?;
            tx.execute(
                "INSERT INTO product_repositories (product_id, owner, name, url, default_branch)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    product.id,
                    product.repo_owner,
                    product.repo_name,
                    product.repo_url,
                    product.default_branch,
                ),
            )?;
            tx.execute(
                "INSERT INTO channels (id, product_id, feature_id) VALUES (?1, ?2, NULL)",
                (product.channel_id, product.id),
            )?;
            tx.execute(
                "INSERT INTO channel_members (channel_id, user_id) VALUES (?1, ?2)",
                (product.channel_id, product.pm_id),
            )?;
            Ok(())
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT p.id, p.pm_id, p.name, p.description, p.deadline, p.status,
                        r.owner, r.name, r.url, r.default_branch
                 FROM products p
                 LEFT JOIN product_repositories r ON r.product_id = p.id
                 WHERE p.id = ?1",
                [id],
                |row| {
                    Ok(ProductRow {
                        id: row.get(0)?,
                        pm_id: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get(3)?,
                        deadline: row.get(4)?,
                        status: row.get(5)?,
                        repo_owner: row.get(6)?,
                        repo_name: row.get(7)?,
                        repo_url: row.get(8)?,
                        default_branch: row.get(9)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Mark the product deprecated. Only the owning PM's product matches.
    pub fn deprecate_product(&self, id: &str, pm_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE products SET status = 'deprecated' WHERE id = ?1 AND pm_id = ?2",
                [id, pm_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_product_deadline(&self, id: &str, pm_id: &str, deadline: NaiveDate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE products SET deadline = ?1 WHERE id = ?2 AND pm_id = ?3",
                rusqlite::params![deadline, id, pm_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Features --

    /// Create a feature, its channel, and memberships for the creator and the
    /// assigned Technical Lead in one transaction.
    pub fn add_feature(&self, feature: &NewFeature<'_>) -> Result<()> {
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO features (id, product_id, name, description, deadline, tech_lead_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    feature.id,
                    feature.product_id,
                    feature.name,
                    feature.description,
                    feature.deadline,
                    feature.tech_lead_id
                ],
            )?;
            tx.execute(
                "INSERT INTO channels (id, product_id, feature_id) VALUES (?1, ?2, ?3)",
                (feature.channel_id, feature.product_id, feature.id),
            )?;

            let mut add_member = tx.prepare(
                "INSERT OR IGNORE INTO channel_members (channel_id, user_id) VALUES (?1, ?2)",
            )?;
            add_member.execute((feature.channel_id, feature.created_by))?;
            if let Some(tech_lead) = feature.tech_lead_id {
                add_member.execute((feature.channel_id, tech_lead))?;
            }
            Ok(())
        })
    }

    pub fn get_feature(&self, id: &str) -> Result<Option<FeatureRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, product_id, name, description, deadline, tech_lead_id
                 FROM features WHERE id = ?1",
                [id],
                |row| {
                    Ok(FeatureRow {
                        id: row.get(0)?,
                        product_id: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get(3)?,
                        deadline: row.get(4)?,
                        tech_lead_id: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn feature_channel_id(&self, feature_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM channels WHERE feature_id = ?1",
                [feature_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Goal and commit totals for every feature of a product.
    pub fn product_report(&self, product_id: &str) -> Result<Vec<FeatureSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.id, f.name, f.deadline, u.username,
                        (SELECT COUNT(*) FROM goals g WHERE g.feature_id = f.id),
                        (SELECT COUNT(*) FROM goals g
                            WHERE g.feature_id = f.id AND g.status = 'completed'),
                        (SELECT COUNT(*) FROM commits c JOIN goals g ON g.id = c.goal_id
                            WHERE g.feature_id = f.id AND c.status = 'pending'),
                        (SELECT COUNT(*) FROM commits c JOIN goals g ON g.id = c.goal_id
                            WHERE g.feature_id = f.id AND c.status = 'approved')
                 FROM features f
                 LEFT JOIN users u ON u.id = f.tech_lead_id
                 WHERE f.product_id = ?1
                 ORDER BY f.created_at, f.name",
            )?;
            let rows = stmt
                .query_map([product_id], |row| {
                    Ok(FeatureSummaryRow {
                        feature_id: row.get(0)?,
                        name: row.get(1)?,
                        deadline: row.get(2)?,
                        tech_lead: row.get(3)?,
                        goals_total: row.get(4)?,
                        goals_completed: row.get(5)?,
                        commits_pending: row.get(6)?,
                        commits_approved: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
