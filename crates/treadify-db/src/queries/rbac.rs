use anyhow::Result;

use super::OptionalExt;
use crate::Database;

impl Database {
    // -- RBAC --

    /// Whether `role` is granted `permission` in `role_permissions_view`.
    ///
    /// Exact, case-sensitive match; unknown names simply find no row. Every
    /// call hits the database, and a query failure is returned as an error.
    pub fn has_permission(&self, role: &str, permission: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM role_permissions_view
                     WHERE role_name = ?1 AND permission_name = ?2
                     LIMIT 1",
                    [role, permission],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}
