use tracing::warn;

use treadify_types::{Permission, SessionUser};

use crate::error::ApiError;
use crate::state::AppStateInner;

impl AppStateInner {
    /// Whether `role` is granted `permission` in the role/permission tables.
    /// Names compare exactly; an unknown role or permission is simply not granted.
    pub async fn has_permission(&self, role: &str, permission: &str) -> Result<bool, ApiError> {
        let role = role.to_string();
        let permission = permission.to_string();
        self.db(move |db| db.has_permission(&role, &permission)).await
    }

    /// Permission gate for an authenticated caller.
    ///
    /// A caller without a role, or whose role lacks `permission`, gets 403. A
    /// failed lookup is a 500, never a grant.
    pub async fn authorize(&self, user: &SessionUser, permission: Permission) -> Result<(), ApiError> {
        let Some(role) = user.role else {
            warn!(user = %user.username, %permission, "denied: no role");
            return Err(ApiError::forbidden("Forbidden"));
        };

        if self.has_permission(role.as_str(), permission.as_str()).await? {
            Ok(())
        } else {
            warn!(user = %user.username, %role, %permission, "denied: permission not granted");
            Err(ApiError::forbidden("Forbidden"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use treadify_db::Database;
    use treadify_types::Role;

    use super::*;
    use crate::github::{GitHubClient, GitHubConfig};
    use crate::state::{ApiConfig, AppState};

    fn state() -> AppState {
        AppStateInner::new(
            Arc::new(Database::open_in_memory().unwrap()),
            GitHubClient::new(GitHubConfig::default()).unwrap(),
            ApiConfig {
                client_url: "http://localhost:3000".into(),
                secure_cookies: false,
                session_secret: "test-secret".into(),
            },
        )
    }

    fn user(role: Option<Role>) -> SessionUser {
        SessionUser {
            user_id: "u-1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role,
        }
    }

    #[tokio::test]
    async fn granted_permission_passes() {
        let state = state();
        state
            .authorize(&user(Some(Role::ProductManager)), Permission::CreateProductChannel)
            .await
            .unwrap();
        state
            .authorize(&user(Some(Role::Developer)), Permission::SubmitCommit)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_grant_or_role_is_forbidden() {
        let state = state();
        let err = state
            .authorize(&user(Some(Role::Developer)), Permission::CreateGoal)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = state
            .authorize(&user(None), Permission::SubmitCommit)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn lookup_failure_is_internal_not_granted() {
        let state = state();
        state
            .db
            .with_conn_mut(|conn| {
                conn.execute_batch("DROP VIEW role_permissions_view")?;
                Ok(())
            })
            .unwrap();

        let err = state
            .authorize(&user(Some(Role::ProductManager)), Permission::AddFeature)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unknown_names_are_not_granted() {
        let state = state();
        assert!(!state.has_permission("Janitor", "createGoal").await.unwrap());
        assert!(!state.has_permission("Technical Lead", "launchRocket").await.unwrap());
        assert!(state.has_permission("Technical Lead", "createGoal").await.unwrap());
    }
}
