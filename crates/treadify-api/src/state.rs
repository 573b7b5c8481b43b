use std::sync::Arc;

use anyhow::anyhow;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::Key;
use tracing::error;

use treadify_db::Database;

use crate::error::ApiError;
use crate::github::GitHubClient;

pub type AppState = Arc<AppStateInner>;

/// Settings the HTTP layer needs beyond the database and GitHub client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Frontend origin; OAuth callbacks redirect back here.
    pub client_url: String,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
    /// Secret the session cookie is signed with.
    pub session_secret: String,
}

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub github: GitHubClient,
    pub client_url: String,
    pub secure_cookies: bool,
    pub session_key: Key,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, github: GitHubClient, config: ApiConfig) -> AppState {
        // Key needs 64 bytes of material; SHA-512 stretches any secret to that.
        let digest = Sha512::digest(config.session_secret.as_bytes());
        Arc::new(Self {
            db,
            github,
            client_url: config.client_url.trim_end_matches('/').to_string(),
            secure_cookies: config.secure_cookies,
            session_key: Key::from(digest.as_slice()),
        })
    }

    /// Run a blocking database call off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(anyhow!("database task failed"))
            })?
            .map_err(ApiError::Internal)
    }
}
