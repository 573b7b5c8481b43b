use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::{ExpiredDeletion, SessionStore, session_store};
use tracing::{info, warn};

use treadify_db::Database;

/// `tower-sessions` store persisting records in the `sessions` table.
///
/// Records are stored as JSON with their expiry as a unix timestamp, and
/// records at or past their expiry never load.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn run<F, T>(&self, f: F) -> session_store::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))?
            .map_err(|e| session_store::Error::Backend(e.to_string()))
    }
}

impl fmt::Debug for SqliteSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSessionStore").finish_non_exhaustive()
    }
}

fn encode(record: &Record) -> session_store::Result<String> {
    serde_json::to_string(record).map_err(|e| session_store::Error::Encode(e.to_string()))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        // Session ID collision mitigation
        loop {
            let data = encode(record)?;
            let id = record.id.to_string();
            let expiry = record.expiry_date.unix_timestamp();
            if self
                .run(move |db| db.create_session(&id, &data, expiry))
                .await?
            {
                return Ok(());
            }
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = encode(record)?;
        let id = record.id.to_string();
        let expiry = record.expiry_date.unix_timestamp();
        self.run(move |db| db.save_session(&id, &data, expiry)).await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let id = session_id.to_string();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let data = self.run(move |db| db.load_session(&id, now)).await?;

        data.map(|d| {
            serde_json::from_str(&d).map_err(|e| session_store::Error::Decode(e.to_string()))
        })
        .transpose()
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let id = session_id.to_string();
        self.run(move |db| db.delete_session(&id)).await
    }
}

#[async_trait]
impl ExpiredDeletion for SqliteSessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let purged = self.run(move |db| db.delete_expired_sessions(now)).await?;
        if purged > 0 {
            info!("Session cleanup: purged {} expired sessions", purged);
        }
        Ok(())
    }
}

/// Background task that purges expired session rows every `interval`.
pub async fn run_cleanup_loop(store: SqliteSessionStore, interval: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;

        if let Err(e) = store.delete_expired().await {
            warn!("Session cleanup error: {}", e);
        }
    }
}
