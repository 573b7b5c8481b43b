use axum::{extract::FromRequestParts, http::request::Parts};
use time::{Duration, OffsetDateTime};
use tower_sessions::{Expiry, Session};
use tracing::{debug, error};

use treadify_types::{Scope, SessionState, SessionUser};

use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "connect.sid";
pub const SESSION_MAX_AGE: Duration = Duration::hours(12);

const STATE_KEY: &str = "auth";
const OAUTH_STATE_KEY: &str = "github_oauth_state";
/// Unix timestamp after which the login is no longer honoured.
const DEADLINE_KEY: &str = "expires_at";

fn session_error(e: tower_sessions::session::Error) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("session error: {}", e))
}

pub async fn load_state(session: &Session) -> Result<SessionState, ApiError> {
    Ok(session
        .get::<SessionState>(STATE_KEY)
        .await
        .map_err(session_error)?
        .unwrap_or_default())
}

/// Start a fresh authenticated session: new id, fixed 12-hour lifetime.
///
/// The deadline is stored alongside the state; later writes re-apply it so
/// activity never extends the session.
pub async fn begin(session: &Session, state: SessionState) -> Result<(), ApiError> {
    session.cycle_id().await.map_err(session_error)?;
    let deadline = OffsetDateTime::now_utc() + SESSION_MAX_AGE;
    session.set_expiry(Some(Expiry::AtDateTime(deadline)));
    session
        .insert(DEADLINE_KEY, deadline.unix_timestamp())
        .await
        .map_err(session_error)?;
    session.insert(STATE_KEY, state).await.map_err(session_error)
}

async fn load_deadline(session: &Session) -> Result<Option<OffsetDateTime>, ApiError> {
    Ok(session
        .get::<i64>(DEADLINE_KEY)
        .await
        .map_err(session_error)?
        .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()))
}

pub async fn end(session: &Session) -> Result<(), ApiError> {
    session.flush().await.map_err(session_error)
}

/// The authenticated caller.
///
/// Extracting this rejects with 401 when the session carries no user, so a
/// handler that takes `CurrentUser` never runs for anonymous requests.
pub struct CurrentUser {
    pub session: Session,
    pub user: SessionUser,
    pub scope: Scope,
    deadline: OffsetDateTime,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| {
                error!("session layer missing: {}", msg);
                ApiError::Internal(anyhow::anyhow!(msg))
            })?;

        let state = load_state(&session).await?;
        let Some(user) = state.user().cloned() else {
            return Err(ApiError::Unauthenticated);
        };

        // A login without a live deadline is over, whatever the store kept.
        let deadline = load_deadline(&session)
            .await?
            .filter(|d| *d > OffsetDateTime::now_utc());
        let Some(deadline) = deadline else {
            debug!(user = %user.username, "session past its login deadline");
            session.flush().await.map_err(session_error)?;
            return Err(ApiError::Unauthenticated);
        };

        Ok(Self {
            session,
            user,
            scope: state.scope().cloned().unwrap_or_default(),
            deadline,
        })
    }
}

impl CurrentUser {
    pub fn product_id(&self) -> Result<&str, ApiError> {
        self.scope
            .product_id
            .as_deref()
            .ok_or_else(|| ApiError::not_found("No product channel selected"))
    }

    pub fn feature_id(&self) -> Result<&str, ApiError> {
        self.scope
            .feature_id
            .as_deref()
            .ok_or_else(|| ApiError::not_found("No feature channel selected"))
    }

    pub fn channel_id(&self) -> Result<&str, ApiError> {
        self.scope
            .channel_id
            .as_deref()
            .ok_or_else(|| ApiError::not_found("No channel selected"))
    }

    /// Saves made during this request keep the login deadline.
    fn pin_expiry(&self) {
        self.session.set_expiry(Some(Expiry::AtDateTime(self.deadline)));
    }

    /// Replace the session scope, keeping the identity.
    pub async fn rescope(&mut self, scope: Scope) -> Result<(), ApiError> {
        let state = SessionState::authenticated(self.user.clone(), scope.clone());
        self.pin_expiry();
        self.session
            .insert(STATE_KEY, state)
            .await
            .map_err(session_error)?;
        self.scope = scope;
        Ok(())
    }

    pub async fn set_oauth_state(&self, value: &str) -> Result<(), ApiError> {
        self.pin_expiry();
        self.session
            .insert(OAUTH_STATE_KEY, value)
            .await
            .map_err(session_error)
    }

    /// Take the pending OAuth state; it is single-use.
    pub async fn take_oauth_state(&self) -> Result<Option<String>, ApiError> {
        self.pin_expiry();
        self.session
            .remove::<String>(OAUTH_STATE_KEY)
            .await
            .map_err(session_error)
    }
}
