use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tower_sessions::Session;
use tracing::{info, warn};
use uuid::Uuid;

use treadify_types::api::{LoginRequest, SessionResponse, SignupRequest, SignupResponse};
use treadify_types::{Role, Scope, SessionState, SessionUser};

use crate::convert::{parse_role, scope_for};
use crate::error::{ApiError, ApiJson};
use crate::session::{self, CurrentUser};
use crate::state::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

fn validate_signup(req: &SignupRequest) -> Result<Role, ApiError> {
    let len = req.username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::validation(format!(
            "Username must be {USERNAME_MIN} to {USERNAME_MAX} characters"
        )));
    }
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::validation("Invalid email"));
    }
    if req.pass.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    match req.role.as_deref() {
        None => Ok(Role::Developer),
        Some(name) => name
            .parse()
            .map_err(|_| ApiError::validation(format!("Unknown role '{name}'"))),
    }
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = validate_signup(&req)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.pass.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4().to_string();

    let (id, username, email) = (user_id.clone(), req.username.clone(), req.email.clone());
    let created = state
        .db(move |db| db.create_user(&id, &username, &email, &password_hash, role))
        .await?;
    if !created {
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    info!("New {} account: {}", role, req.username);
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id,
            username: req.username,
            role,
        }),
    ))
}

/// POST /auth/login
///
/// Verifies the password, then starts a fresh session scoped to the channel
/// the user joined most recently (if any).
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let username = req.username.clone();
    let user = state
        .db(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    if Argon2::default()
        .verify_password(req.pass.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!("Failed login for {}", req.username);
        return Err(ApiError::Unauthenticated);
    }

    let uid = user.id.clone();
    let (membership, github) = state
        .db(move |db| Ok((db.latest_membership(&uid)?, db.get_github_integration(&uid)?)))
        .await?;

    let session_user = SessionUser {
        user_id: user.id,
        username: user.username,
        email: user.email,
        role: parse_role(user.role.as_deref()),
    };
    let scope = membership.map(scope_for).unwrap_or_default();

    session::begin(
        &session,
        SessionState::authenticated(session_user.clone(), scope.clone()),
    )
    .await?;

    info!("{} logged in", session_user.username);
    Ok(Json(session_response(
        session_user,
        scope,
        github.map(|g| g.github_username),
    )))
}

/// POST /auth/logout: always succeeds, even without a session.
pub async fn logout(session: Session) -> Result<StatusCode, ApiError> {
    session::end(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<SessionResponse>, ApiError> {
    let uid = current.user.user_id.clone();
    let github = state.db(move |db| db.get_github_integration(&uid)).await?;

    Ok(Json(session_response(
        current.user,
        current.scope,
        github.map(|g| g.github_username),
    )))
}

fn session_response(
    user: SessionUser,
    scope: Scope,
    github_username: Option<String>,
) -> SessionResponse {
    SessionResponse {
        user_id: user.user_id,
        username: user.username,
        email: user.email,
        role: user.role,
        product: scope.product_id,
        feature: scope.feature_id,
        channel: scope.channel_id,
        github_username,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(username: &str, email: &str, pass: &str, role: Option<&str>) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            email: email.into(),
            pass: pass.into(),
            role: role.map(Into::into),
        }
    }

    #[test]
    fn signup_defaults_to_developer() {
        let role = validate_signup(&req("alice", "a@x.com", "secret", None)).unwrap();
        assert_eq!(role, Role::Developer);

        let role = validate_signup(&req("bob", "b@x.com", "pw", Some("Product Manager"))).unwrap();
        assert_eq!(role, Role::ProductManager);
    }

    #[test]
    fn signup_rejects_bad_input() {
        let cases = [
            req("al", "a@x.com", "secret", None),
            req(&"x".repeat(33), "a@x.com", "secret", None),
            req("alice", "not-an-email", "secret", None),
            req("alice", "a@x.com", "", None),
            req("alice", "a@x.com", "secret", Some("product manager")),
        ];
        for case in &cases {
            let err = validate_signup(case).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{case:?}");
        }
    }
}
