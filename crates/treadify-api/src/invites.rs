use anyhow::bail;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rand::{Rng, distr::Alphanumeric};
use tracing::{info, warn};

use treadify_db::Database;
use treadify_types::api::{InviteResponse, JoinRequest};
use treadify_types::{Permission, Scope};

use crate::convert::scope_for;
use crate::error::{ApiError, ApiJson};
use crate::session::CurrentUser;
use crate::state::AppState;

pub const JOIN_CODE_LEN: usize = 8;
/// Upper bound on regenerate-and-insert attempts when a code collides.
pub const MAX_JOIN_CODE_ATTEMPTS: usize = 8;

pub fn generate_join_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Store a fresh code for `channel_id`. The UNIQUE constraint on the code
/// decides collisions; a colliding code is regenerated, up to
/// `MAX_JOIN_CODE_ATTEMPTS` times.
pub fn create_invite<R: Rng + ?Sized>(
    db: &Database,
    channel_id: &str,
    created_by: &str,
    rng: &mut R,
) -> anyhow::Result<String> {
    for attempt in 1..=MAX_JOIN_CODE_ATTEMPTS {
        let code = generate_join_code(rng);
        if db.insert_invite(&code, channel_id, created_by)? {
            return Ok(code);
        }
        warn!("Join code collision on attempt {}", attempt);
    }
    bail!("no unique join code after {MAX_JOIN_CODE_ATTEMPTS} attempts")
}

/// POST /channels/invite: code for the caller's current channel.
pub async fn generate(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state
        .authorize(&current.user, Permission::GenerateJoinCode)
        .await?;
    let channel_id = current.channel_id()?.to_string();

    let (cid, uid) = (channel_id.clone(), current.user.user_id.clone());
    let code = state
        .db(move |db| {
            if db.get_channel(&cid)?.is_none() {
                return Ok(None);
            }
            create_invite(db, &cid, &uid, &mut rand::rng()).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    info!("{} issued a join code for {}", current.user.username, channel_id);
    Ok((StatusCode::CREATED, Json(InviteResponse { code, channel_id })))
}

/// POST /channels/join: redeem a code and move the session into its channel.
pub async fn join(
    State(state): State<AppState>,
    mut current: CurrentUser,
    ApiJson(req): ApiJson<JoinRequest>,
) -> Result<Json<Scope>, ApiError> {
    let code = req.code.trim().to_string();
    if code.is_empty() {
        return Err(ApiError::validation("Invalid code"));
    }

    let uid = current.user.user_id.clone();
    let channel = state
        .db(move |db| db.redeem_invite(&code, &uid))
        .await?
        .ok_or_else(|| ApiError::validation("Invalid code"))?;

    let scope = scope_for(channel);
    current.rescope(scope.clone()).await?;

    info!(
        "{} joined channel {}",
        current.user.username,
        scope.channel_id.as_deref().unwrap_or_default()
    );
    Ok(Json(scope))
}
