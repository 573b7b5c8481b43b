use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use treadify_types::api::{MessageResponse, SendMessageRequest};

use crate::convert;
use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery};
use crate::session::CurrentUser;
use crate::state::AppState;

const MAX_LIMIT: u32 = 200;
const MAX_CONTENT_LEN: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// 404 when the channel does not exist, 403 when the caller is not a member.
async fn require_member(
    state: &AppState,
    current: &CurrentUser,
    channel_id: &str,
) -> Result<(), ApiError> {
    let (cid, uid) = (channel_id.to_string(), current.user.user_id.clone());
    let (exists, member) = state
        .db(move |db| {
            let exists = db.get_channel(&cid)?.is_some();
            Ok((exists, exists && db.is_channel_member(&cid, &uid)?))
        })
        .await?;

    if !exists {
        return Err(ApiError::not_found("Channel not found"));
    }
    if !member {
        return Err(ApiError::forbidden("Not a member of this channel"));
    }
    Ok(())
}

pub async fn get_messages(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(channel_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<MessageQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    require_member(&state, &current, &channel_id).await?;

    let limit = query.limit.clamp(1, MAX_LIMIT);
    let rows = state
        .db(move |db| db.get_messages(&channel_id, limit))
        .await?;
    Ok(Json(rows.into_iter().map(convert::message).collect()))
}

pub async fn send_message(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(channel_id): ApiPath<String>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::validation("content is required"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(ApiError::validation("Message too long"));
    }
    require_member(&state, &current, &channel_id).await?;

    let message_id = Uuid::new_v4().to_string();
    let (mid, uid) = (message_id.clone(), current.user.user_id.clone());
    let row = state
        .db(move |db| {
            db.insert_message(&mid, &channel_id, &uid, &content)?;
            db.get_message(&mid)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    Ok((StatusCode::CREATED, Json(convert::message(row))))
}

/// Only the sender may delete a message.
pub async fn delete_message(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((channel_id, message_id)): ApiPath<(String, String)>,
) -> Result<StatusCode, ApiError> {
    require_member(&state, &current, &channel_id).await?;

    let mid = message_id.clone();
    let message = state
        .db(move |db| db.get_message(&mid))
        .await?
        .filter(|m| m.channel_id == channel_id)
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    if message.sender_id != current.user.user_id {
        return Err(ApiError::forbidden("Only the sender can delete a message"));
    }

    let uid = current.user.user_id.clone();
    if !state
        .db(move |db| db.delete_message(&message_id, &uid))
        .await?
    {
        return Err(ApiError::not_found("Message not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
