use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use treadify_db::models::{Announcement, GoalRow, NewGoal};
use treadify_types::api::{
    CommitResponse, CreateGoalRequest, GoalResponse, ReviewCommitRequest, SubmitCommitRequest,
};
use treadify_types::{CommitStatus, GoalStatus, Permission};

use crate::convert;
use crate::error::{ApiError, ApiPath, PendingJson};
use crate::session::CurrentUser;
use crate::state::AppState;

/// A goal by id, only if it belongs to the caller's feature.
async fn scoped_goal(
    state: &AppState,
    current: &CurrentUser,
    goal_id: String,
) -> Result<GoalRow, ApiError> {
    let feature_id = current.feature_id()?.to_string();
    state
        .db(move |db| db.get_goal(&goal_id))
        .await?
        .filter(|g| g.feature_id == feature_id)
        .ok_or_else(|| ApiError::not_found("Goal not found"))
}

/// GET /featurechannel/goals
pub async fn list_goals(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<GoalResponse>>, ApiError> {
    let feature_id = current.feature_id()?.to_string();
    let rows = state
        .db(move |db| db.list_goals_for_feature(&feature_id))
        .await?;
    Ok(Json(rows.into_iter().map(convert::goal).collect()))
}

/// POST /featurechannel/goal
///
/// Also posts "New goal: {title}" in the feature channel, atomically with the goal.
pub async fn create_goal(
    State(state): State<AppState>,
    current: CurrentUser,
    body: PendingJson<CreateGoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.authorize(&current.user, Permission::CreateGoal).await?;
    let req = body.parse()?;
    let feature_id = current.feature_id()?.to_string();

    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::validation("title is required"));
    }

    let goal_id = Uuid::new_v4().to_string();
    let (gid, uid) = (goal_id.clone(), current.user.user_id.clone());
    let row = state
        .db(move |db| {
            let Some(channel_id) = db.feature_channel_id(&feature_id)? else {
                return Ok(None);
            };
            let message_id = Uuid::new_v4().to_string();
            let content = format!("New goal: {title}");
            db.create_goal(&NewGoal {
                id: &gid,
                feature_id: &feature_id,
                title: &title,
                description: req.description.as_deref(),
                created_by: &uid,
                announcement: Some(Announcement {
                    message_id: &message_id,
                    channel_id: &channel_id,
                    content: &content,
                }),
            })?;
            db.get_goal(&gid)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Feature not found"))?;

    info!("Goal {} created by {}", goal_id, current.user.username);
    Ok((StatusCode::CREATED, Json(convert::goal(row))))
}

/// PATCH /featurechannel/goal/{goal_id}/complete
pub async fn complete_goal(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(goal_id): ApiPath<String>,
) -> Result<Json<GoalResponse>, ApiError> {
    state.authorize(&current.user, Permission::CompleteGoal).await?;
    let feature_id = current.feature_id()?.to_string();

    let gid = goal_id.clone();
    let row = state
        .db(move |db| {
            if !db.complete_goal(&gid, &feature_id)? {
                return Ok(None);
            }
            db.get_goal(&gid)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Goal not found"))?;

    info!("Goal {} completed by {}", goal_id, current.user.username);
    Ok(Json(convert::goal(row)))
}

/// POST /featurechannel/commit/{goal_id}
pub async fn submit_commit(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(goal_id): ApiPath<String>,
    body: PendingJson<SubmitCommitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.authorize(&current.user, Permission::SubmitCommit).await?;
    let req = body.parse()?;

    let goal = scoped_goal(&state, &current, goal_id).await?;
    if goal.status == GoalStatus::Completed.as_str() {
        return Err(ApiError::validation("Goal is already completed"));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::validation("message is required"));
    }

    let commit_id = Uuid::new_v4().to_string();
    let (cid, uid) = (commit_id.clone(), current.user.user_id.clone());
    let row = state
        .db(move |db| {
            db.insert_commit(
                &cid,
                &goal.id,
                &uid,
                req.message.trim(),
                req.sha.as_deref(),
                req.url.as_deref(),
            )?;
            db.get_commit(&cid)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Commit not found"))?;

    info!("Commit {} submitted by {}", commit_id, current.user.username);
    Ok((StatusCode::CREATED, Json(convert::commit(row))))
}

/// GET /featurechannel/commits
pub async fn list_commits(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<CommitResponse>>, ApiError> {
    let feature_id = current.feature_id()?.to_string();
    let rows = state
        .db(move |db| db.list_commits_for_feature(&feature_id))
        .await?;
    Ok(Json(rows.into_iter().map(convert::commit).collect()))
}

/// PATCH /featurechannel/commit/{commit_id}/review
pub async fn review_commit(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(commit_id): ApiPath<String>,
    body: PendingJson<ReviewCommitRequest>,
) -> Result<Json<CommitResponse>, ApiError> {
    state.authorize(&current.user, Permission::ReviewCommit).await?;
    let req = body.parse()?;
    let feature_id = current.feature_id()?.to_string();

    let status = if req.approved {
        CommitStatus::Approved
    } else {
        CommitStatus::Rejected
    };

    let (cid, reviewer) = (commit_id.clone(), current.user.user_id.clone());
    let row = state
        .db(move |db| {
            if !db.review_commit(
                &cid,
                &feature_id,
                &reviewer,
                status.as_str(),
                req.comment.as_deref(),
            )? {
                return Ok(None);
            }
            db.get_commit(&cid)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Commit not found"))?;

    info!(
        "Commit {} {} by {}",
        commit_id,
        status.as_str(),
        current.user.username
    );
    Ok(Json(convert::commit(row)))
}
