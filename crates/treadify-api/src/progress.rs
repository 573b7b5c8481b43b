use axum::{Json, extract::State};

use treadify_types::api::{CommitResponse, FeatureProgress, GoalProgress};
use treadify_types::{GoalStatus, Permission};

use crate::convert;
use crate::error::ApiError;
use crate::session::CurrentUser;
use crate::state::AppState;

/// GET /progress/feature: per-goal commit counts for the session's feature.
pub async fn feature_progress(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<FeatureProgress>, ApiError> {
    state
        .authorize(&current.user, Permission::ViewFeatureProgress)
        .await?;
    let feature_id = current.feature_id()?.to_string();

    let (feature, rows) = state
        .db(move |db| {
            let Some(feature) = db.get_feature(&feature_id)? else {
                return Ok((None, Vec::new()));
            };
            let rows = db.feature_progress(&feature.id)?;
            Ok((Some(feature), rows))
        })
        .await?;
    let feature = feature.ok_or_else(|| ApiError::not_found("Feature not found"))?;

    Ok(Json(FeatureProgress {
        feature_id: feature.id,
        name: feature.name,
        goals: rows
            .into_iter()
            .map(|r| GoalProgress {
                status: r.status.parse().unwrap_or(GoalStatus::Open),
                goal_id: r.goal_id,
                title: r.title,
                commits_total: r.commits_total,
                commits_approved: r.commits_approved,
            })
            .collect(),
    }))
}

/// GET /progress/me: the caller's own commits, newest first.
pub async fn my_progress(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<CommitResponse>>, ApiError> {
    let uid = current.user.user_id.clone();
    let rows = state.db(move |db| db.list_commits_by_author(&uid)).await?;
    Ok(Json(rows.into_iter().map(convert::commit).collect()))
}
