use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CommitStatus, GoalStatus, ProductStatus, Role};

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub pass: String,
    /// Role display name; a new account is a Developer when omitted.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub pass: String,
}

/// What the dashboard (and a successful login) reports about the caller's session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Option<Role>,
    pub product: Option<String>,
    pub feature: Option<String>,
    pub channel: Option<String>,
    pub github_username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

// -- Product channel --

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    pub repo_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateProductResponse {
    pub product_id: String,
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddFeatureRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Username of the Technical Lead to assign.
    #[serde(default)]
    pub tech_lead: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddFeatureResponse {
    pub feature_id: String,
    pub channel_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProductStatusResponse {
    pub product_id: String,
    pub status: ProductStatus,
}

#[derive(Debug, Deserialize)]
pub struct DeadlineRequest {
    pub deadline: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct DeadlineResponse {
    pub product_id: String,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: String,
    pub username: String,
    pub role: Option<Role>,
    pub channel_id: String,
    pub feature_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductReport {
    pub product_id: String,
    pub name: String,
    pub status: ProductStatus,
    pub deadline: Option<NaiveDate>,
    pub features: Vec<FeatureReport>,
}

#[derive(Debug, Serialize)]
pub struct FeatureReport {
    pub feature_id: String,
    pub name: String,
    pub deadline: Option<NaiveDate>,
    pub tech_lead: Option<String>,
    pub goals_total: u32,
    pub goals_completed: u32,
    pub commits_pending: u32,
    pub commits_approved: u32,
}

// -- Invites --

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub code: String,
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinRequest {
    pub code: String,
}

// -- Feature channel --

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GoalResponse {
    pub id: String,
    pub feature_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitCommitRequest {
    pub message: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewCommitRequest {
    pub approved: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub id: String,
    pub goal_id: String,
    pub author_id: String,
    pub author_username: String,
    pub message: String,
    pub sha: Option<String>,
    pub url: Option<String>,
    pub status: CommitStatus,
    pub reviewer_id: Option<String>,
    pub review_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Progress --

#[derive(Debug, Serialize)]
pub struct FeatureProgress {
    pub feature_id: String,
    pub name: String,
    pub goals: Vec<GoalProgress>,
}

#[derive(Debug, Serialize)]
pub struct GoalProgress {
    pub goal_id: String,
    pub title: String,
    pub status: GoalStatus,
    pub commits_total: u32,
    pub commits_approved: u32,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
