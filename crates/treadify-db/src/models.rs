//! Database row types: these map directly to SQLite rows.
//! Distinct from treadify-types API models to keep the DB layer independent.

use chrono::NaiveDate;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    /// Role name from the `roles` table, `None` if the user has no role row.
    pub role: Option<String>,
    pub created_at: String,
}

pub struct GitHubIntegrationRow {
    pub user_id: String,
    pub github_username: String,
    pub access_token: String,
}

pub struct ProductRow {
    pub id: String,
    pub pm_id: String,
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: String,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub repo_url: Option<String>,
    pub default_branch: Option<String>,
}

pub struct NewProduct<'a> {
    pub id: &'a str,
    pub channel_id: &'a str,
    pub pm_id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub deadline: Option<NaiveDate>,
    pub repo_owner: &'a str,
    pub repo_name: &'a str,
    pub repo_url: &'a str,
    pub default_branch: &'a str,
}

pub struct FeatureRow {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub tech_lead_id: Option<String>,
}

pub struct NewFeature<'a> {
    pub id: &'a str,
    pub channel_id: &'a str,
    pub product_id: &'a str,
    pub created_by: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub deadline: Option<NaiveDate>,
    pub tech_lead_id: Option<&'a str>,
}

/// Per-feature totals for the product report.
pub struct FeatureSummaryRow {
    pub feature_id: String,
    pub name: String,
    pub deadline: Option<NaiveDate>,
    pub tech_lead: Option<String>,
    pub goals_total: u32,
    pub goals_completed: u32,
    pub commits_pending: u32,
    pub commits_approved: u32,
}

pub struct ChannelRow {
    pub id: String,
    pub product_id: String,
    pub feature_id: Option<String>,
}

pub struct MemberRow {
    pub user_id: String,
    pub username: String,
    pub role: Option<String>,
    pub channel_id: String,
    pub feature_id: Option<String>,
}

pub struct GoalRow {
    pub id: String,
    pub feature_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: String,
}

pub struct NewGoal<'a> {
    pub id: &'a str,
    pub feature_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub created_by: &'a str,
    /// Announcement posted in the feature channel alongside the goal.
    pub announcement: Option<Announcement<'a>>,
}

pub struct Announcement<'a> {
    pub message_id: &'a str,
    pub channel_id: &'a str,
    pub content: &'a str,
}

pub struct GoalProgressRow {
    pub goal_id: String,
    pub title: String,
    pub status: String,
    pub commits_total: u32,
    pub commits_approved: u32,
}

pub struct CommitRow {
    pub id: String,
    pub goal_id: String,
    pub author_id: String,
    pub author_username: String,
    pub message: String,
    pub sha: Option<String>,
    pub url: Option<String>,
    pub status: String,
    pub reviewer_id: Option<String>,
    pub review_comment: Option<String>,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub content: String,
    pub created_at: String,
}
