//! Row-to-response conversions shared by the handlers.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use treadify_db::models::{ChannelRow, CommitRow, GoalRow, MemberRow, MessageRow};
use treadify_types::api::{CommitResponse, GoalResponse, MemberResponse, MessageResponse};
use treadify_types::{CommitStatus, GoalStatus, Role, Scope};

/// SQLite stores `datetime('now')` as "YYYY-MM-DD HH:MM:SS" without a zone; read it as UTC.
pub fn parse_timestamp(raw: &str, what: &str, id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {} '{}': {}", raw, what, id, e);
            DateTime::default()
        })
}

pub fn parse_role(raw: Option<&str>) -> Option<Role> {
    let raw = raw?;
    raw.parse().ok().or_else(|| {
        warn!("Unknown role name '{}'", raw);
        None
    })
}

/// Session scope for a channel: its product, its feature if any, and the channel itself.
pub fn scope_for(channel: ChannelRow) -> Scope {
    Scope {
        product_id: Some(channel.product_id),
        feature_id: channel.feature_id,
        channel_id: Some(channel.id),
    }
}

pub fn goal(row: GoalRow) -> GoalResponse {
    let status = row.status.parse().unwrap_or_else(|_| {
        warn!("Corrupt status '{}' on goal '{}'", row.status, row.id);
        GoalStatus::Open
    });
    GoalResponse {
        created_at: parse_timestamp(&row.created_at, "goal", &row.id),
        status,
        id: row.id,
        feature_id: row.feature_id,
        title: row.title,
        description: row.description,
        created_by: row.created_by,
    }
}

pub fn commit(row: CommitRow) -> CommitResponse {
    let status = row.status.parse().unwrap_or_else(|_| {
        warn!("Corrupt status '{}' on commit '{}'", row.status, row.id);
        CommitStatus::Pending
    });
    CommitResponse {
        created_at: parse_timestamp(&row.created_at, "commit", &row.id),
        status,
        id: row.id,
        goal_id: row.goal_id,
        author_id: row.author_id,
        author_username: row.author_username,
        message: row.message,
        sha: row.sha,
        url: row.url,
        reviewer_id: row.reviewer_id,
        review_comment: row.review_comment,
    }
}

pub fn message(row: MessageRow) -> MessageResponse {
    MessageResponse {
        created_at: parse_timestamp(&row.created_at, "message", &row.id),
        id: row.id,
        channel_id: row.channel_id,
        sender_id: row.sender_id,
        sender_username: row.sender_username,
        content: row.content,
    }
}

pub fn member(row: MemberRow) -> MemberResponse {
    MemberResponse {
        role: parse_role(row.role.as_deref()),
        user_id: row.user_id,
        username: row.username,
        channel_id: row.channel_id,
        feature_id: row.feature_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn sqlite_and_rfc3339_timestamps_parse() {
        let t = parse_timestamp("2024-03-05 14:07:09", "goal", "g");
        assert_eq!((t.year(), t.month(), t.day()), (2024, 3, 5));
        assert_eq!((t.hour(), t.minute(), t.second()), (14, 7, 9));

        let t = parse_timestamp("2024-03-05T14:07:09Z", "goal", "g");
        assert_eq!(t.hour(), 14);
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday", "goal", "g"), DateTime::<Utc>::default());
    }

    #[test]
    fn role_names_map_back() {
        assert_eq!(parse_role(Some("Technical Lead")), Some(Role::TechnicalLead));
        assert_eq!(parse_role(Some("Janitor")), None);
        assert_eq!(parse_role(None), None);
    }
}
