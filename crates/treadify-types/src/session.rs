use serde::{Deserialize, Serialize};

use crate::models::Role;

/// The authenticated identity carried by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    /// `None` when the user's role row could not be resolved at login.
    /// Gated handlers treat this as forbidden.
    pub role: Option<Role>,
}

/// Product / feature / channel identifiers that bound what a request may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub product_id: Option<String>,
    pub feature_id: Option<String>,
    pub channel_id: Option<String>,
}

impl Scope {
    pub fn is_empty(&self) -> bool {
        self.product_id.is_none() && self.feature_id.is_none() && self.channel_id.is_none()
    }
}

/// Server-side session state, stored under a single key in the session record.
///
/// A missing record decodes as `Unauthenticated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Unscoped {
        user: SessionUser,
    },
    Scoped {
        user: SessionUser,
        scope: Scope,
    },
}

impl SessionState {
    /// Build the authenticated state for `user`, scoped only if `scope` names something.
    pub fn authenticated(user: SessionUser, scope: Scope) -> Self {
        if scope.is_empty() {
            SessionState::Unscoped { user }
        } else {
            SessionState::Scoped { user, scope }
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            SessionState::Unauthenticated => None,
            SessionState::Unscoped { user } | SessionState::Scoped { user, .. } => Some(user),
        }
    }

    pub fn scope(&self) -> Option<&Scope> {
        match self {
            SessionState::Scoped { scope, .. } => Some(scope),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SessionUser {
        SessionUser {
            user_id: "u-1".into(),
            username: "alice".into(),
            email: "a@x.com".into(),
            role: Some(Role::Developer),
        }
    }

    #[test]
    fn empty_scope_is_unscoped() {
        let state = SessionState::authenticated(alice(), Scope::default());
        assert!(matches!(state, SessionState::Unscoped { .. }));
        assert!(state.scope().is_none());
        assert_eq!(state.user().map(|u| u.username.as_str()), Some("alice"));
    }

    #[test]
    fn named_scope_is_scoped() {
        let state = SessionState::authenticated(
            alice(),
            Scope {
                channel_id: Some("chan-1".into()),
                ..Scope::default()
            },
        );
        assert_eq!(
            state.scope().and_then(|s| s.channel_id.as_deref()),
            Some("chan-1")
        );
    }

    #[test]
    fn unauthenticated_has_no_user() {
        assert!(SessionState::Unauthenticated.user().is_none());
        assert!(SessionState::default().scope().is_none());
    }

    #[test]
    fn state_tag_roundtrips_through_json() {
        let state = SessionState::Scoped {
            user: alice(),
            scope: Scope {
                product_id: Some("p-1".into()),
                feature_id: None,
                channel_id: Some("c-1".into()),
            },
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["state"], "scoped");
        let back: SessionState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }
}
