#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use treadify_api::github::{GitHubClient, GitHubConfig};
use treadify_api::state::{ApiConfig, AppState, AppStateInner};
use treadify_db::Database;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    /// `name=value` of the session cookie set by this response, if any.
    pub fn cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("connect.sid="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_github(GitHubConfig::default())
    }

    pub fn with_github(github: GitHubConfig) -> Self {
        let db = Arc::new(Database::open_in_memory().expect("db"));
        let state = AppStateInner::new(
            db,
            GitHubClient::new(github).expect("github client"),
            ApiConfig {
                client_url: "http://localhost:3000".into(),
                secure_cookies: false,
                session_secret: "integration-test-secret".into(),
            },
        );
        Self {
            router: treadify_api::router(state.clone()),
            state,
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn signup(&self, username: &str, role: Option<&str>) -> Reply {
        let mut body = serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "pass": "secret",
        });
        if let Some(role) = role {
            body["role"] = Value::from(role);
        }
        self.send("POST", "/auth/signup", None, Some(body)).await
    }

    pub async fn login(&self, username: &str) -> String {
        let reply = self
            .send(
                "POST",
                "/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "pass": "secret" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "login {username}: {:?}", reply.body);
        reply.cookie().expect("session cookie")
    }

    /// Sign up with `role` and log in, returning the session cookie.
    pub async fn user(&self, username: &str, role: &str) -> String {
        let reply = self.signup(username, Some(role)).await;
        assert_eq!(reply.status, StatusCode::CREATED, "signup {username}");
        self.login(username).await
    }

    pub fn count(&self, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        self.state
            .db
            .with_conn(|conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
            .expect("count")
    }
}
