mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn signup_login_dashboard() {
    let app = TestApp::new();

    let reply = app.signup("alice", None).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["username"], "alice");
    assert_eq!(reply.body["role"], "Developer");

    let cookie = app.login("alice").await;

    let reply = app.send("GET", "/dashboard", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["username"], "alice");
    assert_eq!(reply.body["email"], "alice@example.com");
    assert!(reply.body["channel"].is_null());
}

#[tokio::test]
async fn session_cookie_is_hardened() {
    let app = TestApp::new();
    app.signup("alice", None).await;

    let reply = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(serde_json::json!({ "username": "alice", "pass": "secret" })),
        )
        .await;
    let raw = reply
        .headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(raw.starts_with("connect.sid="));
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Strict"));
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = TestApp::new();
    assert_eq!(app.signup("alice", None).await.status, StatusCode::CREATED);

    let reply = app.signup("alice", None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"], "Username already taken");
}

#[tokio::test]
async fn malformed_signup_is_bad_request() {
    let app = TestApp::new();

    let reply = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(serde_json::json!({ "username": "alice" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].is_string());

    let reply = app.signup("bob", Some("Overlord")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthenticated() {
    let app = TestApp::new();
    app.signup("alice", None).await;

    let reply = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(serde_json::json!({ "username": "alice", "pass": "nope" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.cookie().is_none());

    let reply = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(serde_json::json!({ "username": "nobody", "pass": "secret" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let app = TestApp::new();
    app.signup("alice", None).await;
    let cookie = app.login("alice").await;

    let reply = app.send("POST", "/auth/logout", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = app.send("GET", "/dashboard", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.count("sessions"), 0);
}

#[tokio::test]
async fn logout_without_session_is_fine() {
    let app = TestApp::new();
    let reply = app.send("POST", "/auth/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn forged_cookie_is_unauthenticated() {
    let app = TestApp::new();
    let reply = app
        .send("GET", "/dashboard", Some("connect.sid=not-a-real-session"), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let reply = app.send("GET", "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

/// Rewrite the only session row so it ends at `deadline` (unix seconds).
fn end_session_at(app: &TestApp, deadline: i64) {
    let rows = app
        .state
        .db
        .with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE sessions
                 SET expiry_date = ?1, data = json_set(data, '$.data.expires_at', ?1)",
                [deadline],
            )?)
        })
        .unwrap();
    assert_eq!(rows, 1);
}

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[tokio::test]
async fn session_activity_does_not_extend_the_login() {
    let app = TestApp::new();
    app.signup("pat", Some("Product Manager")).await;
    let pm_id = app.state.db.get_user_by_username("pat").unwrap().unwrap().id;
    app.state
        .db
        .with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO products (id, pm_id, name) VALUES ('p1', ?1, 'widgets')",
                [&pm_id],
            )?;
            conn.execute("INSERT INTO channels (id, product_id) VALUES ('chan-1', 'p1')", [])?;
            Ok(())
        })
        .unwrap();
    let code = treadify_api::invites::create_invite(&app.state.db, "chan-1", &pm_id, &mut rand::rng())
        .unwrap();

    // A minute left of the twelve hours.
    let dev = app.user("dave", "Developer").await;
    let deadline = now() + 60;
    end_session_at(&app, deadline);

    let reply = app
        .send(
            "POST",
            "/channels/join",
            Some(&dev),
            Some(serde_json::json!({ "code": code })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let stored: i64 = app
        .state
        .db
        .with_conn(|conn| Ok(conn.query_row("SELECT expiry_date FROM sessions", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(stored, deadline);

    let set_cookie = reply
        .headers
        .get(axum::http::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let max_age: i64 = set_cookie
        .split(';')
        .find_map(|part| part.trim().strip_prefix("Max-Age="))
        .unwrap()
        .parse()
        .unwrap();
    assert!(max_age <= 60, "{set_cookie}");
}

#[tokio::test]
async fn session_past_its_login_deadline_is_rejected() {
    let app = TestApp::new();
    let cookie = app.user("alice", "Developer").await;

    end_session_at(&app, now() - 1);
    // The row itself stays loadable; only the login deadline has passed.
    app.state
        .db
        .with_conn_mut(|conn| {
            conn.execute("UPDATE sessions SET expiry_date = ?1", [now() + 3600])?;
            Ok(())
        })
        .unwrap();

    let reply = app.send("GET", "/dashboard", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.count("sessions"), 0);
}
