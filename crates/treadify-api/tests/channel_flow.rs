mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};

use treadify_api::invites::create_invite;

/// PM with a product, a feature led by `tina`, and the ids involved.
struct Workspace {
    pm: String,
    product_channel: String,
    feature_channel: String,
}

async fn workspace(app: &TestApp) -> Workspace {
    let pm = app.user("pat", "Product Manager").await;
    let reply = app.signup("tina", Some("Technical Lead")).await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let product = app
        .send(
            "POST",
            "/productchannel",
            Some(&pm),
            Some(json!({ "name": "widgets", "repo_url": "https://github.com/acme/widgets.git" })),
        )
        .await;
    assert_eq!(product.status, StatusCode::CREATED);

    let feature = app
        .send(
            "POST",
            "/productchannel/features",
            Some(&pm),
            Some(json!({ "name": "search", "tech_lead": "tina" })),
        )
        .await;
    assert_eq!(feature.status, StatusCode::CREATED, "{:?}", feature.body);

    Workspace {
        pm,
        product_channel: product.body["channel_id"].as_str().unwrap().to_string(),
        feature_channel: feature.body["channel_id"].as_str().unwrap().to_string(),
    }
}

fn text(v: &Value) -> String {
    v.as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn join_code_scopes_a_developer_session() {
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
    let code = create_invite(&app.state.db, "chan-1", &pm_id, &mut rand::rng()).unwrap();

    let dev = app.user("dave", "Developer").await;
    let reply = app
        .send("POST", "/channels/join", Some(&dev), Some(json!({ "code": code })))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["channel_id"], "chan-1");

    let reply = app.send("GET", "/dashboard", Some(&dev), None).await;
    assert_eq!(reply.body["channel"], "chan-1");
    assert_eq!(reply.body["product"], "p1");

    let reply = app
        .send("POST", "/channels/join", Some(&dev), Some(json!({ "code": "NOPE1234" })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Invalid code");

    // The next login lands in the joined channel again.
    let again = app.login("dave").await;
    let reply = app.send("GET", "/dashboard", Some(&again), None).await;
    assert_eq!(reply.body["channel"], "chan-1");
}

#[tokio::test]
async fn invite_codes_are_generated_for_the_session_channel() {
    let app = TestApp::new();
    let ws = workspace(&app).await;

    let reply = app.send("POST", "/channels/invite", Some(&ws.pm), None).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(text(&reply.body["channel_id"]), ws.product_channel);
    assert_eq!(text(&reply.body["code"]).len(), 8);

    let dev = app.user("dave", "Developer").await;
    let reply = app.send("POST", "/channels/invite", Some(&dev), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn goal_commit_review_cycle() {
    let app = TestApp::new();
    let ws = workspace(&app).await;

    // The assigned lead is a member of the feature channel, so login scopes there.
    let tl = app.login("tina").await;
    let reply = app.send("GET", "/dashboard", Some(&tl), None).await;
    assert_eq!(text(&reply.body["channel"]), ws.feature_channel);

    let goal = app
        .send(
            "POST",
            "/featurechannel/goal",
            Some(&tl),
            Some(json!({ "title": "Index documents" })),
        )
        .await;
    assert_eq!(goal.status, StatusCode::CREATED);
    assert_eq!(goal.body["status"], "open");
    let goal_id = text(&goal.body["id"]);

    let messages = app
        .send(
            "GET",
            &format!("/messages/channel/{}/messages", ws.feature_channel),
            Some(&tl),
            None,
        )
        .await;
    assert_eq!(messages.status, StatusCode::OK);
    assert_eq!(messages.body[0]["content"], "New goal: Index documents");

    // A developer joins the feature channel through the lead's code.
    let code = app.send("POST", "/channels/invite", Some(&tl), None).await;
    let dev = app.user("dave", "Developer").await;
    let reply = app
        .send(
            "POST",
            "/channels/join",
            Some(&dev),
            Some(json!({ "code": code.body["code"] })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = app
        .send(
            "POST",
            "/featurechannel/goal",
            Some(&dev),
            Some(json!({ "title": "Sneaky" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let commit = app
        .send(
            "POST",
            &format!("/featurechannel/commit/{goal_id}"),
            Some(&dev),
            Some(json!({ "message": "Add inverted index", "sha": "abc123" })),
        )
        .await;
    assert_eq!(commit.status, StatusCode::CREATED);
    assert_eq!(commit.body["status"], "pending");
    assert_eq!(commit.body["author_username"], "dave");
    let commit_id = text(&commit.body["id"]);

    let reply = app
        .send(
            "PATCH",
            &format!("/featurechannel/commit/{commit_id}/review"),
            Some(&dev),
            Some(json!({ "approved": true })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app
        .send(
            "PATCH",
            &format!("/featurechannel/commit/{commit_id}/review"),
            Some(&tl),
            Some(json!({ "approved": true, "comment": "ship it" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "approved");
    assert_eq!(reply.body["review_comment"], "ship it");

    let progress = app.send("GET", "/progress/feature", Some(&tl), None).await;
    assert_eq!(progress.status, StatusCode::OK);
    assert_eq!(progress.body["name"], "search");
    assert_eq!(progress.body["goals"][0]["commits_total"], 1);
    assert_eq!(progress.body["goals"][0]["commits_approved"], 1);

    let mine = app.send("GET", "/progress/me", Some(&dev), None).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);

    let reply = app
        .send(
            "PATCH",
            &format!("/featurechannel/goal/{goal_id}/complete"),
            Some(&tl),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "completed");

    let reply = app
        .send(
            "POST",
            &format!("/featurechannel/commit/{goal_id}"),
            Some(&dev),
            Some(json!({ "message": "late" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    // The PM sees the goal through the product channel.
    let goals = app.send("GET", "/productchannel/goals", Some(&ws.pm), None).await;
    assert_eq!(goals.body.as_array().unwrap().len(), 1);
    let report = app.send("GET", "/productchannel/report", Some(&ws.pm), None).await;
    assert_eq!(report.body["features"][0]["goals_completed"], 1);
    assert_eq!(report.body["features"][0]["tech_lead"], "tina");
}

#[tokio::test]
async fn goals_outside_the_session_feature_are_not_found() {
    let app = TestApp::new();
    workspace(&app).await;
    let tl = app.login("tina").await;

    let reply = app
        .send(
            "PATCH",
            "/featurechannel/goal/does-not-exist/complete",
            Some(&tl),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn messages_require_membership() {
    let app = TestApp::new();
    let ws = workspace(&app).await;
    let outsider = app.user("olga", "Developer").await;
    let uri = format!("/messages/channel/{}/messages", ws.product_channel);

    let sent = app
        .send("POST", &uri, Some(&ws.pm), Some(json!({ "content": "hello team" })))
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    let message_id = text(&sent.body["id"]);

    let reply = app.send("GET", &uri, Some(&outsider), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app
        .send("GET", "/messages/channel/missing/messages", Some(&ws.pm), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app
        .send("GET", &format!("{uri}?limit=1"), Some(&ws.pm), None)
        .await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
    assert_eq!(reply.body[0]["sender_username"], "pat");

    let reply = app
        .send("POST", &uri, Some(&ws.pm), Some(json!({ "content": "   " })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .send("DELETE", &format!("{uri}/{message_id}"), Some(&ws.pm), None)
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(app.count("messages"), 0);
}

#[tokio::test]
async fn malformed_query_gets_a_json_error() {
    let app = TestApp::new();
    let ws = workspace(&app).await;
    let uri = format!("/messages/channel/{}/messages?limit=abc", ws.product_channel);

    let reply = app.send("GET", &uri, Some(&ws.pm), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.headers.get(axum::http::header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(text(&reply.body["error"]).contains("limit"));
}

#[tokio::test]
async fn only_the_sender_deletes_a_message() {
    let app = TestApp::new();
    let ws = workspace(&app).await;
    let uri = format!("/messages/channel/{}/messages", ws.feature_channel);

    let tl = app.login("tina").await;
    let sent = app
        .send("POST", &uri, Some(&tl), Some(json!({ "content": "standup at 10" })))
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);

    // The PM created the feature, so is a member of its channel.
    let reply = app
        .send(
            "DELETE",
            &format!("{uri}/{}", text(&sent.body["id"])),
            Some(&ws.pm),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(app.count("messages"), 1);
}
