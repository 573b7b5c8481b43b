pub mod auth;
mod convert;
pub mod error;
pub mod features;
pub mod github;
pub mod invites;
pub mod messages;
pub mod products;
pub mod progress;
pub mod rbac;
pub mod session;
pub mod session_store;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};

use crate::session::{SESSION_COOKIE, SESSION_MAX_AGE};
use crate::session_store::SqliteSessionStore;
use crate::state::AppState;

/// Every HTTP route, wrapped in the session layer.
///
/// CORS and tracing layers are left to the binary.
pub fn router(state: AppState) -> Router {
    let store = SqliteSessionStore::new(state.db.clone());
    let session_layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Strict)
        .with_secure(state.secure_cookies)
        .with_expiry(Expiry::OnInactivity(SESSION_MAX_AGE))
        .with_signed(state.session_key.clone());

    let auth_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/github", get(github::github_login))
        .route("/auth/github/callback", get(github::github_callback))
        .route("/dashboard", get(auth::dashboard));

    let product_routes = Router::new()
        .route("/productchannel", post(products::create_product_channel))
        .route("/productchannel/features", post(products::add_feature))
        .route("/productchannel/deprecate", patch(products::deprecate))
        .route("/productchannel/members", get(products::members))
        .route("/productchannel/goals", get(products::goals))
        .route("/productchannel/report", get(products::report))
        .route(
            "/productchannel/deadline",
            get(products::get_deadline).patch(products::update_deadline),
        )
        .route("/channels/invite", post(invites::generate))
        .route("/channels/join", post(invites::join));

    let feature_routes = Router::new()
        .route("/featurechannel/goals", get(features::list_goals))
        .route("/featurechannel/goal", post(features::create_goal))
        .route(
            "/featurechannel/goal/{goal_id}/complete",
            patch(features::complete_goal),
        )
        .route(
            "/featurechannel/commit/{goal_id}",
            post(features::submit_commit),
        )
        .route("/featurechannel/commits", get(features::list_commits))
        .route(
            "/featurechannel/commit/{commit_id}/review",
            patch(features::review_commit),
        )
        .route("/progress/feature", get(progress::feature_progress))
        .route("/progress/me", get(progress::my_progress));

    let message_routes = Router::new()
        .route(
            "/messages/channel/{channel_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/messages/channel/{channel_id}/messages/{message_id}",
            delete(messages::delete_message),
        );

    Router::new()
        .merge(auth_routes)
        .merge(product_routes)
        .merge(feature_routes)
        .merge(message_routes)
        .layer(session_layer)
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
