use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use axum::{extract::State, response::Redirect};
use rand::{Rng, distr::Alphanumeric};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use treadify_types::api::GitHubCallbackQuery;

use crate::error::{ApiError, ApiQuery};
use crate::session::CurrentUser;
use crate::state::AppState;

const OAUTH_SCOPE: &str = "repo,user:email";
const OAUTH_STATE_LEN: usize = 32;
const USER_AGENT: &str = concat!("treadify/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Host serving `/login/oauth/*`.
    pub oauth_base: String,
    /// Host serving the REST API.
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "https://localhost:5000/auth/github/callback".into(),
            oauth_base: "https://github.com".into(),
            api_base: "https://api.github.com".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// OAuth and REST client for github.com.
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("building GitHub HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.is_empty()
    }

    pub fn authorize_url(&self, state: &str) -> anyhow::Result<Url> {
        let base = self.config.oauth_base.trim_end_matches('/');
        Url::parse_with_params(
            &format!("{base}/login/oauth/authorize"),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("scope", OAUTH_SCOPE),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .context("building GitHub authorize URL")
    }

    /// Trade an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/login/oauth/access_token",
            self.config.oauth_base.trim_end_matches('/')
        );
        let response: TokenResponse = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&TokenRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                code,
                redirect_uri: &self.config.redirect_uri,
            })
            .send()
            .await
            .context("token request")?
            .error_for_status()
            .context("token status")?
            .json()
            .await
            .context("token body")?;

        match (response.access_token, response.error) {
            (Some(token), None) => Ok(token),
            (_, Some(error)) => bail!(
                "GitHub rejected code: {} ({})",
                error,
                response.error_description.unwrap_or_default()
            ),
            (None, None) => Err(anyhow!("GitHub token response had no access_token")),
        }
    }

    pub async fn fetch_user(&self, token: &str) -> anyhow::Result<GitHubUser> {
        let url = format!("{}/user", self.config.api_base.trim_end_matches('/'));
        self.http
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .context("user request")?
            .error_for_status()
            .context("user status")?
            .json()
            .await
            .context("user body")
    }
}

/// Owner and name parsed out of a GitHub repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    /// Canonical `https://github.com/{owner}/{name}` form.
    pub url: String,
}

/// Accepts `https://github.com/{owner}/{name}` with an optional trailing
/// `.git` or `/`. Anything else is `None`.
pub fn parse_repo_url(raw: &str) -> Option<RepoRef> {
    let path = raw.trim().strip_prefix("https://github.com/")?;
    let path = path.strip_suffix('/').unwrap_or(path);
    let path = path.strip_suffix(".git").unwrap_or(path);

    let (owner, name) = path.split_once('/')?;
    let valid = |s: &str| {
        !s.is_empty()
            && s != "."
            && s != ".."
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if !valid(owner) || !valid(name) {
        return None;
    }

    Some(RepoRef {
        owner: owner.to_string(),
        name: name.to_string(),
        url: format!("https://github.com/{owner}/{name}"),
    })
}

// -- Handlers --

/// GET /auth/github: start the OAuth dance for the logged-in user.
pub async fn github_login(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Redirect, ApiError> {
    if !state.github.is_configured() {
        return Err(ApiError::Internal(anyhow!("GitHub OAuth is not configured")));
    }

    let oauth_state: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(OAUTH_STATE_LEN)
        .map(char::from)
        .collect();
    current.set_oauth_state(&oauth_state).await?;

    let url = state.github.authorize_url(&oauth_state)?;
    Ok(Redirect::to(url.as_str()))
}

/// GET /auth/github/callback: link the GitHub account, then bounce back to the frontend.
pub async fn github_callback(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<GitHubCallbackQuery>,
) -> Result<Redirect, ApiError> {
    let expected = current.take_oauth_state().await?;
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Err(ApiError::validation("Missing code"));
    };
    if expected.is_none() || query.state != expected {
        warn!(user = %current.user.username, "OAuth state mismatch");
        return Err(ApiError::validation("Invalid OAuth state"));
    }

    let token = state.github.exchange_code(&code).await?;
    let gh_user = state.github.fetch_user(&token).await?;

    let user_id = current.user.user_id.clone();
    let login = gh_user.login.clone();
    state
        .db(move |db| db.upsert_github_integration(&user_id, &login, &token))
        .await?;

    info!(
        "Linked GitHub account {} to {}",
        gh_user.login, current.user.username
    );
    Ok(Redirect::to(&format!("{}/dashboard", state.client_url)))
}
