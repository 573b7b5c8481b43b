use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use treadify_api::github::GitHubConfig;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "secret", "your-secret-here"];

const PEM_MARKER: &str = "-----BEGIN";

pub struct Config {
    pub db_path: PathBuf,
    pub db_pool_size: usize,
    pub host: String,
    pub port: u16,
    pub tls_cert_pem: String,
    pub tls_key_pem: String,
    pub session_secret: String,
    pub client_url: String,
    pub secure_cookies: bool,
    pub github: GitHubConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let session_secret = var("SECRET").context("SECRET is not set")?;
        if PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("SECRET is still a placeholder; set a random value");
        }

        let tls_key_pem = pem_or_file("KEY_PEM", var("KEY_PEM"))?;
        let tls_cert_pem = pem_or_file("CERT_PEM", var("CERT_PEM"))?;

        let port: u16 = or("PORT", "5000").parse().context("PORT is not a number")?;
        let db_pool_size: usize = or("DB_POOL_SIZE", "10")
            .parse()
            .context("DB_POOL_SIZE is not a number")?;

        let defaults = GitHubConfig::default();
        let github = GitHubConfig {
            client_id: or("CLIENT_ID", ""),
            client_secret: or("CLIENT_SECRET", ""),
            redirect_uri: or("GITHUB_REDIRECT_URI", &defaults.redirect_uri),
            timeout: Duration::from_secs(10),
            ..defaults
        };

        Ok(Self {
            db_path: or("DB_NAME", "treadify.db").into(),
            db_pool_size: db_pool_size.max(1),
            host: or("HOST", "0.0.0.0"),
            port,
            tls_cert_pem,
            tls_key_pem,
            session_secret,
            client_url: or("CLIENT_URL", "http://localhost:3000"),
            secure_cookies: or("APP_ENV", "development") == "production",
            github,
        })
    }
}

/// A PEM value is either the PEM text itself or a path to a file holding it.
fn pem_or_file(key: &str, value: Option<String>) -> anyhow::Result<String> {
    let Some(value) = value else {
        bail!("{key} is not set");
    };
    if value.trim_start().starts_with(PEM_MARKER) {
        return Ok(value);
    }
    std::fs::read_to_string(&value).with_context(|| format!("reading {key} from {value}"))
}
