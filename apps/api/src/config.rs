use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::render::DEFAULT_TITLE_COLOR;

/// 10 MiB: room for a phone photo or scanned PDF encoded as base64.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Messages endpoint; overridable for proxies and tests.
    pub anthropic_api_url: String,
    pub port: u16,
    pub rust_log: String,
    pub users_db_path: PathBuf,
    pub title_color: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            anthropic_api_url: optional_env("ANTHROPIC_API_URL")
                .unwrap_or_else(|| crate::llm_client::DEFAULT_API_URL.to_string()),
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            users_db_path: optional_env("USERS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("users.json")),
            title_color: optional_env("TITLE_COLOR")
                .unwrap_or_else(|| DEFAULT_TITLE_COLOR.to_string()),
            max_upload_bytes: match optional_env("MAX_UPLOAD_BYTES") {
                Some(raw) => raw
                    .parse::<usize>()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                None => DEFAULT_MAX_UPLOAD_BYTES,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
