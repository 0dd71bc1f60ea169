use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Constructed once at startup and passed down through `AppState` —
/// nothing reads the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub mail_host: String,
    pub mail_port: u16,
    pub mail_sender: String,
    pub mail_password: String,
    /// CORS origin allow-list. Empty means permissive (dev).
    pub cors_origins: Vec<String>,
    /// Base URL used when building email confirmation / reset links.
    pub base_url: String,
    /// When false, the active-account check on authenticated routes is bypassed.
    pub is_production: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            secret_key: require_env("SECRET_KEY")?,
            mail_host: require_env("MAIL_HOST")?,
            mail_port: std::env::var("MAIL_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse::<u16>()
                .context("MAIL_PORT must be a valid port number")?,
            mail_sender: require_env("MAIL_SENDER")?,
            mail_password: require_env("MAIL_PASSWORD")?,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            is_production: std::env::var("IS_PRODUCTION")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
