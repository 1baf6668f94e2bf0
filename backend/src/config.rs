// src/config.rs

use std::{env, fmt, str::FromStr};

/// Upper bound on leaderboard size.
pub const LEADERBOARD_LIMIT: i64 = 10;

/// Attempt tokens for lessons without a time limit expire after this many seconds.
pub const DEFAULT_ATTEMPT_TTL_SECS: u64 = 2 * 60 * 60;

#[derive(Debug)]
pub struct ConfigError(String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
    /// Adds the `Secure` attribute to session and CSRF cookies.
    pub cookie_secure: bool,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub ai_cache_ttl_secs: u64,
    pub ai_cache_capacity: u64,
    pub tag_cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

fn required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError(format!("{} must be set", key)))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration: parsed("JWT_EXPIRATION", 7 * 24 * 60 * 60)?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3001".to_string()),
            allowed_origins,
            cookie_secure: parsed("COOKIE_SECURE", false)?,
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            gemini_base_url: optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            ai_cache_ttl_secs: parsed("AI_CACHE_TTL_SECS", 60 * 60)?,
            ai_cache_capacity: parsed("AI_CACHE_CAPACITY", 256)?,
            tag_cache_ttl_secs: parsed("TAG_CACHE_TTL_SECS", 5 * 60)?,
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}
