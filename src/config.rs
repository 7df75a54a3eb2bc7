use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub remember_ttl_days: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub folder: PathBuf,
    /// Off on hosts without writable local storage.
    pub enabled: bool,
    pub max_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").context("SESSION_SECRET is not set")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "reelgate".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "reelgate-web".into()),
            ttl_minutes: env_parse("SESSION_TTL_MINUTES", 12 * 60),
            remember_ttl_days: env_parse("REMEMBER_TTL_DAYS", 30),
            cookie_secure: env_parse("COOKIE_SECURE", false),
        };
        let uploads = UploadConfig {
            folder: std::env::var("UPLOAD_FOLDER")
                .unwrap_or_else(|_| "static/uploads".into())
                .into(),
            enabled: env_parse("UPLOADS_ENABLED", true),
            max_mb: env_parse("MAX_UPLOAD_MB", 200),
        };
        Ok(Self {
            database_url,
            session,
            uploads,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
