use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Deployment environment. Controls CORS strictness, log format and
/// whether the in-memory store may be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Unrecognized names fall back to development, so parsing never fails.
impl FromStr for Environment {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        })
    }
}

impl Environment {

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `postgres://...` for PostgreSQL, `memory://` for the in-process store.
    pub database_url: String,
    pub db_max_connections: u32,
    pub environment: Environment,
    /// Origins allowed by CORS outside development.
    /// Set via ALLOWED_ORIGINS (comma-separated).
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 7000,
            database_url: "memory://".into(),
            db_max_connections: 10,
            environment: Environment::Development,
            allowed_origins: default_origins(),
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let environment: Environment = std::env::var("ENVIRONMENT")
        .unwrap_or_default()
        .parse()
        .unwrap_or_default();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/image_moderation".into());

    let cfg = Config {
        host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        port: std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7000),
        database_url,
        db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        environment,
        allowed_origins: std::env::var("ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_else(|_| default_origins()),
    };

    if cfg.uses_memory_store() && cfg.environment == Environment::Production {
        anyhow::bail!(
            "DATABASE_URL=memory:// is not allowed in production. \
             Point DATABASE_URL at a PostgreSQL instance."
        );
    }

    Ok(cfg)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
