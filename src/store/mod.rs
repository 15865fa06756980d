//! Persistence for tokens and usage records.
//!
//! Every backend implements [`Store`]. The process entry point opens one with
//! [`open`], hands it to `AppState`, and closes it after shutdown.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::models::token::Token;
use crate::models::usage::{UsageRecord, UsageStats};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type DynStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    // -- Token Operations --

    /// Persist a new token. Returns `false` without writing anything when a
    /// token with the same secret already exists.
    async fn insert_token(&self, token: &Token) -> anyhow::Result<bool>;

    async fn find_token(&self, secret: &str) -> anyhow::Result<Option<Token>>;

    async fn list_tokens(&self) -> anyhow::Result<Vec<Token>>;

    /// Hard delete. Returns whether a token existed.
    async fn delete_token(&self, secret: &str) -> anyhow::Result<bool>;

    /// Atomically bump `usage_count` and set `last_used_at` to now.
    /// A secret with no matching token is a no-op.
    async fn record_use(&self, secret: &str) -> anyhow::Result<()>;

    // -- Usage Operations --

    async fn insert_usage(&self, record: &UsageRecord) -> anyhow::Result<()>;

    async fn usage_stats(&self, token: Option<&str>) -> anyhow::Result<UsageStats>;

    /// Release backend resources. Called once by the entry point.
    async fn close(&self) {}
}

/// Open the backend selected by `DATABASE_URL`, running migrations for
/// PostgreSQL.
pub async fn open(cfg: &Config) -> anyhow::Result<DynStore> {
    if cfg.uses_memory_store() {
        tracing::warn!("using in-memory store; tokens and usage are lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url, cfg.db_max_connections).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    Ok(Arc::new(db))
}
