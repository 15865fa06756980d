use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::Store;
use crate::models::token::Token;
use crate::models::usage::{UsageRecord, UsageStats, DAILY_WINDOW_DAYS};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const TOKEN_COLUMNS: &str =
    "id, secret, is_admin, description, created_at, last_used_at, usage_count";

#[async_trait]
impl Store for PgStore {
    // -- Token Operations --

    async fn insert_token(&self, token: &Token) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"INSERT INTO tokens (id, secret, is_admin, description, created_at, last_used_at, usage_count)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (secret) DO NOTHING"#,
        )
        .bind(token.id)
        .bind(&token.secret)
        .bind(token.is_admin)
        .bind(&token.description)
        .bind(token.created_at)
        .bind(token.last_used_at)
        .bind(token.usage_count)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_token(&self, secret: &str) -> anyhow::Result<Option<Token>> {
        let row = sqlx::query_as::<_, Token>(&format!(
            "SELECT {} FROM tokens WHERE secret = $1",
            TOKEN_COLUMNS
        ))
        .bind(secret)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_tokens(&self) -> anyhow::Result<Vec<Token>> {
        let rows = sqlx::query_as::<_, Token>(&format!(
            "SELECT {} FROM tokens ORDER BY created_at DESC",
            TOKEN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete_token(&self, secret: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tokens WHERE secret = $1")
            .bind(secret)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_use(&self, secret: &str) -> anyhow::Result<()> {
        // Single statement: the increment happens in the database, never as
        // read-modify-write in the application.
        sqlx::query(
            "UPDATE tokens SET usage_count = usage_count + 1, last_used_at = NOW() WHERE secret = $1",
        )
        .bind(secret)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- Usage Operations --

    async fn insert_usage(&self, record: &UsageRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_records (
                id, token, endpoint, method, status_code, duration_ms,
                ip_address, user_agent, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.token)
        .bind(&record.endpoint)
        .bind(&record.method)
        .bind(record.status_code as i16)
        .bind(record.duration_ms)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(&record.metadata)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn usage_stats(&self, token: Option<&str>) -> anyhow::Result<UsageStats> {
        let totals = sqlx::query_as::<_, (i64, i64, Option<f64>)>(
            r#"SELECT
                COUNT(*) AS total,
                COUNT(DISTINCT token) AS unique_tokens,
                AVG(duration_ms)::float8 AS avg_ms
            FROM usage_records
            WHERE ($1::text IS NULL OR token = $1)"#,
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await?;

        let endpoints = sqlx::query_as::<_, (String, i64)>(
            r#"SELECT endpoint, COUNT(*)
            FROM usage_records
            WHERE ($1::text IS NULL OR token = $1)
            GROUP BY endpoint"#,
        )
        .bind(token)
        .fetch_all(&self.pool)
        .await?;

        let cutoff: DateTime<Utc> = Utc::now() - chrono::Duration::days(DAILY_WINDOW_DAYS);
        let daily = sqlx::query_as::<_, (String, i64)>(
            r#"SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS day, COUNT(*)
            FROM usage_records
            WHERE ($1::text IS NULL OR token = $1) AND created_at > $2
            GROUP BY day
            ORDER BY day ASC"#,
        )
        .bind(token)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(UsageStats {
            total_requests: totals.0,
            unique_tokens: totals.1,
            endpoints_usage: endpoints.into_iter().collect::<BTreeMap<_, _>>(),
            daily_usage: daily.into_iter().collect::<BTreeMap<_, _>>(),
            average_response_time: totals.2,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Disconnected from database");
    }
}

