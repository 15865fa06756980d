use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::Store;
use crate::models::token::Token;
use crate::models::usage::{UsageRecord, UsageStats, DAILY_WINDOW_DAYS};

/// In-process store backed by `DashMap`s.
///
/// Tokens are keyed by secret; mutating through `get_mut` holds the shard
/// write lock, which makes `record_use` an atomic increment.
#[derive(Default)]
pub struct MemoryStore {
    tokens: DashMap<String, Token>,
    usage: DashMap<Uuid, UsageRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every usage record, oldest first.
    pub fn usage_records(&self) -> Vec<UsageRecord> {
        let mut records: Vec<UsageRecord> =
            self.usage.iter().map(|e| e.value().clone()).collect();
        records.sort_by_key(|r| r.timestamp);
        records
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_token(&self, token: &Token) -> anyhow::Result<bool> {
        match self.tokens.entry(token.secret.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(true)
            }
        }
    }

    async fn find_token(&self, secret: &str) -> anyhow::Result<Option<Token>> {
        Ok(self.tokens.get(secret).map(|t| t.value().clone()))
    }

    async fn list_tokens(&self) -> anyhow::Result<Vec<Token>> {
        let mut tokens: Vec<Token> = self.tokens.iter().map(|e| e.value().clone()).collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn delete_token(&self, secret: &str) -> anyhow::Result<bool> {
        Ok(self.tokens.remove(secret).is_some())
    }

    async fn record_use(&self, secret: &str) -> anyhow::Result<()> {
        if let Some(mut token) = self.tokens.get_mut(secret) {
            token.usage_count += 1;
            token.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn insert_usage(&self, record: &UsageRecord) -> anyhow::Result<()> {
        self.usage.insert(record.id, record.clone());
        Ok(())
    }

    async fn usage_stats(&self, token: Option<&str>) -> anyhow::Result<UsageStats> {
        let cutoff = Utc::now() - Duration::days(DAILY_WINDOW_DAYS);
        let mut stats = UsageStats::default();
        let mut tokens = HashSet::new();
        let mut endpoints: BTreeMap<String, i64> = BTreeMap::new();
        let mut daily: BTreeMap<String, i64> = BTreeMap::new();
        let mut total_ms = 0.0;

        for entry in self.usage.iter() {
            let rec = entry.value();
            if token.is_some_and(|t| t != rec.token) {
                continue;
            }
            stats.total_requests += 1;
            total_ms += rec.duration_ms;
            tokens.insert(rec.token.clone());
            *endpoints.entry(rec.endpoint.clone()).or_default() += 1;
            if rec.timestamp > cutoff {
                *daily
                    .entry(rec.timestamp.format("%Y-%m-%d").to_string())
                    .or_default() += 1;
            }
        }

        stats.unique_tokens = tokens.len() as i64;
        stats.endpoints_usage = endpoints;
        stats.daily_usage = daily;
        if stats.total_requests > 0 {
            stats.average_response_time = Some(total_ms / stats.total_requests as f64);
        }
        Ok(stats)
    }
}
