use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed, authenticated API call. Immutable once written.
///
/// `token` holds the secret string rather than the token id; records outlive
/// the token they reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub token: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// What the tracking interceptor observed about a request.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub token: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub user_agent: Option<String>,
    pub ip_address: String,
    pub request_size: Option<u64>,
}

impl UsageEvent {
    /// Stamp the event with an id and the write-time wall clock.
    pub fn into_record(self) -> UsageRecord {
        let metadata = self
            .request_size
            .map(|size| serde_json::json!({ "request_size": size }));
        UsageRecord {
            id: Uuid::new_v4(),
            token: self.token,
            endpoint: self.endpoint,
            method: self.method,
            status_code: self.status_code,
            duration_ms: self.duration_ms,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            metadata,
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate usage, optionally scoped to a single token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_requests: i64,
    pub unique_tokens: i64,
    pub endpoints_usage: BTreeMap<String, i64>,
    /// Requests per UTC day (`YYYY-MM-DD`) over the last `DAILY_WINDOW_DAYS`.
    pub daily_usage: BTreeMap<String, i64>,
    /// Mean processing time in milliseconds, `None` without records.
    pub average_response_time: Option<f64>,
}

pub const DAILY_WINDOW_DAYS: i64 = 30;
