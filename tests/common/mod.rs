//! Shared fixtures for the integration suites: an app over `MemoryStore`,
//! request helpers and polling for detached usage writes.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use moderation_gateway::config::Config;
use moderation_gateway::models::token::Token;
use moderation_gateway::models::usage::{UsageRecord, UsageStats};
use moderation_gateway::moderation::RandomAnalyzer;
use moderation_gateway::store::{DynStore, MemoryStore, Store};
use moderation_gateway::{tokens, AppState};

pub const BOUNDARY: &str = "modgate-test-boundary";

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub memory: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let memory = Arc::new(MemoryStore::new());
        Self::with_store(memory.clone(), memory)
    }

    /// `store` is what the app uses; `memory` is where assertions look.
    pub fn with_store(store: DynStore, memory: Arc<MemoryStore>) -> Self {
        let state = Arc::new(
            AppState::new(Config::default(), store, Arc::new(RandomAnalyzer))
                .expect("app state"),
        );
        Self {
            router: moderation_gateway::router(state.clone()),
            state,
            memory,
        }
    }

    pub async fn issue(&self, is_admin: bool, description: Option<&str>) -> Token {
        tokens::issue(
            self.state.store.as_ref(),
            is_admin,
            description.map(str::to_owned),
        )
        .await
        .expect("issue token")
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.expect("infallible");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, bearer).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, bearer: Option<&str>) -> TestResponse {
        self.send(request("DELETE", uri, bearer).body(Body::empty()).unwrap())
            .await
    }

    /// JSON POST with an explicit `Content-Length`, as a real client sends.
    pub async fn post_json(&self, uri: &str, bearer: Option<&str>, body: Value) -> TestResponse {
        let body = body.to_string();
        self.send(
            request("POST", uri, bearer)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn upload(&self, bearer: Option<&str>, filename: &str, bytes: &[u8]) -> TestResponse {
        self.send(upload_request(bearer, "file", filename, bytes)).await
    }

    /// Poll until at least `n` usage records exist, then return them.
    pub async fn wait_for_usage(&self, n: usize) -> Vec<UsageRecord> {
        for _ in 0..200 {
            let records = self.memory.usage_records();
            if records.len() >= n {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} usage records, found {}",
            n,
            self.memory.usage_records().len()
        );
    }

    /// Give any stray detached write a chance to land before asserting on
    /// absence.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

pub fn request(method: &str, uri: &str, bearer: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(secret) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", secret));
    }
    builder
}

pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(
    bearer: Option<&str>,
    field: &str,
    filename: &str,
    bytes: &[u8],
) -> Request<Body> {
    let body = multipart_body(field, filename, bytes);
    request("POST", "/moderate", bearer)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

/// Token operations succeed; both telemetry writes fail.
pub struct BrokenTelemetryStore(pub Arc<MemoryStore>);

#[async_trait]
impl Store for BrokenTelemetryStore {
    async fn insert_token(&self, token: &Token) -> anyhow::Result<bool> {
        self.0.insert_token(token).await
    }
    async fn find_token(&self, secret: &str) -> anyhow::Result<Option<Token>> {
        self.0.find_token(secret).await
    }
    async fn list_tokens(&self) -> anyhow::Result<Vec<Token>> {
        self.0.list_tokens().await
    }
    async fn delete_token(&self, secret: &str) -> anyhow::Result<bool> {
        self.0.delete_token(secret).await
    }
    async fn record_use(&self, _secret: &str) -> anyhow::Result<()> {
        anyhow::bail!("connection reset")
    }
    async fn insert_usage(&self, _record: &UsageRecord) -> anyhow::Result<()> {
        anyhow::bail!("connection reset")
    }
    async fn usage_stats(&self, token: Option<&str>) -> anyhow::Result<UsageStats> {
        self.0.usage_stats(token).await
    }
}
