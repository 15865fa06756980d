//! Prometheus metrics recorder.
//!
//! Exposes a standard `/metrics` endpoint that Prometheus can scrape.
//! Request metrics are updated by [`track_metrics`]; usage writes and
//! moderation verdicts are reported by their owners.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::AppState;

/// Metrics live in a registry owned by this recorder rather than the global
/// default one, so several app instances can coexist in one process.
#[derive(Clone)]
pub struct PrometheusRecorder {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    usage_writes_total: IntCounterVec,
    moderations_total: IntCounterVec,
}

impl PrometheusRecorder {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("modgate_http_requests_total", "Total HTTP requests handled"),
            &["method", "route", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "modgate_http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "route"],
        )?;
        let usage_writes_total = IntCounterVec::new(
            Opts::new(
                "modgate_usage_writes_total",
                "Usage telemetry writes by outcome",
            ),
            &["outcome"],
        )?;
        let moderations_total = IntCounterVec::new(
            Opts::new("modgate_moderations_total", "Moderation verdicts"),
            &["verdict"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(usage_writes_total.clone()))?;
        registry.register(Box::new(moderations_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            usage_writes_total,
            moderations_total,
        })
    }

    pub fn observe_request(&self, method: &str, route: &str, status: u16, elapsed_secs: f64) {
        self.requests_total
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, route])
            .observe(elapsed_secs);
    }

    pub fn record_usage_write(&self, ok: bool) {
        let outcome = if ok { "ok" } else { "failed" };
        self.usage_writes_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_moderation(&self, is_safe: bool) {
        let verdict = if is_safe { "safe" } else { "unsafe" };
        self.moderations_total.with_label_values(&[verdict]).inc();
    }

    pub fn usage_writes(&self, ok: bool) -> u64 {
        let outcome = if ok { "ok" } else { "failed" };
        self.usage_writes_total.with_label_values(&[outcome]).get()
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Middleware stage: counts every request by method, matched route and status.
/// Uses the route template, never the raw path, to bound label cardinality.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(req).await;

    state.metrics.observe_request(
        &method,
        &route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
