//! Usage tracking interceptor.
//!
//! Runs on every request, authenticated or not. It never rejects or alters
//! anything; after the response status is known it may hand one usage event
//! to the [`UsageRecorder`](super::usage::UsageRecorder) on a detached task.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use super::auth::bearer_token;
use crate::models::usage::UsageEvent;
use crate::AppState;

pub async fn track_usage(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let token = bearer_token(req.headers()).map(str::to_owned);
    let endpoint = req.uri().path().to_owned();
    let method = req.method().to_string();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let request_size = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip_address = client_ip(req.headers(), peer);

    let response = next.run(req).await;
    let status = response.status();

    if let Some(token) = token.filter(|t| should_track(Some(t.as_str()), status)) {
        state.recorder.record_detached(UsageEvent {
            token,
            endpoint,
            method,
            status_code: status.as_u16(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            user_agent,
            ip_address,
            request_size,
        });
    }

    response
}

/// A request is tracked only when it carried a bearer token and succeeded.
pub fn should_track(token: Option<&str>, status: StatusCode) -> bool {
    token.is_some() && status.as_u16() < 400
}

/// Best-effort client address: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the socket peer, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_owned();
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}
