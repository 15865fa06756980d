use std::time::Instant;

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_PROCESS_TIME: &str = "x-process-time";

/// Injects a unique X-Request-Id into every response so clients can
/// correlate errors with server logs.
pub async fn request_id(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert(X_REQUEST_ID, val);
    }
    resp
}

/// Wall-clock seconds spent producing the response, as `X-Process-Time`.
pub async fn process_time(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut resp = next.run(req).await;
    let elapsed = started.elapsed().as_secs_f64();
    if let Ok(val) = HeaderValue::from_str(&format!("{:.6}", elapsed)) {
        resp.headers_mut().insert(X_PROCESS_TIME, val);
    }
    resp
}

pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.remove(header::SERVER);

    resp
}
