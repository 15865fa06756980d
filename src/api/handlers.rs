use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::middleware::auth::AdminToken;
use crate::models::token::{mask_secret, CreateTokenRequest, Token, TokenInfo};
use crate::tokens;
use crate::AppState;

// ── Liveness ─────────────────────────────────────────────────

/// GET /
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "Image Moderation API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy",
        "environment": state.config.environment.to_string(),
    }))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let now = chrono::Utc::now();
    let timestamp = now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6;
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp,
        "environment": state.config.environment.to_string(),
    }))
}

// ── Token Lifecycle ──────────────────────────────────────────

/// POST /auth/tokens: issue a token. The secret is only ever returned here.
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    AdminToken(caller): AdminToken,
    payload: Result<Json<CreateTokenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Token>), AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let token = tokens::issue(state.store.as_ref(), payload.is_admin, payload.description).await?;

    tracing::info!(
        by = %caller.masked(),
        token = %token.masked(),
        is_admin = token.is_admin,
        "token created"
    );
    Ok((StatusCode::CREATED, Json(token)))
}

/// GET /auth/tokens
pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
    AdminToken(_caller): AdminToken,
) -> Result<Json<Vec<TokenInfo>>, AppError> {
    Ok(Json(tokens::list(state.store.as_ref()).await?))
}

/// DELETE /auth/tokens/:token
pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    AdminToken(caller): AdminToken,
    Path(target): Path<String>,
) -> Result<Json<Value>, AppError> {
    tokens::revoke(state.store.as_ref(), &caller, &target).await?;

    tracing::info!(by = %caller.masked(), token = %mask_secret(&target), "token revoked");
    Ok(Json(json!({ "message": "Token deleted successfully" })))
}
