use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::middleware::auth::AdminToken;
use crate::models::usage::UsageStats;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Restrict the aggregate to one token secret.
    pub token: Option<String>,
}

/// GET /auth/usage: aggregate usage, optionally for a single token
pub async fn get_usage_stats(
    State(state): State<Arc<AppState>>,
    AdminToken(_caller): AdminToken,
    Query(params): Query<UsageQuery>,
) -> Result<Json<UsageStats>, AppError> {
    let stats = state.store.usage_stats(params.token.as_deref()).await?;
    Ok(Json(stats))
}
