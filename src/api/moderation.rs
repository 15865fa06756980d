use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use crate::errors::{AppError, ValidationError};
use crate::middleware::auth::Authenticated;
use crate::models::moderation::{category_catalog, ModerationResult};
use crate::moderation::validate;
use crate::AppState;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

/// POST /moderate: validate the uploaded image and score it.
pub async fn moderate(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Result<Json<ModerationResult>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let (filename, declared_type, bytes) = loop {
        let Some(field) = multipart.next_field().await.map_err(multipart_error)? else {
            return Err(AppError::BadRequest(format!(
                "missing multipart field '{}'",
                FILE_FIELD
            )));
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let declared_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        break (filename, declared_type, bytes);
    };

    let format = validate(&filename, &bytes)?;
    let content_type = declared_type.unwrap_or_else(|| format.mime().to_owned());

    let result = state
        .analyzer
        .analyze(&bytes, &filename, &content_type)
        .await?;

    state.metrics.record_moderation(result.is_safe);
    tracing::info!(
        token = %caller.masked(),
        filename = %result.filename,
        size = bytes.len(),
        is_safe = result.is_safe,
        "image moderated"
    );
    Ok(Json(result))
}

/// GET /moderate/categories
pub async fn categories(Authenticated(_caller): Authenticated) -> Json<Value> {
    Json(category_catalog())
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation(ValidationError::TooLarge)
    } else {
        AppError::BadRequest(e.body_text())
    }
}
