use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Reasons an uploaded file is rejected by the file validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported file extension")]
    UnsupportedExtension,

    #[error("invalid or unsupported image format")]
    InvalidFormat,

    #[error("file exceeds maximum allowed size")]
    TooLarge,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, malformed or unknown bearer token. Deliberately carries no
    /// detail so callers cannot tell which secrets exist.
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("admin privileges required")]
    Forbidden,

    #[error("cannot delete your own token")]
    SelfRevoke,

    #[error("token not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable code placed in the `type` field of the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "INVALID_TOKEN",
            AppError::Forbidden => "ADMIN_REQUIRED",
            AppError::SelfRevoke => "SELF_TOKEN_DELETE",
            AppError::NotFound => "TOKEN_NOT_FOUND",
            AppError::Validation(ValidationError::UnsupportedExtension) => "UNSUPPORTED_EXTENSION",
            AppError::Validation(ValidationError::InvalidFormat) => "INVALID_IMAGE_FORMAT",
            AppError::Validation(ValidationError::TooLarge) => "FILE_TOO_LARGE",
            AppError::BadRequest(_) => "INVALID_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::SelfRevoke => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(ValidationError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            AppError::Unauthenticated => "Invalid or missing authentication token".to_string(),
            AppError::Forbidden => "Admin privileges required".to_string(),
            AppError::SelfRevoke => "Cannot delete your own token".to_string(),
            AppError::NotFound => "Token not found".to_string(),
            AppError::Validation(ValidationError::UnsupportedExtension) => {
                "Unsupported file extension".to_string()
            }
            AppError::Validation(ValidationError::InvalidFormat) => {
                "Invalid or unsupported image format".to_string()
            }
            AppError::Validation(ValidationError::TooLarge) => {
                "File exceeds maximum allowed size of 10MB".to_string()
            }
            AppError::BadRequest(detail) => detail.clone(),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "error": msg,
            "type": self.code(),
        }));

        let mut response = (status, body).into_response();

        if matches!(self, AppError::Unauthenticated) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_pairs() {
        let cases = [
            (AppError::Unauthenticated, StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            (AppError::Forbidden, StatusCode::FORBIDDEN, "ADMIN_REQUIRED"),
            (AppError::SelfRevoke, StatusCode::BAD_REQUEST, "SELF_TOKEN_DELETE"),
            (AppError::NotFound, StatusCode::NOT_FOUND, "TOKEN_NOT_FOUND"),
            (
                AppError::Validation(ValidationError::TooLarge),
                StatusCode::PAYLOAD_TOO_LARGE,
                "FILE_TOO_LARGE",
            ),
            (
                AppError::Validation(ValidationError::InvalidFormat),
                StatusCode::BAD_REQUEST,
                "INVALID_IMAGE_FORMAT",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status(), status, "{:?}", err);
            assert_eq!(err.code(), code, "{:?}", err);
        }
    }

    #[test]
    fn test_unauthenticated_sets_www_authenticate() {
        let resp = AppError::Unauthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[test]
    fn test_internal_error_hides_details() {
        let resp = AppError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
