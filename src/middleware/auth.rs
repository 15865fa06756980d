use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::models::token::Token;
use crate::store::DynStore;
use crate::AppState;

/// Extract the secret from `Authorization: Bearer <secret>`.
///
/// The scheme is matched case-sensitively with exactly one space; anything
/// else yields `None`. Only the first space-delimited word after the scheme
/// is taken.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .split(' ')
        .next()
        .filter(|t| !t.is_empty())
}

/// The two authorization gates: any valid token, or an admin token.
#[derive(Clone)]
pub struct AuthGuard {
    store: DynStore,
}

impl AuthGuard {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Resolve `secret` to a token. Unknown and malformed secrets fail the
    /// same way.
    pub async fn authenticate(&self, secret: &str) -> Result<Token, AppError> {
        if secret.is_empty() {
            return Err(AppError::Unauthenticated);
        }
        match self.store.find_token(secret).await? {
            Some(token) => Ok(token),
            None => {
                tracing::warn!("rejected request with unknown bearer token");
                Err(AppError::Unauthenticated)
            }
        }
    }

    /// Like [`authenticate`](Self::authenticate), then require the admin flag.
    pub async fn authorize_admin(&self, secret: &str) -> Result<Token, AppError> {
        let token = self.authenticate(secret).await?;
        if !token.is_admin {
            tracing::warn!(token = %token.masked(), "non-admin token used on admin route");
            return Err(AppError::Forbidden);
        }
        Ok(token)
    }
}

/// Extractor: request carries any valid bearer token.
pub struct Authenticated(pub Token);

/// Extractor: request carries a valid admin bearer token.
pub struct AdminToken(pub Token);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let secret = bearer_token(&parts.headers).ok_or(AppError::Unauthenticated)?;
        state.guard.authenticate(secret).await.map(Self)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let secret = bearer_token(&parts.headers).ok_or(AppError::Unauthenticated)?;
        state.guard.authorize_admin(secret).await.map(Self)
    }
}
