//! Token lifecycle: issue, list, revoke.
//!
//! These functions hold the rules; the HTTP handlers and the CLI only adapt
//! inputs and outputs around them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::errors::AppError;
use crate::models::token::{Token, TokenInfo};
use crate::store::Store;

/// Bytes of entropy per secret.
pub const SECRET_BYTES: usize = 32;

/// Attempts before `issue` gives up on finding an unused secret.
const MAX_ISSUE_ATTEMPTS: usize = 5;

/// 32 bytes from the OS CSPRNG, URL-safe base64 without padding.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Create and persist a new token, regenerating the secret if the store
/// reports a collision.
pub async fn issue(
    store: &dyn Store,
    is_admin: bool,
    description: Option<String>,
) -> Result<Token, AppError> {
    issue_with(store, is_admin, description, generate_secret).await
}

pub(crate) async fn issue_with(
    store: &dyn Store,
    is_admin: bool,
    description: Option<String>,
    mut next_secret: impl FnMut() -> String,
) -> Result<Token, AppError> {
    for attempt in 1..=MAX_ISSUE_ATTEMPTS {
        let token = Token::new(next_secret(), is_admin, description.clone());
        if store.insert_token(&token).await? {
            tracing::debug!(token = %token.masked(), is_admin, "token issued");
            return Ok(token);
        }
        tracing::warn!(attempt, "generated secret collided with an existing token, retrying");
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not generate a unique token secret after {} attempts",
        MAX_ISSUE_ATTEMPTS
    )))
}

/// Metadata for every token. Secrets are stripped.
pub async fn list(store: &dyn Store) -> Result<Vec<TokenInfo>, AppError> {
    let tokens = store.list_tokens().await?;
    Ok(tokens.into_iter().map(TokenInfo::from).collect())
}

/// Delete `target` on behalf of `caller`. A caller can never revoke the
/// secret it is authenticated with.
pub async fn revoke(store: &dyn Store, caller: &Token, target: &str) -> Result<(), AppError> {
    if target == caller.secret {
        return Err(AppError::SelfRevoke);
    }

    if store.delete_token(target).await? {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;

    #[test]
    fn test_generated_secret_shape() {
        let secret = generate_secret();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(secret.len(), 43);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generated_secrets_differ() {
        let secrets: HashSet<String> = (0..1000).map(|_| generate_secret()).collect();
        assert_eq!(secrets.len(), 1000);
    }

    #[tokio::test]
    async fn test_issue_starts_unused() {
        let store = MemoryStore::new();
        let token = issue(&store, false, Some("svc-A".into())).await.unwrap();
        assert_eq!(token.usage_count, 0);
        assert!(token.last_used_at.is_none());
        assert!(!token.is_admin);

        let stored = store.find_token(&token.secret).await.unwrap().unwrap();
        assert_eq!(stored, token);
    }

    #[tokio::test]
    async fn test_issue_retries_on_collision() {
        let store = MemoryStore::new();
        store
            .insert_token(&Token::new("taken".into(), false, None))
            .await
            .unwrap();

        let mut candidates = vec!["fresh".to_string(), "taken".to_string()];
        let token = issue_with(&store, true, None, || candidates.pop().unwrap())
            .await
            .unwrap();
        assert_eq!(token.secret, "fresh");
    }

    #[tokio::test]
    async fn test_issue_gives_up_after_repeated_collisions() {
        let store = MemoryStore::new();
        store
            .insert_token(&Token::new("taken".into(), false, None))
            .await
            .unwrap();

        let err = issue_with(&store, false, None, || "taken".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_revoke_rules() {
        let store = MemoryStore::new();
        let admin = issue(&store, true, None).await.unwrap();
        let other = issue(&store, false, None).await.unwrap();

        assert!(matches!(
            revoke(&store, &admin, &admin.secret).await,
            Err(AppError::SelfRevoke)
        ));
        assert!(revoke(&store, &admin, &other.secret).await.is_ok());
        assert!(matches!(
            revoke(&store, &admin, &other.secret).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            revoke(&store, &admin, "never-existed").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_strips_secrets() {
        let store = MemoryStore::new();
        let token = issue(&store, false, None).await.unwrap();
        let listed = list(&store).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, token.id);
        let json = serde_json::to_string(&listed).unwrap();
        assert!(!json.contains(&token.secret));
    }
}
