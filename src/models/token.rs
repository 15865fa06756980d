use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An issued bearer token.
///
/// The `secret` is the credential itself. It is serialized as `token` and is
/// only ever returned to a client once, in the create response.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Token {
    pub id: Uuid,
    #[serde(rename = "token")]
    pub secret: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastUsed")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(rename = "usageCount")]
    pub usage_count: i64,
}

impl Token {
    /// Fresh token with zero usage and no last-used timestamp.
    pub fn new(secret: String, is_admin: bool, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            secret,
            is_admin,
            description,
            created_at: Utc::now(),
            last_used_at: None,
            usage_count: 0,
        }
    }

    /// Short, log-safe identifier: first 8 characters of the secret.
    pub fn masked(&self) -> String {
        mask_secret(&self.secret)
    }
}

pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(8).collect();
    format!("{}…", prefix)
}

/// Token metadata as exposed by the list endpoint. Has no secret field at all,
/// so it cannot leak through serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub id: Uuid,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastUsed")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(rename = "usageCount")]
    pub usage_count: i64,
}

impl From<Token> for TokenInfo {
    fn from(t: Token) -> Self {
        Self {
            id: t.id,
            is_admin: t.is_admin,
            description: t.description,
            created_at: t.created_at,
            last_used_at: t.last_used_at,
            usage_count: t.usage_count,
        }
    }
}

/// Body of `POST /auth/tokens`.
#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_json_uses_wire_names() {
        let token = Token::new("s3cret-value".into(), true, Some("ops".into()));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token"], "s3cret-value");
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["usageCount"], 0);
        assert!(json["lastUsed"].is_null());
    }

    #[test]
    fn test_token_info_never_contains_secret() {
        let token = Token::new("do-not-leak-me".into(), false, None);
        let json = serde_json::to_string(&TokenInfo::from(token)).unwrap();
        assert!(!json.contains("do-not-leak-me"));
        assert!(!json.contains("\"token\""));
    }

    #[test]
    fn test_create_request_defaults_is_admin_false() {
        let req: CreateTokenRequest = serde_json::from_str(r#"{"description":"svc"}"#).unwrap();
        assert!(!req.is_admin);
        assert_eq!(req.description.as_deref(), Some("svc"));
    }

    #[test]
    fn test_mask_secret_handles_short_and_multibyte() {
        assert_eq!(mask_secret("abc"), "abc…");
        assert_eq!(mask_secret("abcdefghijkl"), "abcdefgh…");
        assert_eq!(mask_secret("ééééééééé"), "éééééééé…");
    }
}
