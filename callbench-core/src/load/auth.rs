use std::time::Duration;

use bytes::Bytes;
use callbench_http::{HttpClient, HttpRequest};

/// Fallback token fields, tried after the configured one.
const TOKEN_FIELDS: &[&str] = &["token", "accessToken", "access_token"];

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("login request failed: {0}")]
    Transport(#[from] callbench_http::Error),

    #[error("login rejected with HTTP {status}")]
    Rejected { status: u16 },

    #[error("login response is not valid json: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("login response has no `{0}` field")]
    MissingToken(String),

    #[error("failed to encode login request: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Bearer token obtained once before the first tier and shared read-only afterwards.
#[derive(Clone)]
pub struct AuthSession {
    token: String,
}

impl AuthSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .finish()
    }
}

pub async fn authenticate(
    client: &HttpClient,
    login_url: &str,
    credentials: &Credentials,
    token_field: &str,
    timeout: Option<Duration>,
) -> Result<AuthSession, AuthError> {
    let body = serde_json::to_vec(&serde_json::json!({
        "username": credentials.username,
        "password": credentials.password,
    }))
    .map_err(AuthError::Encode)?;

    let req =
        HttpRequest::post_json(login_url.to_string(), Bytes::from(body)).with_timeout(timeout);
    let res = client.request(req).await?;
    if !res.is_success() {
        return Err(AuthError::Rejected { status: res.status });
    }

    let json: serde_json::Value =
        serde_json::from_slice(&res.body).map_err(AuthError::InvalidBody)?;

    extract_token(&json, token_field)
        .map(AuthSession::new)
        .ok_or_else(|| AuthError::MissingToken(token_field.to_string()))
}

/// Looks the token up at the top level, then under a `data` envelope.
fn extract_token(json: &serde_json::Value, token_field: &str) -> Option<String> {
    let scopes = [Some(json), json.get("data")];
    for scope in scopes.into_iter().flatten() {
        let found = std::iter::once(token_field)
            .chain(TOKEN_FIELDS.iter().copied())
            .find_map(|field| scope.get(field).and_then(|v| v.as_str()))
            .filter(|t| !t.is_empty());
        if let Some(token) = found {
            return Some(token.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_is_found_in_configured_field_first() {
        let body = json!({"jwt": "a", "token": "b"});
        assert_eq!(extract_token(&body, "jwt").as_deref(), Some("a"));
    }

    #[test]
    fn token_falls_back_to_common_fields_and_data_envelope() {
        assert_eq!(
            extract_token(&json!({"access_token": "x"}), "token").as_deref(),
            Some("x")
        );
        assert_eq!(
            extract_token(&json!({"data": {"accessToken": "y"}}), "token").as_deref(),
            Some("y")
        );
    }

    #[test]
    fn empty_or_missing_token_is_none() {
        assert_eq!(extract_token(&json!({"token": ""}), "token"), None);
        assert_eq!(extract_token(&json!({"user": "bob"}), "token"), None);
        assert_eq!(extract_token(&json!([1, 2]), "token"), None);
    }

    #[test]
    fn session_debug_redacts_token() {
        let s = AuthSession::new("secret-token");
        assert!(!format!("{s:?}").contains("secret-token"));
    }
}
