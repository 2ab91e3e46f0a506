//! HTTP bindings for the authentication endpoints.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use labtrack_auth::Role;
use labtrack_session::TokenStore;

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Client for the labtrack backend.
///
/// Every request except login/signup carries `Authorization: Bearer <token>`
/// when the token store holds one.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl core::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange credentials for a token. Does not touch the session.
    pub async fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: extract_message(&body).unwrap_or_else(|| "Invalid credentials".to_string()),
            });
        }

        let body: LoginResponse = resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))?;
        tracing::debug!(username = %credentials.username, "login accepted by backend");
        Ok(body.token)
    }

    /// Register an account. Returns the backend's confirmation message.
    pub async fn signup(&self, request: &SignupRequest) -> Result<String, ApiError> {
        let resp = self
            .http
            .post(self.url("/auth/signup"))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: extract_message(&body).unwrap_or_else(|| "Registration failed".to_string()),
            });
        }

        Ok(extract_message(&body).unwrap_or_else(|| "Registration successful".to_string()))
    }

    /// Authenticated GET returning JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let mut req = self.http.get(self.url(path));
        match self.store.read() {
            Ok(Some(token)) => req = req.bearer_auth(token),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "token storage unreadable; sending request without credentials"),
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: extract_message(&body).unwrap_or(body),
            });
        }

        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Human-readable message from a response body.
///
/// Accepts a JSON string, a JSON object with a `message` field, or plain text.
fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(s)) => Some(s),
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned),
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrack_session::InMemoryTokenStore;

    #[test]
    fn messages_are_read_from_strings_objects_and_text() {
        assert_eq!(extract_message("\"User registered successfully\"").as_deref(), Some("User registered successfully"));
        assert_eq!(extract_message(r#"{"message":"Bad credentials"}"#).as_deref(), Some("Bad credentials"));
        assert_eq!(extract_message("User registered successfully").as_deref(), Some("User registered successfully"));
        assert_eq!(extract_message(r#"{"error":"x"}"#), None);
        assert_eq!(extract_message("   "), None);
    }

    #[test]
    fn urls_are_joined_with_a_single_slash() {
        let client = ApiClient::new("http://localhost:8080/", Arc::new(InMemoryTokenStore::new()));
        assert_eq!(client.url("/auth/login"), "http://localhost:8080/auth/login");
        assert_eq!(client.url("projects"), "http://localhost:8080/projects");
    }

    #[test]
    fn signup_role_serializes_as_claim_string() {
        let req = SignupRequest {
            username: "u".into(),
            password: "p".into(),
            role: Role::Pi,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["role"], "PI");
    }
}
