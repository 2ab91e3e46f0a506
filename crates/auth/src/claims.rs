use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use labtrack_core::ExpiryPolicy;

/// Claims read from a token's payload segment.
///
/// Every field is optional: the decoder checks structure, not content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the username).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Raw role string, unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Issued-at, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiry, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    fn from_payload(payload: &Map<String, Value>) -> Self {
        // Claims with an unexpected JSON type are treated as absent.
        Self {
            sub: payload.get("sub").and_then(Value::as_str).map(str::to_owned),
            role: payload.get("role").and_then(Value::as_str).map(str::to_owned),
            iat: payload.get("iat").and_then(numeric_seconds),
            exp: payload.get("exp").and_then(numeric_seconds),
        }
    }
}

fn numeric_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token must have three dot-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("token payload is not valid base64url: {0}")]
    InvalidBase64(String),

    #[error("token payload is not a JSON object: {0}")]
    InvalidPayload(String),
}

/// Decode a token's claims without verifying its signature.
///
/// Only the middle segment is read. Padding on the payload is tolerated.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;

    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| DecodeError::InvalidPayload(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(Claims::from_payload(&map)),
        other => Err(DecodeError::InvalidPayload(format!(
            "expected an object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,
}

/// Apply the configured expiry policy to decoded claims.
///
/// Under [`ExpiryPolicy::Ignore`] every token is accepted, including one whose
/// `exp` lies in the past. A token without an `exp` claim never expires.
pub fn validate_expiry(
    claims: &Claims,
    policy: ExpiryPolicy,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    let leeway_secs = match policy {
        ExpiryPolicy::Ignore => return Ok(()),
        ExpiryPolicy::Enforce { leeway_secs } => leeway_secs,
    };

    match claims.exp {
        Some(exp) if now.timestamp() >= exp.saturating_add(leeway_secs) => {
            Err(TokenValidationError::Expired)
        }
        _ => Ok(()),
    }
}
