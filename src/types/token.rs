//! Token Types
//!
//! OAuth2 token as returned by the token endpoint.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{OAuth2Error, ProtocolError};

/// OAuth2 token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth2Token {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_in: Option<i64>,
    /// Expiry as a unix timestamp in seconds.
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<i64>,
    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl OAuth2Token {
    /// Create a token with no expiry or refresh token.
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            refresh_token: None,
            expires_in: None,
            expires_at: None,
            scope: None,
            extra: HashMap::new(),
        }
    }

    /// Build a token from a token endpoint JSON object.
    ///
    /// `expires_at` is derived from `expires_in` when the provider did not
    /// send it.
    pub fn from_json(params: Map<String, Value>) -> Result<Self, OAuth2Error> {
        for field in ["access_token", "token_type"] {
            if !params.get(field).is_some_and(Value::is_string) {
                return Err(OAuth2Error::Protocol(ProtocolError::MissingField {
                    field: field.to_string(),
                }));
            }
        }

        let mut token: Self = serde_json::from_value(Value::Object(params)).map_err(|e| {
            OAuth2Error::Protocol(ProtocolError::InvalidResponse {
                message: e.to_string(),
            })
        })?;

        if token.expires_at.is_none() {
            token.expires_at = token
                .expires_in
                .and_then(|secs| Utc::now().timestamp().checked_add(secs));
        }

        Ok(token)
    }

    /// Check if token is expired. Tokens without expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| exp <= Utc::now().timestamp())
            .unwrap_or(false)
    }

    /// Granted scopes as a list.
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }
}

/// Seconds given as a JSON number or a numeric string. Anything else is
/// treated as absent.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl std::fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}
