//! Configuration Types
//!
//! OAuth2 session configuration types.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

/// OAuth2 session configuration.
#[derive(Clone)]
pub struct SessionConfig {
    /// Client identifier.
    pub client_id: Option<String>,
    /// Client secret (for confidential clients).
    pub client_secret: Option<SecretString>,
    /// Redirect URI registered as callback.
    pub redirect_uri: Option<String>,
    /// Scopes to request.
    pub scope: Option<Vec<String>>,
    /// CSRF state expected back from the authorization redirect.
    pub state: Option<String>,
    /// Token endpoint used for refreshing.
    pub auto_refresh_url: Option<String>,
    /// Extra parameters sent when refreshing.
    pub auto_refresh_params: Vec<(String, String)>,
    /// Where access tokens are placed on protected requests.
    pub token_placement: TokenPlacement,
    /// Allow token endpoints without https.
    pub allow_insecure_transport: bool,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scope: None,
            state: None,
            auto_refresh_url: None,
            auto_refresh_params: Vec::new(),
            token_placement: TokenPlacement::default(),
            allow_insecure_transport: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("state", &self.state)
            .field("auto_refresh_url", &self.auto_refresh_url)
            .field("token_placement", &self.token_placement)
            .field("allow_insecure_transport", &self.allow_insecure_transport)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where an access token is embedded in a protected request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPlacement {
    /// `Authorization` header.
    #[default]
    Headers,
    /// `access_token` query parameter.
    Query,
    /// `access_token` form body parameter.
    Body,
}

impl TokenPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Headers => "headers",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl FromStr for TokenPlacement {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "headers" | "header" => Ok(Self::Headers),
            "query" | "uri" | "url" => Ok(Self::Query),
            "body" => Ok(Self::Body),
            _ => Err(ConfigurationError::InvalidTokenPlacement {
                placement: s.to_string(),
            }),
        }
    }
}

/// Grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
        }
    }
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
