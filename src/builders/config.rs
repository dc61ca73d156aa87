//! Configuration Builder
//!
//! Fluent builder for the OAuth2 session configuration.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::{ConfigurationError, OAuth2Error};
use crate::types::{SessionConfig, TokenPlacement};

/// Environment variable names read by [`SessionConfigBuilder::from_env`].
pub const ENV_CLIENT_ID: &str = "OAUTH2_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "OAUTH2_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "OAUTH2_REDIRECT_URI";
pub const ENV_SCOPE: &str = "OAUTH2_SCOPE";
pub const ENV_TOKEN_PLACEMENT: &str = "OAUTH2_TOKEN_PLACEMENT";
pub const ENV_INSECURE_TRANSPORT: &str = "OAUTH2_INSECURE_TRANSPORT";

/// OAuth2 session configuration builder.
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from environment variables.
    ///
    /// Unset variables leave the defaults in place.
    pub fn from_env() -> Result<Self, OAuth2Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Start from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OAuth2Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut builder = Self::new();

        if let Some(client_id) = var(ENV_CLIENT_ID) {
            builder = builder.client_id(client_id);
        }
        if let Some(secret) = var(ENV_CLIENT_SECRET) {
            builder = builder.client_secret(secret);
        }
        if let Some(redirect_uri) = var(ENV_REDIRECT_URI) {
            builder = builder.redirect_uri(redirect_uri);
        }
        if let Some(scope) = var(ENV_SCOPE) {
            builder = builder.scope(scope.split_whitespace().map(String::from).collect());
        }
        if let Some(placement) = var(ENV_TOKEN_PLACEMENT) {
            let placement = placement.parse::<TokenPlacement>()?;
            builder = builder.token_placement(placement);
        }
        if let Some(insecure) = var(ENV_INSECURE_TRANSPORT) {
            let allow = !matches!(insecure.to_ascii_lowercase().as_str(), "0" | "false");
            builder = builder.allow_insecure_transport(allow);
        }

        Ok(builder)
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.config.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set redirect URI.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.config.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Set requested scopes.
    pub fn scope(mut self, scope: Vec<String>) -> Self {
        self.config.scope = Some(scope);
        self
    }

    /// Add a requested scope.
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        self.config
            .scope
            .get_or_insert_with(Vec::new)
            .push(scope.into());
        self
    }

    /// Set the CSRF state expected back from the provider.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.config.state = Some(state.into());
        self
    }

    /// Set the refresh endpoint.
    pub fn auto_refresh_url(mut self, url: impl Into<String>) -> Self {
        self.config.auto_refresh_url = Some(url.into());
        self
    }

    /// Add an extra parameter sent when refreshing.
    pub fn auto_refresh_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .auto_refresh_params
            .push((key.into(), value.into()));
        self
    }

    /// Set where tokens are placed on protected requests.
    pub fn token_placement(mut self, placement: TokenPlacement) -> Self {
        self.config.token_placement = placement;
        self
    }

    /// Allow token endpoints without https (local development only).
    pub fn allow_insecure_transport(mut self, allow: bool) -> Self {
        self.config.allow_insecure_transport = allow;
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the session configuration.
    pub fn build(self) -> Result<SessionConfig, OAuth2Error> {
        for url in [&self.config.redirect_uri, &self.config.auto_refresh_url]
            .into_iter()
            .flatten()
        {
            if Url::parse(url).is_err() {
                return Err(OAuth2Error::Configuration(
                    ConfigurationError::InvalidEndpoint { url: url.clone() },
                ));
            }
        }

        Ok(self.config)
    }
}

impl SessionConfig {
    /// Load configuration from `OAUTH2_*` environment variables.
    pub fn from_env() -> Result<Self, OAuth2Error> {
        SessionConfigBuilder::from_env()?.build()
    }
}

/// Create a new session configuration builder.
pub fn session_config() -> SessionConfigBuilder {
    SessionConfigBuilder::new()
}
