//! Authorization Types
//!
//! Per-call parameter and result types for the OAuth2 session.

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::HttpMethod;

/// Result of authorization URL generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationUrl {
    /// The authorization URL to redirect user to.
    pub url: String,
    /// State parameter for CSRF validation. The caller must keep it.
    pub state: String,
}

/// HTTP Basic credentials.
#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    /// `Authorization` header value.
    pub fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password.expose_secret());
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token exchange parameters.
#[derive(Clone, Debug)]
pub struct FetchTokenParams {
    /// Token endpoint URL.
    pub url: Option<String>,
    /// Authorization code.
    pub code: Option<String>,
    /// Full redirect URL received from the provider.
    pub authorization_response: Option<String>,
    /// Form-encoded body seed.
    pub body: String,
    /// Explicit HTTP auth, overriding client and user credentials.
    pub auth: Option<BasicAuth>,
    /// Resource owner username.
    pub username: Option<String>,
    /// Resource owner password.
    pub password: Option<SecretString>,
    /// HTTP method; anything but POST sends parameters in the query.
    pub method: HttpMethod,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Request headers, replacing the defaults.
    pub headers: Option<HashMap<String, String>>,
    /// Verify the server's TLS certificate.
    pub verify: bool,
    /// Proxy URL.
    pub proxy: Option<String>,
    /// Extra token request parameters.
    pub extra_params: Vec<(String, String)>,
}

impl Default for FetchTokenParams {
    fn default() -> Self {
        Self {
            url: None,
            code: None,
            authorization_response: None,
            body: String::new(),
            auth: None,
            username: None,
            password: None,
            method: HttpMethod::Post,
            timeout: None,
            headers: None,
            verify: true,
            proxy: None,
            extra_params: Vec::new(),
        }
    }
}

impl FetchTokenParams {
    /// Parameters for a token endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the authorization code.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the redirect URL to extract the code from.
    pub fn authorization_response(mut self, response: impl Into<String>) -> Self {
        self.authorization_response = Some(response.into());
        self
    }

    /// Set the body seed.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set explicit HTTP Basic auth.
    pub fn auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set resource owner credentials used for Basic auth.
    pub fn user_credentials(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password.map(SecretString::new);
        self
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the default headers.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Enable or disable TLS verification.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Route the request through a proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Add an extra token request parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    pub(crate) fn extra_param(&self, key: &str) -> Option<&str> {
        self.extra_params
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Options for a protected request.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Request body.
    pub data: Option<String>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Send the request without the stored token.
    pub withhold_token: bool,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request body.
    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Do not attach the stored token.
    pub fn withhold_token(mut self) -> Self {
        self.withhold_token = true;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The parts of a protected request that tokens and hooks may rewrite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParts {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl RequestParts {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}
