//! OAuth2 Session
//!
//! Client session that obtains tokens from an authorization server and
//! attaches them to protected requests.

use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::compliance::{ComplianceHook, ComplianceHooks, HookPhase};
use crate::core::{
    add_params_to_uri, generate_token, is_secure_transport, parse_authorization_code_response,
    prepare_grant_uri, prepare_token_request, url_decode, url_encode, GrantUriParams, HttpMethod,
    HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport, DEFAULT_MAX_RESPONSE_SIZE,
};
use crate::error::{ConfigurationError, OAuth2Error, OAuth2Result, ProtocolError, TokenError};
use crate::token::AttachableToken;
use crate::types::{
    AuthorizationUrl, BasicAuth, FetchTokenParams, GrantType, OAuth2Token, RequestOptions,
    RequestParts, SessionConfig, TokenPlacement,
};

/// Callback invoked with a renewed token.
pub type TokenUpdater = Arc<dyn Fn(&OAuth2Token) + Send + Sync>;

/// Content type of form-encoded token request bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Headers sent to the token endpoint unless the caller supplies their own.
pub fn default_token_headers() -> HashMap<String, String> {
    [
        ("Accept", "application/json"),
        (
            "Content-Type",
            "application/x-www-form-urlencoded;charset=UTF-8",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// OAuth2 client session.
///
/// The session owns its transport and, optionally, the current token. It
/// never stores a fetched token on its own: assign it with
/// [`OAuth2Session::set_token`] once the exchange succeeds.
pub struct OAuth2Session<T: HttpTransport = ReqwestHttpTransport> {
    config: SessionConfig,
    token: Option<OAuth2Token>,
    token_updater: Option<TokenUpdater>,
    compliance_hooks: ComplianceHooks,
    transport: Arc<T>,
}

impl OAuth2Session<ReqwestHttpTransport> {
    /// Create a session backed by a reqwest transport.
    pub fn new(config: SessionConfig) -> OAuth2Result<Self> {
        let transport =
            ReqwestHttpTransport::with_options(config.timeout, DEFAULT_MAX_RESPONSE_SIZE)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: HttpTransport> OAuth2Session<T> {
    /// Create a session with a custom transport.
    pub fn with_transport(config: SessionConfig, transport: T) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    /// Create a session sharing an existing transport.
    pub fn with_shared_transport(config: SessionConfig, transport: Arc<T>) -> Self {
        Self {
            config,
            token: None,
            token_updater: None,
            compliance_hooks: ComplianceHooks::new(),
            transport,
        }
    }

    /// Start with an existing token.
    pub fn with_token(mut self, token: OAuth2Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the callback invoked when a token is renewed.
    pub fn with_token_updater<F>(mut self, updater: F) -> Self
    where
        F: Fn(&OAuth2Token) + Send + Sync + 'static,
    {
        self.token_updater = Some(Arc::new(updater));
        self
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Get the current token.
    pub fn token(&self) -> Option<&OAuth2Token> {
        self.token.as_ref()
    }

    /// Replace the current token.
    pub fn set_token(&mut self, token: OAuth2Token) {
        self.token = Some(token);
    }

    /// Remove and return the current token.
    pub fn clear_token(&mut self) -> Option<OAuth2Token> {
        self.token.take()
    }

    /// Get the token-updater callback.
    pub fn token_updater(&self) -> Option<&TokenUpdater> {
        self.token_updater.as_ref()
    }

    /// CSRF state expected in the authorization redirect.
    pub fn state(&self) -> Option<&str> {
        self.config.state.as_deref()
    }

    /// Set the CSRF state expected in the authorization redirect.
    pub fn set_state(&mut self, state: impl Into<String>) {
        self.config.state = Some(state.into());
    }

    /// Set where tokens are placed on protected requests.
    pub fn set_token_placement(&mut self, placement: TokenPlacement) {
        self.config.token_placement = placement;
    }

    /// Get the compliance hook registry.
    pub fn compliance_hooks(&self) -> &ComplianceHooks {
        &self.compliance_hooks
    }

    /// Build the URL the user is redirected to for authorization.
    ///
    /// A random state is generated when `state` is `None`. The returned state
    /// is not stored on the session.
    pub fn authorization_url(
        &self,
        url: &str,
        state: Option<&str>,
        extra_params: &[(String, String)],
    ) -> OAuth2Result<AuthorizationUrl> {
        let state = state.map_or_else(generate_token, str::to_string);

        let grant = GrantUriParams {
            response_type: "code",
            client_id: self.config.client_id.as_deref(),
            redirect_uri: self.config.redirect_uri.as_deref(),
            scope: self.config.scope.as_deref(),
            state: Some(&state),
        };
        let uri = prepare_grant_uri(url, &grant, extra_params)?;

        debug!(endpoint = redact_url(url), "built authorization url");
        Ok(AuthorizationUrl { url: uri, state })
    }

    /// Exchange an authorization code for a token.
    pub async fn fetch_access_token(&self, params: FetchTokenParams) -> OAuth2Result<OAuth2Token> {
        let url = match (&params.url, &params.authorization_response) {
            (Some(url), _) => url.clone(),
            (None, Some(response)) => return self.token_from_fragment(response),
            (None, None) => {
                return Err(OAuth2Error::Configuration(ConfigurationError::MissingField {
                    field: "url".to_string(),
                }))
            }
        };

        self.ensure_secure_transport(&url)?;

        let code = match (&params.code, &params.authorization_response) {
            (Some(code), _) if !code.is_empty() => code.clone(),
            (_, Some(response)) => {
                parse_authorization_code_response(response, self.config.state.as_deref())?.code
            }
            _ => {
                return Err(OAuth2Error::Configuration(ConfigurationError::MissingField {
                    field: "code".to_string(),
                }))
            }
        };

        let (auth, client_auth) = self.resolve_auth(&params)?;

        let mut grant_params = vec![
            ("code".to_string(), code),
            (
                "redirect_uri".to_string(),
                self.config.redirect_uri.clone().unwrap_or_default(),
            ),
            (
                "client_id".to_string(),
                self.config.client_id.clone().unwrap_or_default(),
            ),
        ];
        grant_params.extend(
            params
                .extra_params
                .iter()
                .filter(|(key, _)| !(client_auth && key == "client_secret"))
                .cloned(),
        );
        let body = prepare_token_request(GrantType::AuthorizationCode, &params.body, grant_params);

        let mut headers = params.headers.clone().unwrap_or_else(default_token_headers);
        if let Some(auth) = &auth {
            headers.retain(|name, _| !name.eq_ignore_ascii_case("authorization"));
            headers.insert("Authorization".to_string(), auth.header_value());
        }

        let pairs = url_decode(&body);
        let mut request = HttpRequest::new(params.method, url.clone());
        if params.method == HttpMethod::Post {
            request.body = Some(url_encode(&pairs));
            if !headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case("content-type"))
            {
                headers.insert("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string());
            }
        } else {
            request.url = add_params_to_uri(&url, pairs)?;
        }
        request.headers = headers;
        request.timeout = Some(params.timeout.unwrap_or(self.config.timeout));
        request.verify = params.verify;
        request.proxy = params.proxy.clone();

        debug!(
            endpoint = redact_url(&url),
            method = %params.method,
            basic_auth = auth.is_some(),
            "requesting access token"
        );

        let response = self.transport.send(request).await?;
        if response.is_redirect() {
            warn!(status = response.status, "token endpoint answered with a redirect");
            return Err(OAuth2Error::Protocol(ProtocolError::UnexpectedRedirect {
                location: response.header("location").unwrap_or_default().to_string(),
            }));
        }
        let response = self.compliance_hooks.apply_access_token_response(response);

        parse_token_response(&response)
    }

    /// Alias for [`OAuth2Session::fetch_access_token`].
    pub async fn fetch_token(&self, params: FetchTokenParams) -> OAuth2Result<OAuth2Token> {
        self.fetch_access_token(params).await
    }

    /// Extract a token from an implicit-grant redirect fragment.
    ///
    /// The implicit grant is not supported.
    pub fn token_from_fragment(&self, _authorization_response: &str) -> OAuth2Result<OAuth2Token> {
        warn!("implicit grant requested but not supported");
        Err(OAuth2Error::Configuration(ConfigurationError::Unsupported {
            operation: "implicit grant (token_from_fragment)".to_string(),
        }))
    }

    /// Refresh the current token.
    ///
    /// Refreshing is not supported; the stored token is left untouched.
    pub async fn refresh_token(&mut self, _url: Option<&str>) -> OAuth2Result<OAuth2Token> {
        warn!("token refresh requested but not supported");
        Err(OAuth2Error::Configuration(ConfigurationError::Unsupported {
            operation: "refresh_token grant".to_string(),
        }))
    }

    /// Send a request, attaching the current token unless withheld.
    ///
    /// `protected_request` hooks run only when a token was attached. Redirect
    /// responses are returned as-is.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        options: RequestOptions,
    ) -> OAuth2Result<HttpResponse> {
        let RequestOptions {
            data,
            headers,
            withhold_token,
            timeout,
        } = options;

        let mut parts = RequestParts {
            url: url.to_string(),
            headers,
            body: data,
        };

        match &self.token {
            Some(token) if !withhold_token => {
                let attachable = AttachableToken::from_token(token)?;
                parts = attachable.add_token(parts, self.config.token_placement)?;
                parts = self.compliance_hooks.apply_protected_request(parts);
                debug!(
                    endpoint = redact_url(url),
                    method = %method,
                    placement = self.config.token_placement.as_str(),
                    "sending protected request"
                );
            }
            _ => debug!(endpoint = redact_url(url), method = %method, "sending request"),
        }

        let mut request = HttpRequest::new(method, parts.url);
        request.headers = parts.headers;
        request.body = parts.body;
        request.timeout = Some(timeout.unwrap_or(self.config.timeout));

        self.transport.send(request).await
    }

    /// Send a GET request.
    pub async fn get(&self, url: &str, options: RequestOptions) -> OAuth2Result<HttpResponse> {
        self.request(HttpMethod::Get, url, options).await
    }

    /// Send a POST request.
    pub async fn post(&self, url: &str, options: RequestOptions) -> OAuth2Result<HttpResponse> {
        self.request(HttpMethod::Post, url, options).await
    }

    /// Send a PUT request.
    pub async fn put(&self, url: &str, options: RequestOptions) -> OAuth2Result<HttpResponse> {
        self.request(HttpMethod::Put, url, options).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, url: &str, options: RequestOptions) -> OAuth2Result<HttpResponse> {
        self.request(HttpMethod::Delete, url, options).await
    }

    /// Register a hook for request/response tweaking.
    ///
    /// Phases are `access_token_response`, `refresh_token_response` and
    /// `protected_request`. An unknown phase leaves the registry unchanged.
    pub fn register_compliance_hook(
        &mut self,
        phase: &str,
        hook: ComplianceHook,
    ) -> OAuth2Result<()> {
        let phase: HookPhase = phase.parse()?;
        let added = self.compliance_hooks.register(phase, hook)?;
        debug!(phase = phase.as_str(), added, "registered compliance hook");
        Ok(())
    }

    fn ensure_secure_transport(&self, url: &str) -> OAuth2Result<()> {
        if self.config.allow_insecure_transport || is_secure_transport(url) {
            return Ok(());
        }
        warn!(endpoint = redact_url(url), "refusing insecure token endpoint");
        Err(OAuth2Error::InsecureTransport {
            url: url.to_string(),
        })
    }

    /// Pick HTTP auth for the token request.
    ///
    /// Returns the auth and whether it was built from client credentials.
    fn resolve_auth(&self, params: &FetchTokenParams) -> OAuth2Result<(Option<BasicAuth>, bool)> {
        if let Some(auth) = &params.auth {
            return Ok((Some(auth.clone()), false));
        }

        let client_id = params
            .extra_param("client_id")
            .or(self.config.client_id.as_deref())
            .filter(|id| !id.is_empty());

        if let Some(client_id) = client_id {
            let secret = match params.extra_param("client_secret") {
                Some(secret) => secret.to_string(),
                None => self
                    .config
                    .client_secret
                    .as_ref()
                    .map(|secret| secret.expose_secret().clone())
                    .unwrap_or_default(),
            };
            return Ok((Some(BasicAuth::new(client_id, secret)), true));
        }

        if let Some(username) = &params.username {
            let password = params
                .password
                .clone()
                .ok_or(OAuth2Error::Configuration(ConfigurationError::MissingPassword))?;
            return Ok((
                Some(BasicAuth {
                    username: username.clone(),
                    password,
                }),
                false,
            ));
        }

        Ok((None, false))
    }
}

impl<T: HttpTransport> std::fmt::Debug for OAuth2Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Session")
            .field("config", &self.config)
            .field("token", &self.token)
            .field("token_updater", &self.token_updater.is_some())
            .field("compliance_hooks", &self.compliance_hooks)
            .finish()
    }
}

/// Parse a token endpoint response into a token or a [`TokenError`].
pub fn parse_token_response(response: &HttpResponse) -> OAuth2Result<OAuth2Token> {
    let value: Value = serde_json::from_str(&response.body).map_err(|e| {
        OAuth2Error::Protocol(ProtocolError::InvalidJson {
            status: response.status,
            message: e.to_string(),
        })
    })?;

    let Value::Object(params) = value else {
        return Err(OAuth2Error::Protocol(ProtocolError::InvalidResponse {
            message: format!("expected a JSON object (HTTP {})", response.status),
        }));
    };

    let Some(error) = params.get("error") else {
        return OAuth2Token::from_json(params);
    };

    let text = |key: &str| params.get(key).and_then(Value::as_str).map(String::from);
    let error = TokenError {
        error: error
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| error.to_string()),
        description: text("error_description").or_else(|| text("description")),
        uri: text("error_uri"),
        state: text("state"),
        status_code: response.status,
    };

    warn!(
        error = %error.error,
        status = error.status_code,
        "token endpoint returned an error"
    );
    Err(OAuth2Error::Token(error))
}

fn redact_url(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}
