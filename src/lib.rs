//! OAuth2 Client Session
//!
//! OAuth 2.0 client session for the authorization code grant.
//!
//! # Features
//!
//! - Authorization URL construction with CSRF state (RFC 6749 Section 4.1.1)
//! - Authorization code exchange (RFC 6749 Section 4.1.3)
//! - Bearer token attachment to protected requests (RFC 6750)
//! - Compliance hooks for non-conforming providers
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth2_session::{session_config, FetchTokenParams, OAuth2Session, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = session_config()
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .redirect_uri("https://myapp.com/callback")
//!         .add_scope("profile")
//!         .build()?;
//!
//!     let mut session = OAuth2Session::new(config)?;
//!
//!     let auth_url = session.authorization_url("https://provider.com/authorize", None, &[])?;
//!     println!("Authorization URL: {}", auth_url.url);
//!     session.set_state(auth_url.state);
//!
//!     // After the user is redirected back:
//!     let token = session
//!         .fetch_access_token(
//!             FetchTokenParams::new("https://provider.com/token")
//!                 .authorization_response("https://myapp.com/callback?code=abc&state=..."),
//!         )
//!         .await?;
//!     session.set_token(token);
//!
//!     let response = session
//!         .get("https://api.provider.com/me", RequestOptions::new())
//!         .await?;
//!     println!("{}", response.body);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: session configuration, token and per-call parameter types
//! - `error`: error hierarchy
//! - `core`: HTTP transport, RFC 6749 message builders and transport security
//! - `token`: token attachment by token type
//! - `compliance`: hook registry for request/response tweaking
//! - `builders`: fluent configuration builder
//! - `session`: the session combining all of the above

pub mod builders;
pub mod compliance;
pub mod core;
pub mod error;
pub mod session;
pub mod token;
pub mod types;

// Re-export main session
pub use session::{
    default_token_headers, parse_token_response, OAuth2Session, TokenUpdater, FORM_CONTENT_TYPE,
};

// Re-export builders
pub use builders::{session_config, SessionConfigBuilder};

// Re-export errors
pub use error::{
    map_authorization_error, AuthorizationError, ConfigurationError, NetworkError, OAuth2Error,
    OAuth2Result, ProtocolError, TokenError,
};

// Re-export types
pub use types::{
    AuthorizationResponse, AuthorizationUrl, BasicAuth, CallbackParams, FetchTokenParams,
    GrantType, OAuth2Token, RequestOptions, RequestParts, SessionConfig, TokenPlacement,
};

// Re-export core components
pub use crate::core::{
    create_mock_transport, create_transport, generate_token, is_secure_transport, HttpMethod,
    HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export compliance hooks
pub use compliance::{ComplianceHook, ComplianceHooks, HookPhase, RequestHook, ResponseHook};

// Re-export token attachment
pub use token::{AttachableToken, BearerToken};
