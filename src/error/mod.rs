//! OAuth2 Error Types
//!
//! Error hierarchy for the OAuth2 session.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the OAuth2 session.
#[derive(Error, Debug)]
pub enum OAuth2Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Insecure transport: {url} does not use https")]
    InsecureTransport { url: String },

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl OAuth2Error {
    /// Get error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "OAUTH2_CONFIG",
            Self::InsecureTransport { .. } => "OAUTH2_INSECURE_TRANSPORT",
            Self::Authorization(_) => "OAUTH2_AUTH",
            Self::Token(_) => "OAUTH2_TOKEN",
            Self::Network(_) => "OAUTH2_NETWORK",
            Self::Protocol(_) => "OAUTH2_PROTOCOL",
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Token endpoint error code, if this is a protocol error from the provider.
    pub fn oauth_error(&self) -> Option<&str> {
        match self {
            Self::Token(e) => Some(e.error.as_str()),
            Self::Authorization(AuthorizationError::Rejected { error, .. }) => Some(error.as_str()),
            _ => None,
        }
    }
}

/// Configuration and local usage error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Unknown compliance hook phase: {phase}")]
    UnknownHookPhase { phase: String },

    #[error("Hook does not fit phase {phase}")]
    HookShapeMismatch { phase: String },

    #[error("Invalid token placement: {placement}")]
    InvalidTokenPlacement { placement: String },

    #[error("Unsupported token type: {token_type}")]
    UnsupportedTokenType { token_type: String },

    #[error("Username was supplied, but not password")]
    MissingPassword,

    #[error("{operation} is not supported")]
    Unsupported { operation: String },

    #[error("Environment error: {message}")]
    Environment { message: String },
}

/// Authorization redirect error.
#[derive(Error, Debug)]
pub enum AuthorizationError {
    #[error("State parameter mismatch (possible CSRF attack)")]
    StateMismatch {
        expected: String,
        received: Option<String>,
    },

    #[error("Missing authorization code in redirect response")]
    MissingCode,

    #[error("Authorization rejected: {error}")]
    Rejected {
        error: String,
        error_description: Option<String>,
        error_uri: Option<String>,
    },
}

/// Error returned by the token endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} (HTTP {status_code}){}", describe(.description))]
pub struct TokenError {
    /// OAuth2 error code, e.g. `invalid_grant`.
    pub error: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Error documentation URI.
    pub uri: Option<String>,
    /// State echoed by the provider.
    pub state: Option<String>,
    /// HTTP status of the failed response.
    pub status_code: u16,
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("TLS error: {message}")]
    TlsError { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::TlsError { .. })
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON (HTTP {status}): {message}")]
    InvalidJson { status: u16, message: String },
}

/// Result type for OAuth2 operations.
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// Map an `error` parameter from the authorization redirect to an error.
pub fn map_authorization_error(
    error: String,
    error_description: Option<String>,
    error_uri: Option<String>,
) -> AuthorizationError {
    AuthorizationError::Rejected {
        error,
        error_description,
        error_uri,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(OAuth2Error::Network(NetworkError::Timeout {
            timeout: Duration::from_secs(30)
        })
        .is_retryable());
        assert!(!OAuth2Error::Network(NetworkError::TlsError {
            message: "bad cert".to_string()
        })
        .is_retryable());
        assert!(!OAuth2Error::InsecureTransport {
            url: "http://example.com".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_token_error_display() {
        let error = TokenError {
            error: "invalid_grant".to_string(),
            description: Some("Code expired".to_string()),
            uri: None,
            state: None,
            status_code: 400,
        };
        assert_eq!(error.to_string(), "invalid_grant (HTTP 400): Code expired");

        let bare = TokenError {
            description: None,
            ..error
        };
        assert_eq!(bare.to_string(), "invalid_grant (HTTP 400)");
    }

    #[test]
    fn test_oauth_error_code() {
        let error = OAuth2Error::Token(TokenError {
            error: "invalid_client".to_string(),
            description: None,
            uri: None,
            state: None,
            status_code: 401,
        });
        assert_eq!(error.oauth_error(), Some("invalid_client"));
        assert_eq!(error.error_code(), "OAUTH2_TOKEN");

        let error = OAuth2Error::Authorization(AuthorizationError::MissingCode);
        assert_eq!(error.oauth_error(), None);
    }
}
