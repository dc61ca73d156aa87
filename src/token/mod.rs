//! Token Attachment
//!
//! Selects how a stored token is attached to protected requests, based on its
//! `token_type`.

pub mod bearer;

pub use bearer::*;

use crate::error::{ConfigurationError, OAuth2Result};
use crate::types::{OAuth2Token, RequestParts, TokenPlacement};

/// A token ready to be attached to requests, tagged by token type.
#[derive(Clone, Debug)]
pub enum AttachableToken {
    Bearer(BearerToken),
}

impl AttachableToken {
    /// Select the attachment strategy for `token`.
    ///
    /// The token type is matched case-insensitively.
    pub fn from_token(token: &OAuth2Token) -> Result<Self, ConfigurationError> {
        match token.token_type.to_ascii_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer(BearerToken::new(token.access_token.clone()))),
            _ => Err(ConfigurationError::UnsupportedTokenType {
                token_type: token.token_type.clone(),
            }),
        }
    }

    /// Return `parts` with the token embedded according to `placement`.
    pub fn add_token(
        &self,
        parts: RequestParts,
        placement: TokenPlacement,
    ) -> OAuth2Result<RequestParts> {
        match self {
            Self::Bearer(token) => token.add_token(parts, placement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_is_case_insensitive() {
        for token_type in ["bearer", "Bearer", "BEARER"] {
            let token = OAuth2Token::new("abc", token_type);
            assert!(matches!(
                AttachableToken::from_token(&token),
                Ok(AttachableToken::Bearer(_))
            ));
        }
    }

    #[test]
    fn test_from_token_rejects_unknown_type() {
        let token = OAuth2Token::new("abc", "mac");
        match AttachableToken::from_token(&token) {
            Err(ConfigurationError::UnsupportedTokenType { token_type }) => {
                assert_eq!(token_type, "mac");
            }
            other => panic!("expected unsupported token type, got {:?}", other),
        }
    }

    #[test]
    fn test_add_token_dispatches_to_bearer() {
        let token = AttachableToken::from_token(&OAuth2Token::new("abc", "bearer")).unwrap();
        let parts = token
            .add_token(RequestParts::new("https://api.example"), TokenPlacement::Headers)
            .unwrap();
        assert_eq!(parts.headers.get("Authorization").unwrap(), "Bearer abc");
    }
}
