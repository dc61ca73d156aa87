//! Bearer Tokens
//!
//! RFC 6750 bearer token attachment.

use secrecy::{ExposeSecret, SecretString};

use crate::core::{add_params_to_uri, merge_params, url_decode, url_encode};
use crate::error::OAuth2Result;
use crate::types::{RequestParts, TokenPlacement};

/// Name of the query/body parameter carrying the token.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// A bearer access token.
#[derive(Clone)]
pub struct BearerToken {
    access_token: SecretString,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
        }
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    /// Return `parts` with the token embedded according to `placement`.
    pub fn add_token(
        &self,
        parts: RequestParts,
        placement: TokenPlacement,
    ) -> OAuth2Result<RequestParts> {
        match placement {
            TokenPlacement::Headers => Ok(self.add_to_headers(parts)),
            TokenPlacement::Query => self.add_to_uri(parts),
            TokenPlacement::Body => Ok(self.add_to_body(parts)),
        }
    }

    fn add_to_headers(&self, mut parts: RequestParts) -> RequestParts {
        parts
            .headers
            .retain(|name, _| !name.eq_ignore_ascii_case("authorization"));
        parts
            .headers
            .insert("Authorization".to_string(), self.authorization_header());
        parts
    }

    fn add_to_uri(&self, mut parts: RequestParts) -> OAuth2Result<RequestParts> {
        parts.url = add_params_to_uri(&parts.url, [self.param()])?;
        Ok(parts)
    }

    fn add_to_body(&self, mut parts: RequestParts) -> RequestParts {
        let existing = parts.body.as_deref().map(url_decode).unwrap_or_default();
        let merged = merge_params(existing, [self.param()]);
        parts.body = Some(url_encode(&merged));
        parts
    }

    fn param(&self) -> (String, String) {
        (
            ACCESS_TOKEN_PARAM.to_string(),
            self.access_token.expose_secret().clone(),
        )
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
