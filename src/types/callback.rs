//! Callback Types
//!
//! Types for handling the provider's authorization redirect.

use url::Url;

/// Raw parameters from an authorization redirect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code (if success).
    pub code: Option<String>,
    /// State parameter.
    pub state: Option<String>,
    /// Error code (if authorization failed).
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
    /// Error URI.
    pub error_uri: Option<String>,
    /// Every parameter, in order of appearance.
    pub params: Vec<(String, String)>,
}

impl CallbackParams {
    /// Collect callback parameters from key/value pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut callback = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "code" => callback.code = Some(value.clone()),
                "state" => callback.state = Some(value.clone()),
                "error" => callback.error = Some(value.clone()),
                "error_description" => callback.error_description = Some(value.clone()),
                "error_uri" => callback.error_uri = Some(value.clone()),
                _ => {}
            }
            callback.params.push((key, value));
        }

        callback
    }

    /// Parse callback parameters from the URL query.
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs().into_owned())
    }

    /// Parse callback parameters from a URL string.
    pub fn from_url_str(url_str: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url_str)?;
        Ok(Self::from_url(&url))
    }

    /// Check if callback contains an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Check if callback is successful.
    pub fn is_success(&self) -> bool {
        self.code.is_some() && self.error.is_none()
    }
}

/// A validated authorization-code redirect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// Authorization code to exchange.
    pub code: String,
    /// State returned by the provider.
    pub state: Option<String>,
    /// Every parameter from the redirect.
    pub params: Vec<(String, String)>,
}
