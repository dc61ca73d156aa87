//! Grant Builders
//!
//! RFC 6749 client-side message construction: authorization URIs, token
//! request bodies and authorization-response parsing.

use url::form_urlencoded;
use url::Url;

use crate::error::{
    map_authorization_error, AuthorizationError, ConfigurationError, OAuth2Error, OAuth2Result,
    ProtocolError,
};
use crate::types::{AuthorizationResponse, CallbackParams, GrantType};

/// Parameters of an authorization request URI.
#[derive(Clone, Debug, Default)]
pub struct GrantUriParams<'a> {
    /// `response_type`, e.g. `code`.
    pub response_type: &'a str,
    /// Client identifier.
    pub client_id: Option<&'a str>,
    /// Redirect URI registered with the provider.
    pub redirect_uri: Option<&'a str>,
    /// Requested scopes.
    pub scope: Option<&'a [String]>,
    /// CSRF state.
    pub state: Option<&'a str>,
}

/// Decode a form-encoded string into ordered key/value pairs.
pub fn url_decode(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Encode key/value pairs as `application/x-www-form-urlencoded`.
pub fn url_encode<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish()
}

/// Join scopes into the space-delimited wire form.
pub fn list_to_scope(scope: &[String]) -> String {
    scope.join(" ")
}

/// Merge `params` into `base`.
///
/// A key already present in `base` takes the new value in place; new keys are
/// appended. Params with empty values are skipped.
pub fn merge_params<I>(mut base: Vec<(String, String)>, params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        match base.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => base.push((key, value)),
        }
    }
    base
}

/// Add parameters to the query of `uri`, keeping any existing ones.
pub fn add_params_to_uri<I>(uri: &str, params: I) -> OAuth2Result<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut url = Url::parse(uri).map_err(|_| {
        OAuth2Error::Configuration(ConfigurationError::InvalidEndpoint {
            url: uri.to_string(),
        })
    })?;

    let existing: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let merged = merge_params(existing, params);

    if merged.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(merged);
    }

    Ok(url.into())
}

/// Build the authorization request URI (RFC 6749 section 4.1.1).
///
/// Extra parameters override the standard ones when they share a name.
pub fn prepare_grant_uri(
    uri: &str,
    grant: &GrantUriParams<'_>,
    extra: &[(String, String)],
) -> OAuth2Result<String> {
    let mut params = vec![("response_type".to_string(), grant.response_type.to_string())];

    let optional = [
        ("client_id", grant.client_id.map(str::to_string)),
        ("redirect_uri", grant.redirect_uri.map(str::to_string)),
        ("scope", grant.scope.map(list_to_scope)),
        ("state", grant.state.map(str::to_string)),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            params.push((key.to_string(), value));
        }
    }
    params.extend(extra.iter().cloned());

    add_params_to_uri(uri, params)
}

/// Build a token request body (RFC 6749 section 4.1.3).
///
/// `body` seeds the request; `grant_type` and `params` override seed values
/// with the same key.
pub fn prepare_token_request<I>(grant_type: GrantType, body: &str, params: I) -> String
where
    I: IntoIterator<Item = (String, String)>,
{
    let explicit = std::iter::once(("grant_type".to_string(), grant_type.as_str().to_string()))
        .chain(params);
    let merged = merge_params(url_decode(body), explicit);
    url_encode(&merged)
}

/// Parse and validate an authorization-code redirect (RFC 6749 section 4.1.2).
///
/// When `state` is given the redirect must carry the same value; this is
/// checked before anything else in the redirect.
pub fn parse_authorization_code_response(
    uri: &str,
    state: Option<&str>,
) -> OAuth2Result<AuthorizationResponse> {
    let callback = CallbackParams::from_url_str(uri).map_err(|e| {
        OAuth2Error::Protocol(ProtocolError::InvalidResponse {
            message: format!("invalid authorization response URL: {}", e),
        })
    })?;

    if let Some(expected) = state {
        if callback.state.as_deref() != Some(expected) {
            return Err(OAuth2Error::Authorization(AuthorizationError::StateMismatch {
                expected: expected.to_string(),
                received: callback.state,
            }));
        }
    }

    if let Some(error) = callback.error {
        return Err(OAuth2Error::Authorization(map_authorization_error(
            error,
            callback.error_description,
            callback.error_uri,
        )));
    }

    let code = callback
        .code
        .ok_or(OAuth2Error::Authorization(AuthorizationError::MissingCode))?;

    Ok(AuthorizationResponse {
        code,
        state: callback.state,
        params: callback.params,
    })
}
