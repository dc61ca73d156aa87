//! Integration tests for the OAuth2 session against a mock transport.

use oauth2_session::core::url_decode;
use oauth2_session::{
    session_config, AuthorizationError, BasicAuth, ComplianceHook, ConfigurationError,
    FetchTokenParams, HookPhase, HttpMethod, HttpResponse, MockHttpTransport, OAuth2Error,
    OAuth2Session, OAuth2Token, ProtocolError, RequestOptions, RequestParts, TokenPlacement,
};
use serde_json::json;

const TOKEN_URL: &str = "https://provider.example/token";
const AUTHORIZE_URL: &str = "https://provider.example/authorize";
const API_URL: &str = "https://api.example/resource";

fn session() -> OAuth2Session<MockHttpTransport> {
    let config = session_config()
        .client_id("client")
        .client_secret("secret")
        .redirect_uri("https://app.example/cb")
        .add_scope("read")
        .add_scope("write")
        .build()
        .unwrap();
    OAuth2Session::with_transport(config, MockHttpTransport::new())
}

fn session_with_token(token_type: &str) -> OAuth2Session<MockHttpTransport> {
    let session = session().with_token(OAuth2Token::new("tok", token_type));
    session
        .transport()
        .set_default_response(HttpResponse::json(200, &json!({"ok": true})));
    session
}

fn token_response() -> serde_json::Value {
    json!({
        "access_token": "access-123",
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-456",
        "scope": "read write"
    })
}

fn body_pairs(body: Option<&str>) -> Vec<(String, String)> {
    url_decode(body.unwrap_or_default())
}

fn pair<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[test]
fn test_authorization_url_generates_state() {
    // Arrange
    let session = session();

    // Act
    let auth_url = session.authorization_url(AUTHORIZE_URL, None, &[]).unwrap();

    // Assert
    assert_eq!(auth_url.state.len(), 43);
    let url = url::Url::parse(&auth_url.url).unwrap();
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pair(&query, "response_type"), Some("code"));
    assert_eq!(pair(&query, "client_id"), Some("client"));
    assert_eq!(pair(&query, "redirect_uri"), Some("https://app.example/cb"));
    assert_eq!(pair(&query, "scope"), Some("read write"));
    assert_eq!(pair(&query, "state"), Some(auth_url.state.as_str()));
    assert!(session.state().is_none());
}

#[test]
fn test_authorization_url_explicit_state_and_extras() {
    let session = session();

    let extras = vec![("prompt".to_string(), "consent".to_string())];
    let auth_url = session
        .authorization_url(AUTHORIZE_URL, Some("fixed-state"), &extras)
        .unwrap();

    assert_eq!(auth_url.state, "fixed-state");
    assert!(auth_url.url.contains("state=fixed-state"));
    assert!(auth_url.url.contains("prompt=consent"));
}

#[tokio::test]
async fn test_fetch_token_rejects_insecure_url() {
    // Arrange
    let session = session();
    session.transport().queue_json_response(200, &token_response());

    // Act
    let result = session
        .fetch_access_token(FetchTokenParams::new("http://provider.example/token").code("abc"))
        .await;

    // Assert
    assert!(matches!(result, Err(OAuth2Error::InsecureTransport { .. })));
    assert_eq!(session.transport().request_count(), 0);
}

#[tokio::test]
async fn test_fetch_token_https_check_is_case_insensitive() {
    let session = session();
    session.transport().queue_json_response(200, &token_response());

    let result = session
        .fetch_access_token(FetchTokenParams::new("HTTPS://provider.example/token").code("abc"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_fetch_token_allows_insecure_when_configured() {
    let config = session_config()
        .client_id("client")
        .allow_insecure_transport(true)
        .build()
        .unwrap();
    let session = OAuth2Session::with_transport(config, MockHttpTransport::new());
    session.transport().queue_json_response(200, &token_response());

    let token = session
        .fetch_access_token(FetchTokenParams::new("http://localhost:8080/token").code("abc"))
        .await
        .unwrap();

    assert_eq!(token.access_token, "access-123");
}

#[tokio::test]
async fn test_fetch_token_from_authorization_response() {
    // Arrange
    let mut session = session();
    session.set_state("s1");
    session.transport().queue_json_response(200, &token_response());

    // Act
    let token = session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .authorization_response("https://app.example/cb?code=abc&state=s1"),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(token.access_token, "access-123");
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-456"));
    assert_eq!(token.expires_in, Some(3600));
    assert!(token.expires_at.is_some());
    assert!(session.token().is_none());

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, TOKEN_URL);
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded;charset=UTF-8")
    );
    assert_eq!(
        request.header("authorization"),
        Some(BasicAuth::new("client", "secret").header_value().as_str())
    );

    let body = body_pairs(request.body.as_deref());
    assert_eq!(pair(&body, "grant_type"), Some("authorization_code"));
    assert_eq!(pair(&body, "code"), Some("abc"));
    assert_eq!(pair(&body, "redirect_uri"), Some("https://app.example/cb"));
    assert_eq!(pair(&body, "client_id"), Some("client"));
    assert_eq!(pair(&body, "client_secret"), None);
}

#[tokio::test]
async fn test_fetch_token_state_mismatch() {
    let mut session = session();
    session.set_state("s1");
    session.transport().queue_json_response(200, &token_response());

    let result = session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .authorization_response("https://app.example/cb?code=abc&state=evil"),
        )
        .await;

    match result {
        Err(OAuth2Error::Authorization(AuthorizationError::StateMismatch { expected, received })) => {
            assert_eq!(expected, "s1");
            assert_eq!(received.as_deref(), Some("evil"));
        }
        other => panic!("expected state mismatch, got {:?}", other),
    }
    assert_eq!(session.transport().request_count(), 0);
}

#[tokio::test]
async fn test_fetch_token_missing_code_is_distinct() {
    let mut session = session();
    session.set_state("s1");

    let result = session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL).authorization_response("https://app.example/cb?state=s1"),
        )
        .await;

    assert!(matches!(
        result,
        Err(OAuth2Error::Authorization(AuthorizationError::MissingCode))
    ));
    assert_eq!(session.transport().request_count(), 0);
}

#[tokio::test]
async fn test_fetch_token_provider_rejection_in_redirect() {
    let session = session();

    let result = session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .authorization_response("https://app.example/cb?error=access_denied"),
        )
        .await;

    assert_eq!(result.unwrap_err().oauth_error(), Some("access_denied"));
}

#[tokio::test]
async fn test_fetch_token_requires_url_and_code() {
    let session = session();

    let no_url = session.fetch_access_token(FetchTokenParams::default()).await;
    assert!(matches!(
        no_url,
        Err(OAuth2Error::Configuration(ConfigurationError::MissingField { ref field })) if field == "url"
    ));

    let no_code = session.fetch_access_token(FetchTokenParams::new(TOKEN_URL)).await;
    assert!(matches!(
        no_code,
        Err(OAuth2Error::Configuration(ConfigurationError::MissingField { ref field })) if field == "code"
    ));
}

#[tokio::test]
async fn test_fetch_token_without_url_uses_fragment_flow() {
    let session = session();

    let result = session
        .fetch_access_token(
            FetchTokenParams::default()
                .authorization_response("https://app.example/cb#access_token=x&token_type=bearer"),
        )
        .await;

    assert!(matches!(
        result,
        Err(OAuth2Error::Configuration(ConfigurationError::Unsupported { .. }))
    ));
}

#[tokio::test]
async fn test_fetch_token_error_response() {
    // Arrange
    let session = session();
    session.transport().queue_json_response(
        400,
        &json!({"error": "invalid_grant", "error_description": "Code expired"}),
    );

    // Act
    let result = session
        .fetch_access_token(FetchTokenParams::new(TOKEN_URL).code("abc"))
        .await;

    // Assert
    match result {
        Err(OAuth2Error::Token(error)) => {
            assert_eq!(error.error, "invalid_grant");
            assert_eq!(error.description.as_deref(), Some("Code expired"));
            assert_eq!(error.status_code, 400);
        }
        other => panic!("expected token error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_token_missing_access_token() {
    let session = session();
    session
        .transport()
        .queue_json_response(200, &json!({"token_type": "bearer"}));

    let result = session
        .fetch_access_token(FetchTokenParams::new(TOKEN_URL).code("abc"))
        .await;

    assert!(matches!(result, Err(OAuth2Error::Protocol(_))));
}

#[tokio::test]
async fn test_fetch_token_username_without_password() {
    let config = session_config().build().unwrap();
    let session = OAuth2Session::with_transport(config, MockHttpTransport::new());
    session.transport().queue_json_response(200, &token_response());

    let result = session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .code("abc")
                .user_credentials("alice", None),
        )
        .await;

    assert!(matches!(
        result,
        Err(OAuth2Error::Configuration(ConfigurationError::MissingPassword))
    ));
    assert_eq!(session.transport().request_count(), 0);
}

#[tokio::test]
async fn test_fetch_token_user_credentials_basic_auth() {
    let config = session_config().build().unwrap();
    let session = OAuth2Session::with_transport(config, MockHttpTransport::new());
    session.transport().queue_json_response(200, &token_response());

    session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .code("abc")
                .user_credentials("alice", Some("pw".to_string())),
        )
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(
        request.header("authorization"),
        Some(BasicAuth::new("alice", "pw").header_value().as_str())
    );
}

#[tokio::test]
async fn test_fetch_token_client_secret_param_moves_to_basic_auth() {
    let session = session();
    session.transport().queue_json_response(200, &token_response());

    session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .code("abc")
                .param("client_secret", "override")
                .param("audience", "api"),
        )
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(
        request.header("authorization"),
        Some(BasicAuth::new("client", "override").header_value().as_str())
    );
    let body = body_pairs(request.body.as_deref());
    assert_eq!(pair(&body, "client_secret"), None);
    assert_eq!(pair(&body, "audience"), Some("api"));
}

#[tokio::test]
async fn test_fetch_token_body_seed_is_overridden() {
    let session = session();
    session.transport().queue_json_response(200, &token_response());

    session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .code("abc")
                .body("code=stale&resource=https%3A%2F%2Fapi.example"),
        )
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    let body = body_pairs(request.body.as_deref());
    assert_eq!(pair(&body, "code"), Some("abc"));
    assert_eq!(pair(&body, "resource"), Some("https://api.example"));
}

#[tokio::test]
async fn test_fetch_token_get_sends_params_in_query() {
    let session = session();
    session.transport().queue_json_response(200, &token_response());

    session
        .fetch_access_token(
            FetchTokenParams::new(TOKEN_URL)
                .code("abc")
                .method(HttpMethod::Get),
        )
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Get);
    assert!(request.body.is_none());
    let url = url::Url::parse(&request.url).unwrap();
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pair(&query, "code"), Some("abc"));
    assert_eq!(pair(&query, "grant_type"), Some("authorization_code"));
}

#[tokio::test]
async fn test_fetch_token_custom_headers_replace_defaults() {
    let session = session();
    session.transport().queue_json_response(200, &token_response());

    let headers = [("X-Provider".to_string(), "1".to_string())]
        .into_iter()
        .collect();
    session
        .fetch_token(FetchTokenParams::new(TOKEN_URL).code("abc").headers(headers))
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.header("x-provider"), Some("1"));
    assert_eq!(request.header("accept"), None);
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert!(request.header("authorization").is_some());
}

#[tokio::test]
async fn test_fetch_token_keeps_caller_content_type() {
    let session = session();
    session.transport().queue_json_response(200, &token_response());

    let headers = [("content-type".to_string(), "application/custom".to_string())]
        .into_iter()
        .collect();
    session
        .fetch_token(FetchTokenParams::new(TOKEN_URL).code("abc").headers(headers))
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.header("content-type"), Some("application/custom"));
    assert_eq!(request.headers.len(), 2);
}

#[tokio::test]
async fn test_fetch_token_rejects_redirect() {
    let session = session();
    let mut redirect = HttpResponse::json(302, &json!({}));
    redirect
        .headers
        .insert("location".to_string(), "https://elsewhere.example/".to_string());
    session.transport().queue_response(redirect);

    let result = session
        .fetch_access_token(FetchTokenParams::new(TOKEN_URL).code("abc"))
        .await;

    match result {
        Err(OAuth2Error::Protocol(ProtocolError::UnexpectedRedirect { location })) => {
            assert_eq!(location, "https://elsewhere.example/");
        }
        other => panic!("expected redirect error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_token_huge_expires_in() {
    let session = session();
    session.transport().queue_json_response(
        200,
        &json!({"access_token": "t", "token_type": "bearer", "expires_in": i64::MAX}),
    );

    let token = session
        .fetch_access_token(FetchTokenParams::new(TOKEN_URL).code("abc"))
        .await
        .unwrap();

    assert_eq!(token.access_token, "t");
    assert!(token.expires_at.is_none());
}

#[tokio::test]
async fn test_fetch_token_string_expires_in() {
    let session = session();
    session.transport().queue_json_response(
        200,
        &json!({"access_token": "tok", "token_type": "bearer", "expires_in": "3600"}),
    );

    let token = session
        .fetch_access_token(FetchTokenParams::new(TOKEN_URL).code("abc"))
        .await
        .unwrap();

    assert_eq!(token.access_token, "tok");
    assert_eq!(token.token_type, "bearer");
    assert_eq!(token.expires_in, Some(3600));
}

#[tokio::test]
async fn test_access_token_response_hook_rewrites_response() {
    // Arrange
    let mut session = session();
    session
        .register_compliance_hook(
            "access_token_response",
            ComplianceHook::response(|mut response: HttpResponse| {
                let mut body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
                body["token_type"] = json!("Bearer");
                response.body = body.to_string();
                response
            }),
        )
        .unwrap();
    session
        .transport()
        .queue_json_response(200, &json!({"access_token": "quirky"}));

    // Act
    let token = session
        .fetch_access_token(FetchTokenParams::new(TOKEN_URL).code("abc"))
        .await
        .unwrap();

    // Assert
    assert_eq!(token.access_token, "quirky");
    assert_eq!(token.token_type, "Bearer");
}

#[tokio::test]
async fn test_request_attaches_bearer_header() {
    // Arrange
    let session = session_with_token("Bearer");

    // Act
    session
        .post(API_URL, RequestOptions::new().data("a=1"))
        .await
        .unwrap();

    // Assert
    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.url, API_URL);
    assert_eq!(request.body.as_deref(), Some("a=1"));
    assert_eq!(request.header("authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn test_request_query_placement() {
    let mut session = session_with_token("bearer");
    session.set_token_placement(TokenPlacement::Query);

    session.get(API_URL, RequestOptions::new()).await.unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.url, format!("{}?access_token=tok", API_URL));
    assert_eq!(request.header("authorization"), None);
}

#[tokio::test]
async fn test_request_body_placement() {
    let mut session = session_with_token("bearer");
    session.set_token_placement(TokenPlacement::Body);

    session
        .put(API_URL, RequestOptions::new().data("a=1"))
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    let body = body_pairs(request.body.as_deref());
    assert_eq!(pair(&body, "a"), Some("1"));
    assert_eq!(pair(&body, "access_token"), Some("tok"));
}

#[tokio::test]
async fn test_request_unsupported_token_type() {
    let session = session_with_token("mac");

    let result = session.get(API_URL, RequestOptions::new()).await;

    assert!(matches!(
        result,
        Err(OAuth2Error::Configuration(ConfigurationError::UnsupportedTokenType { ref token_type }))
            if token_type == "mac"
    ));
    assert_eq!(session.transport().request_count(), 0);
}

#[tokio::test]
async fn test_request_without_token() {
    let session = session();
    session
        .transport()
        .queue_json_response(200, &json!({"ok": true}));

    let response = session.get(API_URL, RequestOptions::new()).await.unwrap();

    assert!(response.is_success());
    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.header("authorization"), None);
}

#[tokio::test]
async fn test_protected_request_hooks_run_in_order() {
    // Arrange
    let mut session = session_with_token("bearer");
    for tag in ["a", "b"] {
        session
            .register_compliance_hook(
                "protected_request",
                ComplianceHook::request(move |mut parts: RequestParts| {
                    let order = parts.headers.remove("X-Order").unwrap_or_default();
                    parts.headers.insert("X-Order".to_string(), order + tag);
                    parts
                }),
            )
            .unwrap();
    }

    // Act
    session.delete(API_URL, RequestOptions::new()).await.unwrap();

    // Assert
    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.header("x-order"), Some("ab"));
    assert_eq!(request.header("authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn test_withhold_token_skips_token_and_hooks() {
    let mut session = session_with_token("bearer");
    session
        .register_compliance_hook(
            "protected_request",
            ComplianceHook::request(|mut parts: RequestParts| {
                parts.headers.insert("X-Hooked".to_string(), "1".to_string());
                parts
            }),
        )
        .unwrap();

    session
        .get(API_URL, RequestOptions::new().withhold_token())
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.header("authorization"), None);
    assert_eq!(request.header("x-hooked"), None);
}

#[test]
fn test_register_unknown_phase_leaves_registry_unchanged() {
    let mut session = session();

    let result = session.register_compliance_hook(
        "token_response",
        ComplianceHook::response(|response: HttpResponse| response),
    );

    assert!(matches!(
        result,
        Err(OAuth2Error::Configuration(ConfigurationError::UnknownHookPhase { ref phase }))
            if phase == "token_response"
    ));
    assert!(session.compliance_hooks().is_empty());
}

#[test]
fn test_register_hook_shape_mismatch() {
    let mut session = session();

    let result = session.register_compliance_hook(
        "protected_request",
        ComplianceHook::response(|response: HttpResponse| response),
    );

    assert!(matches!(
        result,
        Err(OAuth2Error::Configuration(ConfigurationError::HookShapeMismatch { .. }))
    ));
    assert!(session.compliance_hooks().is_empty());
}

#[test]
fn test_register_same_hook_twice_is_noop() {
    let mut session = session();
    let hook = ComplianceHook::response(|response: HttpResponse| response);

    session
        .register_compliance_hook("refresh_token_response", hook.clone())
        .unwrap();
    session
        .register_compliance_hook("refresh_token_response", hook)
        .unwrap();

    assert_eq!(
        session.compliance_hooks().len(HookPhase::RefreshTokenResponse),
        1
    );
}

#[tokio::test]
async fn test_refresh_token_is_unsupported() {
    let mut session = session_with_token("bearer");

    let result = session.refresh_token(Some(TOKEN_URL)).await;

    assert!(matches!(
        result,
        Err(OAuth2Error::Configuration(ConfigurationError::Unsupported { .. }))
    ));
    assert_eq!(session.token().unwrap().access_token, "tok");
    assert_eq!(session.transport().request_count(), 0);
}

#[test]
fn test_token_updater_is_kept() {
    let session = session().with_token_updater(|_token: &OAuth2Token| {});
    assert!(session.token_updater().is_some());
}
