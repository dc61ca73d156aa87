//! Compliance Hooks
//!
//! Caller-supplied transforms that adapt the session to providers which do
//! not follow the OAuth2 specifications to the letter.

use std::str::FromStr;
use std::sync::Arc;

use crate::core::HttpResponse;
use crate::error::ConfigurationError;
use crate::types::RequestParts;

/// Protocol phase a hook runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Before a token endpoint response is parsed.
    AccessTokenResponse,
    /// Before a refresh response is parsed.
    RefreshTokenResponse,
    /// Before a protected request is sent.
    ProtectedRequest,
}

impl HookPhase {
    pub const ALL: [HookPhase; 3] = [
        Self::AccessTokenResponse,
        Self::RefreshTokenResponse,
        Self::ProtectedRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessTokenResponse => "access_token_response",
            Self::RefreshTokenResponse => "refresh_token_response",
            Self::ProtectedRequest => "protected_request",
        }
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookPhase {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownHookPhase {
                phase: s.to_string(),
            })
    }
}

/// Rewrites a token endpoint response before it is parsed.
pub trait ResponseHook: Send + Sync {
    fn apply(&self, response: HttpResponse) -> HttpResponse;
}

impl<F> ResponseHook for F
where
    F: Fn(HttpResponse) -> HttpResponse + Send + Sync,
{
    fn apply(&self, response: HttpResponse) -> HttpResponse {
        self(response)
    }
}

/// Rewrites a protected request after the token has been attached.
pub trait RequestHook: Send + Sync {
    fn apply(&self, parts: RequestParts) -> RequestParts;
}

impl<F> RequestHook for F
where
    F: Fn(RequestParts) -> RequestParts + Send + Sync,
{
    fn apply(&self, parts: RequestParts) -> RequestParts {
        self(parts)
    }
}

/// A registrable hook.
///
/// Clones share identity: registering a clone of an already registered hook
/// has no effect.
#[derive(Clone)]
pub enum ComplianceHook {
    Response(Arc<dyn ResponseHook>),
    Request(Arc<dyn RequestHook>),
}

impl ComplianceHook {
    /// Hook for `access_token_response` or `refresh_token_response`.
    pub fn response<F>(hook: F) -> Self
    where
        F: Fn(HttpResponse) -> HttpResponse + Send + Sync + 'static,
    {
        Self::Response(Arc::new(hook))
    }

    /// Hook for `protected_request`.
    pub fn request<F>(hook: F) -> Self
    where
        F: Fn(RequestParts) -> RequestParts + Send + Sync + 'static,
    {
        Self::Request(Arc::new(hook))
    }
}

impl std::fmt::Debug for ComplianceHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response(_) => f.write_str("ComplianceHook::Response"),
            Self::Request(_) => f.write_str("ComplianceHook::Request"),
        }
    }
}

// Compares data pointers only; vtable pointers are not unique per type.
fn same_hook<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn add_unique<T: ?Sized>(hooks: &mut Vec<Arc<T>>, hook: Arc<T>) -> bool {
    if hooks.iter().any(|existing| same_hook(existing, &hook)) {
        return false;
    }
    hooks.push(hook);
    true
}

/// Per-session hook registry.
///
/// Hooks run in registration order.
#[derive(Clone, Default)]
pub struct ComplianceHooks {
    access_token_response: Vec<Arc<dyn ResponseHook>>,
    refresh_token_response: Vec<Arc<dyn ResponseHook>>,
    protected_request: Vec<Arc<dyn RequestHook>>,
}

impl ComplianceHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` for `phase`.
    ///
    /// Returns `false` when the hook was already registered for that phase.
    pub fn register(
        &mut self,
        phase: HookPhase,
        hook: ComplianceHook,
    ) -> Result<bool, ConfigurationError> {
        match (phase, hook) {
            (HookPhase::AccessTokenResponse, ComplianceHook::Response(hook)) => {
                Ok(add_unique(&mut self.access_token_response, hook))
            }
            (HookPhase::RefreshTokenResponse, ComplianceHook::Response(hook)) => {
                Ok(add_unique(&mut self.refresh_token_response, hook))
            }
            (HookPhase::ProtectedRequest, ComplianceHook::Request(hook)) => {
                Ok(add_unique(&mut self.protected_request, hook))
            }
            (phase, _) => Err(ConfigurationError::HookShapeMismatch {
                phase: phase.to_string(),
            }),
        }
    }

    /// Number of hooks registered for `phase`.
    pub fn len(&self, phase: HookPhase) -> usize {
        match phase {
            HookPhase::AccessTokenResponse => self.access_token_response.len(),
            HookPhase::RefreshTokenResponse => self.refresh_token_response.len(),
            HookPhase::ProtectedRequest => self.protected_request.len(),
        }
    }

    /// Whether no hooks are registered at all.
    pub fn is_empty(&self) -> bool {
        HookPhase::ALL.iter().all(|phase| self.len(*phase) == 0)
    }

    /// Run the `access_token_response` hooks.
    pub fn apply_access_token_response(&self, response: HttpResponse) -> HttpResponse {
        self.access_token_response
            .iter()
            .fold(response, |response, hook| hook.apply(response))
    }

    /// Run the `refresh_token_response` hooks.
    pub fn apply_refresh_token_response(&self, response: HttpResponse) -> HttpResponse {
        self.refresh_token_response
            .iter()
            .fold(response, |response, hook| hook.apply(response))
    }

    /// Run the `protected_request` hooks.
    pub fn apply_protected_request(&self, parts: RequestParts) -> RequestParts {
        self.protected_request
            .iter()
            .fold(parts, |parts, hook| hook.apply(parts))
    }
}

impl std::fmt::Debug for ComplianceHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceHooks")
            .field("access_token_response", &self.access_token_response.len())
            .field("refresh_token_response", &self.refresh_token_response.len())
            .field("protected_request", &self.protected_request.len())
            .finish()
    }
}
