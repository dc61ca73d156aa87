//! OAuth2 Core Components
//!
//! Core infrastructure: HTTP transport, RFC 6749 message builders and
//! transport security.

pub mod grant;
pub mod security;
pub mod transport;

pub use grant::*;
pub use security::*;
pub use transport::*;
