//! Transport Security
//!
//! CSRF state generation and the secure-transport check.

use base64::Engine;
use rand::Rng;

/// Generate a random, URL-safe opaque token (used as CSRF state).
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Check whether a URL uses a secure scheme.
pub fn is_secure_transport(url: &str) -> bool {
    url.get(..8)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
}
