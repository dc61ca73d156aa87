//! Builders
//!
//! Fluent builder for the OAuth2 session configuration.

pub mod config;

pub use config::{session_config, SessionConfigBuilder};
