//! OAuth2 Types
//!
//! Core type definitions for the OAuth2 session.

pub mod auth;
pub mod callback;
pub mod config;
pub mod token;

pub use auth::*;
pub use callback::*;
pub use config::*;
pub use token::*;
