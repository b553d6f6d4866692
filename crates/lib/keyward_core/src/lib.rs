//! # keyward_core
//!
//! Credential storage, single-flight token refresh and request authorization
//! for the Keyward auth backend.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

pub use auth::AuthError;
pub use auth::session::{AuthSession, AuthStatus};
pub use config::ClientConfig;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
