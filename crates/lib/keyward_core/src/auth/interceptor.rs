//! Outbound request authorization.
//!
//! Computes the bearer header per request from the stored credentials,
//! refreshing first when the access token is about to expire.

use std::sync::Arc;

use chrono::Duration;
use reqwest::Request;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::debug;

use super::AuthError;
use super::refresh::RefreshCoordinator;
use super::state::{get_stored_auth_state, now_ms};
use crate::api::routes;
use crate::storage::CredentialStore;

/// Refresh when less than this many seconds of lifetime remain.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 5 * 60;

/// Endpoints that never carry the access token.
const EXCLUDED_PATHS: [&str; 3] = [
    routes::POST_AUTH_REFRESH,
    routes::POST_AUTH_EMAIL_LOGIN,
    routes::POST_EMAIL_REGISTER,
];

/// Attaches `Authorization: Bearer <token>` to outbound requests.
#[derive(Clone)]
pub struct RequestAuthorizer {
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    threshold: Duration,
}

impl RequestAuthorizer {
    pub fn new(store: Arc<dyn CredentialStore>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            store,
            coordinator,
            threshold: Duration::seconds(DEFAULT_REFRESH_THRESHOLD_SECS),
        }
    }

    /// Override the proactive refresh threshold.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Add the bearer header to `request`, refreshing first if needed.
    ///
    /// Requests to the auth endpoints, and any request made without a stored
    /// token, pass through untouched. A failed refresh fails the request.
    pub async fn authorize(&self, request: &mut Request) -> Result<(), AuthError> {
        if is_excluded(request.url().path()) {
            return Ok(());
        }

        let state = get_stored_auth_state(self.store.as_ref()).await;
        let Some(mut token) = state.token.clone() else {
            debug!(path = request.url().path(), "no access token, sending unauthenticated");
            return Ok(());
        };

        let needs_refresh = state
            .remaining_lifetime(now_ms())
            .is_some_and(|remaining| remaining < self.threshold);
        if needs_refresh && state.refresh_token.is_some() {
            debug!(path = request.url().path(), "access token near expiry, refreshing");
            token = self.coordinator.refresh().await?;
        }

        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| AuthError::Decode(format!("stored token is not a valid header: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl std::fmt::Debug for RequestAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthorizer")
            .field("coordinator", &self.coordinator)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

/// Whether `path` ends in one of the auth endpoints. Matched on the suffix so
/// a base URL with a path prefix (`/api/v1`) still matches.
fn is_excluded(path: &str) -> bool {
    EXCLUDED_PATHS
        .iter()
        .any(|excluded| path.trim_end_matches('/').ends_with(excluded))
}
