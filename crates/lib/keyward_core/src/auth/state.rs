//! Stored auth state snapshot.
//!
//! Reads the four credential keys and derives validity from the expiry. The
//! snapshot is rebuilt on every call; validity depends on the wall clock.

use chrono::{Duration, Utc};
use tracing::warn;

use crate::models::auth::User;
use crate::storage::{CredentialStore, StorageKey};

/// Snapshot of the stored credential record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredAuthState {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    /// Absolute expiry, unix epoch milliseconds.
    pub token_expires: Option<i64>,
    pub is_valid: bool,
}

impl StoredAuthState {
    /// Build a snapshot, computing validity against `now_ms`.
    pub fn from_parts(
        token: Option<String>,
        refresh_token: Option<String>,
        user: Option<User>,
        token_expires: Option<i64>,
        now_ms: i64,
    ) -> Self {
        let is_valid = compute_validity(token.as_deref(), token_expires, now_ms);
        Self {
            token,
            refresh_token,
            user,
            token_expires,
            is_valid,
        }
    }

    /// Time left on the access token at `now_ms`. Negative once expired,
    /// `None` when no expiry is stored.
    pub fn remaining_lifetime(&self, now_ms: i64) -> Option<Duration> {
        self.token_expires
            .map(|expires| Duration::milliseconds(expires - now_ms))
    }
}

/// `token` present, expiry present, and `now_ms` strictly before expiry.
pub fn compute_validity(token: Option<&str>, token_expires: Option<i64>, now_ms: i64) -> bool {
    match (token, token_expires) {
        (Some(_), Some(expires)) => now_ms < expires,
        _ => false,
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Read the stored credentials.
///
/// Never fails: a key that cannot be read or parsed comes back as `None`.
pub async fn get_stored_auth_state(store: &dyn CredentialStore) -> StoredAuthState {
    let (token, refresh_token, user_data, token_expires) = futures::join!(
        read_key(store, StorageKey::AccessToken),
        read_key(store, StorageKey::RefreshToken),
        read_key(store, StorageKey::UserData),
        read_key(store, StorageKey::TokenExpires),
    );

    let user = user_data.and_then(|raw| match serde_json::from_str::<User>(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "stored user data is not valid JSON");
            None
        }
    });
    let token_expires = token_expires.and_then(|raw| match raw.trim().parse::<i64>() {
        Ok(ms) => Some(ms),
        Err(e) => {
            warn!(error = %e, value = %raw, "stored token expiry is not an integer");
            None
        }
    });

    StoredAuthState::from_parts(token, refresh_token, user, token_expires, now_ms())
}

/// Whether the stored access token is present and unexpired.
pub async fn is_token_valid(store: &dyn CredentialStore) -> bool {
    get_stored_auth_state(store).await.is_valid
}

async fn read_key(store: &dyn CredentialStore, key: StorageKey) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key = %key, error = %e, "credential read failed, treating as absent");
            None
        }
    }
}
