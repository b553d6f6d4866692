//! Secure credential storage.
//!
//! Credentials live under four fixed keys. Backends implement
//! [`CredentialStore`]; the session helpers here write and clear the keys as
//! a unit.

pub mod cipher;
pub mod file;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::{AuthResponse, RefreshResponse};

pub use file::EncryptedFileStore;
pub use memory::MemoryStore;

/// Credential storage errors.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown storage key: {0}")]
    UnknownKey(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// The logical keys a credential record is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    UserData,
    TokenExpires,
}

impl StorageKey {
    /// Every key, in write order.
    pub const ALL: [StorageKey; 4] = [
        StorageKey::AccessToken,
        StorageKey::RefreshToken,
        StorageKey::UserData,
        StorageKey::TokenExpires,
    ];

    /// Persisted name of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::AccessToken => "access_token",
            StorageKey::RefreshToken => "refresh_token",
            StorageKey::UserData => "user_data",
            StorageKey::TokenExpires => "token_expires",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StorageError::UnknownKey(s.to_string()))
    }
}

/// Async key/value store for credentials.
///
/// Deleting a key that is not present is not an error.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read a value, `None` when absent.
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: StorageKey, value: &str) -> Result<(), StorageError>;

    /// Remove a value.
    async fn delete(&self, key: StorageKey) -> Result<(), StorageError>;

    /// Remove all four keys.
    async fn clear(&self) -> Result<(), StorageError> {
        for key in StorageKey::ALL {
            self.delete(key).await?;
        }
        Ok(())
    }
}

/// Persist a full credential record from a login or registration response.
pub async fn store_session(
    store: &dyn CredentialStore,
    response: &AuthResponse,
) -> Result<(), StorageError> {
    let user_json = serde_json::to_string(&response.user)?;
    let expires = response.token_expires.to_string();
    futures::try_join!(
        store.set(StorageKey::AccessToken, &response.token),
        store.set(StorageKey::RefreshToken, &response.refresh_token),
        store.set(StorageKey::UserData, &user_json),
        store.set(StorageKey::TokenExpires, &expires),
    )?;
    Ok(())
}

/// Persist a refreshed token triple. The cached user is left as it is.
pub async fn store_refreshed_tokens(
    store: &dyn CredentialStore,
    response: &RefreshResponse,
) -> Result<(), StorageError> {
    let expires = response.token_expires.to_string();
    futures::try_join!(
        store.set(StorageKey::AccessToken, &response.token),
        store.set(StorageKey::RefreshToken, &response.refresh_token),
        store.set(StorageKey::TokenExpires, &expires),
    )?;
    Ok(())
}

/// Remove the whole credential record.
pub async fn clear_session(store: &dyn CredentialStore) -> Result<(), StorageError> {
    store.clear().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for key in StorageKey::ALL {
            assert_eq!(key.as_str().parse::<StorageKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = "session_cookie".parse::<StorageKey>().unwrap_err();
        assert!(matches!(err, StorageError::UnknownKey(k) if k == "session_cookie"));
    }
}
