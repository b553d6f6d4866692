//! In-process credential store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CredentialStore, StorageError, StorageKey};

/// [`CredentialStore`] that keeps values in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn set(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.entries.write().await.insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StorageError> {
        self.entries.write().await.remove(&key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::{AuthResponse, RefreshResponse};
    use crate::storage::{clear_session, store_refreshed_tokens, store_session};

    fn login_response() -> AuthResponse {
        serde_json::from_value(serde_json::json!({
            "token": "A",
            "refreshToken": "R",
            "tokenExpires": 1_700_000_000_000i64,
            "user": { "id": 1, "email": "ada@example.com" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn store_session_writes_all_keys() {
        let store = MemoryStore::new();
        store_session(&store, &login_response()).await.unwrap();

        assert_eq!(store.get(StorageKey::AccessToken).await.unwrap().as_deref(), Some("A"));
        assert_eq!(store.get(StorageKey::RefreshToken).await.unwrap().as_deref(), Some("R"));
        assert_eq!(
            store.get(StorageKey::TokenExpires).await.unwrap().as_deref(),
            Some("1700000000000")
        );
        let user = store.get(StorageKey::UserData).await.unwrap().unwrap();
        assert!(user.contains("ada@example.com"));
    }

    #[tokio::test]
    async fn refreshed_tokens_keep_cached_user() {
        let store = MemoryStore::new();
        store_session(&store, &login_response()).await.unwrap();
        let before = store.get(StorageKey::UserData).await.unwrap();

        store_refreshed_tokens(
            &store,
            &RefreshResponse {
                token: "B".into(),
                refresh_token: "R2".into(),
                token_expires: 1_800_000_000_000,
            },
        )
        .await
        .unwrap();

        assert_eq!(store.get(StorageKey::AccessToken).await.unwrap().as_deref(), Some("B"));
        assert_eq!(store.get(StorageKey::RefreshToken).await.unwrap().as_deref(), Some("R2"));
        assert_eq!(store.get(StorageKey::UserData).await.unwrap(), before);
    }

    #[tokio::test]
    async fn clearing_twice_leaves_everything_empty() {
        let store = MemoryStore::new();
        store_session(&store, &login_response()).await.unwrap();
        clear_session(&store).await.unwrap();
        clear_session(&store).await.unwrap();
        for key in StorageKey::ALL {
            assert!(store.get(key).await.unwrap().is_none());
        }
    }
}
