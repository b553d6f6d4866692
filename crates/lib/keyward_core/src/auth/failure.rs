//! Inbound response inspection.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{info, warn};

use crate::storage::{CredentialStore, clear_session};

/// Evicts stored credentials when the server answers 401.
///
/// It never retries or refreshes. The interceptor has already tried a
/// proactive refresh, so a 401 here ends the session.
#[derive(Clone)]
pub struct ResponseGuard {
    store: Arc<dyn CredentialStore>,
}

impl ResponseGuard {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Inspect a response status. Returns `true` if credentials were evicted.
    pub async fn inspect(&self, status: StatusCode) -> bool {
        if status != StatusCode::UNAUTHORIZED {
            return false;
        }
        info!("server rejected credentials, clearing stored session");
        if let Err(e) = clear_session(self.store.as_ref()).await {
            warn!(error = %e, "failed to clear credentials after 401");
        }
        true
    }
}

impl std::fmt::Debug for ResponseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageKey};

    async fn full_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for key in StorageKey::ALL {
            store.set(key, "x").await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn unauthorized_clears_everything() {
        let store = full_store().await;
        let guard = ResponseGuard::new(store.clone());
        assert!(guard.inspect(StatusCode::UNAUTHORIZED).await);
        for key in StorageKey::ALL {
            assert!(store.get(key).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn other_failures_keep_credentials() {
        let store = full_store().await;
        let guard = ResponseGuard::new(store.clone());
        for status in [
            StatusCode::OK,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(!guard.inspect(status).await);
        }
        assert_eq!(store.get(StorageKey::AccessToken).await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn repeated_401_is_harmless() {
        let store = full_store().await;
        let guard = ResponseGuard::new(store.clone());
        assert!(guard.inspect(StatusCode::UNAUTHORIZED).await);
        assert!(guard.inspect(StatusCode::UNAUTHORIZED).await);
        assert!(store.get(StorageKey::RefreshToken).await.unwrap().is_none());
    }
}
