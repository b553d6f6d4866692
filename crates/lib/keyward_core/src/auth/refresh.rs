//! Single-flight token refresh.
//!
//! At most one refresh call is outstanding. Callers arriving while a cycle is
//! in flight await the same shared future and observe the same outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::AuthError;
use crate::models::auth::RefreshResponse;
use crate::storage::{CredentialStore, StorageKey, clear_session, store_refreshed_tokens};

/// Performs the network half of a refresh.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange `refresh_token` for a new token triple.
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError>;
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, AuthError>>>;

/// One in-flight refresh.
struct Cycle {
    id: u64,
    future: RefreshFuture,
}

/// Coordinates refreshes so only one network call runs at a time.
///
/// Idle at construction; the cycle slot is emptied as soon as a cycle
/// resolves, so the next caller after that starts a fresh one.
pub struct RefreshCoordinator {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    slot: Arc<Mutex<Option<Cycle>>>,
    next_cycle: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            slot: Arc::new(Mutex::new(None)),
            next_cycle: AtomicU64::new(1),
        }
    }

    /// Whether a refresh cycle is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Refresh the access token, joining any cycle already in flight.
    ///
    /// On success the new token triple is stored and the new access token is
    /// returned. On failure the whole credential record is cleared.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        self.join_or_start().await
    }

    fn join_or_start(&self) -> RefreshFuture {
        let mut slot = lock(&self.slot);
        if let Some(cycle) = slot.as_ref() {
            debug!(cycle = cycle.id, "joining in-flight token refresh");
            return cycle.future.clone();
        }

        let id = self.next_cycle.fetch_add(1, Ordering::Relaxed);
        let store = Arc::clone(&self.store);
        let refresher = Arc::clone(&self.refresher);
        let slot_handle = Arc::clone(&self.slot);

        let future = async move {
            let result = run_refresh(store.as_ref(), refresher.as_ref()).await;
            let mut slot = lock(&slot_handle);
            if slot.as_ref().is_some_and(|cycle| cycle.id == id) {
                *slot = None;
            }
            result
        }
        .boxed()
        .shared();

        debug!(cycle = id, "starting token refresh");
        *slot = Some(Cycle {
            id,
            future: future.clone(),
        });
        future
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_refresh(
    store: &dyn CredentialStore,
    refresher: &dyn TokenRefresher,
) -> Result<String, AuthError> {
    let refresh_token = match store.get(StorageKey::RefreshToken).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            debug!("no refresh token stored");
            evict(store).await;
            return Err(AuthError::Unauthenticated);
        }
        Err(e) => {
            warn!(error = %e, "could not read refresh token");
            evict(store).await;
            return Err(AuthError::Unauthenticated);
        }
    };

    match refresher.refresh_tokens(&refresh_token).await {
        Ok(response) => {
            if let Err(e) = store_refreshed_tokens(store, &response).await {
                warn!(error = %e, "could not persist refreshed tokens");
                evict(store).await;
                return Err(AuthError::Storage(e));
            }
            info!(expires = response.token_expires, "access token refreshed");
            Ok(response.token)
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed, clearing credentials");
            evict(store).await;
            Err(e)
        }
    }
}

async fn evict(store: &dyn CredentialStore) {
    if let Err(e) = clear_session(store).await {
        warn!(error = %e, "failed to clear credentials");
    }
}
