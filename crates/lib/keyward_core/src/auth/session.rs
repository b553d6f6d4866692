//! Auth session: login, registration, logout and status checks over the
//! credential store and the authorized request pipeline.

use std::sync::Arc;

use chrono::Duration;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::AuthError;
use super::failure::ResponseGuard;
use super::interceptor::RequestAuthorizer;
use super::refresh::RefreshCoordinator;
use super::state::{StoredAuthState, get_stored_auth_state};
use crate::api::{self, ApiClient, routes};
use crate::config::ClientConfig;
use crate::models::auth::{LoginRequest, RegisterRequest, User};
use crate::storage::{CredentialStore, EncryptedFileStore, StorageKey, clear_session, store_session};

/// Result of [`AuthSession::check_auth_status`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    Authenticated(User),
    SignedOut,
}

/// Client-side auth session.
///
/// Every authorized request runs through the [`RequestAuthorizer`] before
/// dispatch and the [`ResponseGuard`] after.
pub struct AuthSession {
    api: Arc<ApiClient>,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    authorizer: RequestAuthorizer,
    guard: ResponseGuard,
}

impl AuthSession {
    /// Wire a session around an API client and a credential store.
    pub fn new(api: Arc<ApiClient>, store: Arc<dyn CredentialStore>) -> Self {
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&store), api.clone()));
        let authorizer = RequestAuthorizer::new(Arc::clone(&store), Arc::clone(&coordinator));
        let guard = ResponseGuard::new(Arc::clone(&store));
        Self {
            api,
            store,
            coordinator,
            authorizer,
            guard,
        }
    }

    /// Session over the encrypted file store described by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthError> {
        let api = Arc::new(ApiClient::new(config)?);
        let store: Arc<dyn CredentialStore> = Arc::new(EncryptedFileStore::new(
            &config.store_path,
            &config.encryption_key,
        )?);
        Ok(Self::new(api, store).with_refresh_threshold(config.refresh_threshold()))
    }

    /// Override the proactive refresh threshold.
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.authorizer = self.authorizer.with_threshold(threshold);
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Fresh snapshot of the stored credentials.
    pub async fn auth_state(&self) -> StoredAuthState {
        get_stored_auth_state(self.store.as_ref()).await
    }

    /// Whether a valid access token is stored.
    pub async fn is_authenticated(&self) -> bool {
        self.auth_state().await.is_valid
    }

    /// Sign in with email and password and persist the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let response = self
            .api
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        store_session(self.store.as_ref(), &response).await?;
        info!(user_id = ?response.user.id, "signed in");
        Ok(response.user)
    }

    /// Create an account and persist the resulting session.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        let response = self.api.register(request).await?;
        store_session(self.store.as_ref(), &response).await?;
        info!(user_id = ?response.user.id, "account registered");
        Ok(response.user)
    }

    /// `GET /auth/me`. Updates the cached user on success.
    pub async fn current_user(&self) -> Result<User, AuthError> {
        let user: User = self
            .send_json(
                self.api.request(Method::GET, routes::GET_AUTH_ME),
                api::CURRENT_USER_FAILED,
            )
            .await?;
        match serde_json::to_string(&user) {
            Ok(json) => {
                if let Err(e) = self.store.set(StorageKey::UserData, &json).await {
                    warn!(error = %e, "could not cache user data");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize user data"),
        }
        Ok(user)
    }

    /// Sign out. The server call is best effort; local credentials are always
    /// cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if self.auth_state().await.token.is_some() {
            let result = self
                .send(
                    self.api.request(Method::POST, routes::POST_AUTH_LOGOUT),
                    api::LOGOUT_FAILED,
                )
                .await;
            if let Err(e) = result {
                warn!(error = %e, "server logout failed");
            }
        }
        clear_session(self.store.as_ref()).await?;
        info!("signed out");
        Ok(())
    }

    /// Decide whether the stored session is still usable.
    ///
    /// An expired token with a refresh token gets one coordinated refresh.
    /// Authorization failures clear the stored session. Any other failure
    /// (network, server error, bad body) reports `SignedOut` and leaves it in
    /// place.
    pub async fn check_auth_status(&self) -> AuthStatus {
        let mut state = self.auth_state().await;

        if !state.is_valid {
            if state.token.is_none() || state.refresh_token.is_none() {
                self.clear_quietly().await;
                return AuthStatus::SignedOut;
            }
            debug!("stored token expired, attempting refresh");
            if let Err(e) = self.coordinator.refresh().await {
                debug!(error = %e, "session refresh failed");
                return AuthStatus::SignedOut;
            }
            state = self.auth_state().await;
        }

        if let Some(user) = state.user {
            return AuthStatus::Authenticated(user);
        }
        match self.current_user().await {
            Ok(user) => AuthStatus::Authenticated(user),
            Err(e) if e.is_unauthorized() => {
                debug!(error = %e, "stored session rejected by server");
                self.clear_quietly().await;
                AuthStatus::SignedOut
            }
            Err(e) => {
                debug!(error = %e, "could not load user, keeping stored session");
                AuthStatus::SignedOut
            }
        }
    }

    /// Send a request through the authorization pipeline.
    ///
    /// Non-2xx statuses come back as [`AuthError::Api`]. A 401 also clears
    /// the stored session.
    pub async fn send(
        &self,
        builder: RequestBuilder,
        fallback: &str,
    ) -> Result<Response, AuthError> {
        let mut request = builder
            .build()
            .map_err(|e| AuthError::InvalidRequest(e.to_string()))?;
        self.authorizer.authorize(&mut request).await?;
        let response = self.api.execute(request).await?;
        self.guard.inspect(response.status()).await;
        api::ensure_success(response, fallback).await
    }

    /// [`AuthSession::send`], decoding the body as `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        fallback: &str,
    ) -> Result<T, AuthError> {
        self.send(builder, fallback)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))
    }

    async fn clear_quietly(&self) {
        if let Err(e) = clear_session(self.store.as_ref()).await {
            warn!(error = %e, "failed to clear credentials");
        }
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("api", &self.api)
            .field("authorizer", &self.authorizer)
            .finish_non_exhaustive()
    }
}
