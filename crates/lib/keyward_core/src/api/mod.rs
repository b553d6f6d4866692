//! HTTP client for the auth backend.
//!
//! Wraps a `reqwest::Client` with the backend base URL and maps transport
//! and status failures onto [`AuthError`]. Requests that need the access
//! token go through [`crate::auth::session::AuthSession`] instead.

pub mod routes;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::AuthError;
use crate::auth::refresh::TokenRefresher;
use crate::config::ClientConfig;
use crate::models::auth::{AuthResponse, LoginRequest, RefreshResponse, RegisterRequest};

pub const LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const REGISTER_FAILED: &str = "Registration failed. Please try again.";
pub const REFRESH_FAILED: &str = "Session refresh failed.";
pub const CURRENT_USER_FAILED: &str = "Failed to get user data.";
pub const LOGOUT_FAILED: &str = "Logout failed. Please try again.";
pub const REQUEST_FAILED: &str = "Request failed.";

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    message: Option<String>,
}

/// Thin client over the backend's REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::InvalidRequest(format!("http client: {e}")))?;
        Self::with_client(http, &config.backend_url)
    }

    /// Build around an existing `reqwest::Client`.
    pub fn with_client(http: Client, base_url: &str) -> Result<Self, AuthError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AuthError::InvalidRequest(format!("backend url {base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(AuthError::InvalidRequest(format!(
                "backend url {base_url} cannot be a base"
            )));
        }
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request to `path`. No credentials are attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Send a built request, mapping transport failures to a network error.
    pub async fn execute(&self, request: Request) -> Result<Response, AuthError> {
        let method = request.method().clone();
        let path = request.url().path().to_string();
        let response = self.http.execute(request).await.map_err(|e| {
            debug!(%method, path = %path, error = %e, timeout = e.is_timeout(), "request failed");
            AuthError::network()
        })?;
        debug!(%method, path = %path, status = response.status().as_u16(), "response received");
        Ok(response)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AuthError> {
        let request = builder
            .build()
            .map_err(|e| AuthError::InvalidRequest(e.to_string()))?;
        self.execute(request).await
    }

    /// `POST /auth/email/login`.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let response = self
            .send(self.request(Method::POST, routes::POST_AUTH_EMAIL_LOGIN).json(credentials))
            .await?;
        read_json(response, LOGIN_FAILED).await
    }

    /// `POST /email/register`.
    pub async fn register(&self, user: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let response = self
            .send(self.request(Method::POST, routes::POST_EMAIL_REGISTER).json(user))
            .await?;
        read_json(response, REGISTER_FAILED).await
    }
}

#[async_trait]
impl TokenRefresher for ApiClient {
    /// `POST /auth/refresh`, authorized by the refresh token.
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let response = self
            .send(
                self.request(Method::POST, routes::POST_AUTH_REFRESH)
                    .header(AUTHORIZATION, format!("Bearer {refresh_token}")),
            )
            .await?;
        read_json(response, REFRESH_FAILED).await
    }
}

/// Pass 2xx responses through; turn anything else into [`AuthError::Api`]
/// using the server's `message` or `fallback`.
pub async fn ensure_success(response: Response, fallback: &str) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ServerErrorBody>().await {
        Ok(ServerErrorBody {
            message: Some(message),
        }) if !message.is_empty() => message,
        _ => fallback.to_string(),
    };
    Err(AuthError::Api {
        message,
        status_code: status.as_u16(),
    })
}

/// [`ensure_success`], then decode the body as `T`.
pub async fn read_json<T: DeserializeOwned>(
    response: Response,
    fallback: &str,
) -> Result<T, AuthError> {
    ensure_success(response, fallback)
        .await?
        .json::<T>()
        .await
        .map_err(|e| AuthError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(Client::new(), base).unwrap()
    }

    #[test]
    fn endpoint_joins_base_path() {
        let api = client("http://localhost:3000/api/v1/");
        assert_eq!(api.endpoint(routes::GET_AUTH_ME), "http://localhost:3000/api/v1/auth/me");
        assert_eq!(api.base_url(), "http://localhost:3000/api/v1");
    }

    #[test]
    fn endpoint_without_base_path() {
        let api = client("https://auth.example.com");
        assert_eq!(
            api.endpoint(routes::POST_AUTH_REFRESH),
            "https://auth.example.com/auth/refresh"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = ApiClient::with_client(Client::new(), "not a url").unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest(_)));
        let err = ApiClient::with_client(Client::new(), "mailto:ops@example.com").unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest(_)));
    }
}
