//! Session and token lifecycle.
//!
//! The pipeline runs leaves-first: [`state`] reads the stored credentials,
//! [`refresh`] coordinates token refreshes, [`interceptor`] authorizes
//! outbound requests, [`failure`] evicts credentials on 401, and
//! [`session`] ties them together for application code.

pub mod failure;
pub mod interceptor;
pub mod refresh;
pub mod session;
pub mod state;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Message used whenever no response was received.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Authentication errors surfaced to callers.
///
/// `Clone` so one refresh outcome can be handed to every waiting caller.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No response was received (connect failure, timeout).
    #[error("{message}")]
    Network { message: String },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Api { message: String, status_code: u16 },

    #[error("Failed to store authentication data: {0}")]
    Storage(#[from] StorageError),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AuthError {
    /// Generic connectivity failure.
    pub fn network() -> Self {
        AuthError::Network {
            message: NETWORK_ERROR_MESSAGE.to_string(),
        }
    }

    /// HTTP status for [`AuthError::Api`] errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AuthError::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Whether the server rejected the credentials (401).
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    /// The `{message, statusCode?}` shape shown to users.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            message: self.to_string(),
            status_code: self.status_code(),
        }
    }
}

/// Caller-facing error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_payload_carries_status() {
        let err = AuthError::Api {
            message: "Invalid credentials".into(),
            status_code: 422,
        };
        let payload = err.payload();
        assert_eq!(payload.message, "Invalid credentials");
        assert_eq!(payload.status_code, Some(422));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "message": "Invalid credentials", "statusCode": 422 })
        );
    }

    #[test]
    fn network_error_has_no_status() {
        let payload = AuthError::network().payload();
        assert_eq!(payload.message, NETWORK_ERROR_MESSAGE);
        assert!(payload.status_code.is_none());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "message": NETWORK_ERROR_MESSAGE })
        );
    }

    #[test]
    fn only_401_is_unauthorized() {
        let unauthorized = AuthError::Api {
            message: "x".into(),
            status_code: 401,
        };
        let forbidden = AuthError::Api {
            message: "x".into(),
            status_code: 403,
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!forbidden.is_unauthorized());
        assert!(!AuthError::Unauthenticated.is_unauthorized());
    }
}
