//! Authentication wire models.
//!
//! These mirror the backend's JSON bodies (camelCase on the wire).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile photo attached to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub path: String,
}

/// `{id, name}` lookup value used for role and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

/// User record returned by login, registration and `/auth/me`.
///
/// The client does not interpret this beyond its existence. Fields the backend
/// adds later are kept in `extra` so the record round-trips through storage
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// "First Last", falling back to the email when no name is set.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.email.clone().unwrap_or_default(),
        }
    }
}

/// `POST /auth/email/login` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /email/register` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login and registration response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    /// Absolute expiry, unix epoch milliseconds.
    pub token_expires: i64,
    pub user: User,
}

/// `POST /auth/refresh` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
    /// Absolute expiry, unix epoch milliseconds.
    pub token_expires: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": 1,
            "email": "ada@example.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "role": { "id": 2, "name": "User" },
            "status": { "id": 1, "name": "Active" },
            "createdAt": "2025-01-10T09:00:00Z",
            "deletedAt": null,
            "__entity": "User"
        });
        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.role.as_ref().map(|r| r.name.as_str()), Some("User"));
        assert!(user.deleted_at.is_none());
        assert_eq!(user.extra["__entity"], "User");

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["__entity"], "User");
        assert_eq!(back["firstName"], "Ada");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 7,
            "email": "x@example.com"
        }))
        .unwrap();
        assert_eq!(user.display_name(), "x@example.com");
    }

    #[test]
    fn user_without_identity_fields_still_decodes() {
        let user: User = serde_json::from_value(serde_json::json!({
            "email": null,
            "firstName": "Ada"
        }))
        .unwrap();
        assert!(user.id.is_none());
        assert!(user.email.is_none());
        assert_eq!(user.display_name(), "Ada");

        let bare: User = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(bare.display_name(), "");
    }

    #[test]
    fn register_request_uses_camel_case() {
        let req = RegisterRequest {
            email: "a@b.c".into(),
            password: "secret1".into(),
            first_name: "A".into(),
            last_name: "B".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["firstName"], "A");
        assert_eq!(json["lastName"], "B");
    }
}
