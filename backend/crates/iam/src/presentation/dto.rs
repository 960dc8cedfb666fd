//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login form body (OAuth2 password-grant field names).
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    /// The user's email address
    pub username: String,
    pub password: String,
}

/// Access token response, returned by login and renew.
#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expiration: DateTime<Utc>,
}

impl AccessTokenResponse {
    pub fn bearer(access_token: String, expiration: DateTime<Utc>) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            expiration,
        }
    }
}

/// Liveness response
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "OK" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_form_deserialization() {
        let form: LoginForm =
            serde_urlencoded::from_str("username=u%40test.com&password=pw").unwrap();
        assert_eq!(form.username, "u@test.com");
        assert_eq!(form.password, "pw");
    }

    #[test]
    fn test_access_token_response_serialization() {
        let response = AccessTokenResponse::bearer("tok".to_string(), Utc::now());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""access_token":"tok""#));
        assert!(json.contains(r#""token_type":"bearer""#));
        assert!(json.contains("expiration"));
    }

    #[test]
    fn test_status_response_serialization() {
        let json = serde_json::to_string(&StatusResponse::ok()).unwrap();
        assert_eq!(json, r#"{"status":"OK"}"#);
    }
}
