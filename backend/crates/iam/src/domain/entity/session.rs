//! User Session Entity
//!
//! Binds a user to an access/refresh token pair. In persistent mode
//! this is a store row; in stateless mode the refresh half is a signed
//! envelope and nothing is stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct UserSession {
    pub user_id: i64,
    /// Signed access token
    pub token: String,
    /// Access token expiry
    pub expires: DateTime<Utc>,
    /// Refresh token. `None` on a non-rotating refresh result, where the
    /// caller keeps using the one it already holds.
    pub refresh_token: Option<String>,
    pub refresh_token_expires: Option<DateTime<Utc>>,
}

impl UserSession {
    pub fn is_expired(&self) -> bool {
        self.expires < Utc::now()
    }

    pub fn is_refresh_expired(&self) -> bool {
        match self.refresh_token_expires {
            Some(expires) => expires < Utc::now(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_checks() {
        let session = UserSession {
            user_id: 1,
            token: "t".to_string(),
            expires: Utc::now() + Duration::hours(1),
            refresh_token: Some("r".to_string()),
            refresh_token_expires: Some(Utc::now() - Duration::seconds(1)),
        };
        assert!(!session.is_expired());
        assert!(session.is_refresh_expired());
    }

    #[test]
    fn test_missing_refresh_counts_as_expired() {
        let session = UserSession {
            user_id: 1,
            token: "t".to_string(),
            expires: Utc::now(),
            refresh_token: None,
            refresh_token_expires: None,
        };
        assert!(session.is_refresh_expired());
    }
}
