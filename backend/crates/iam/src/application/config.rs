//! Application Configuration
//!
//! Resolved once at startup and shared read-only; there is no runtime
//! registry to consult afterwards.

use platform::cookie::{CookieConfig, SameSite};

/// IAM application configuration
#[derive(Debug, Clone)]
pub struct IamConfig {
    /// HS256 signing key for access tokens
    pub jwt_secret: String,
    /// Access token lifetime, seconds. Negative values only make sense
    /// in tests that need pre-expired tokens.
    pub jwt_expiration_secs: i64,
    /// Refresh token / session lifetime, seconds
    pub session_expiration_secs: i64,
    /// Replace the refresh token on every refresh
    pub rotate_refresh_tokens: bool,
    /// Signing key for the stateless refresh envelope
    pub refresh_token_secret: String,
    /// Refresh cookie name
    pub cookie_name: String,
    /// Cookie domain; defaults to the request host when unset
    pub cookie_domain: Option<String>,
    /// Whether the refresh cookie requires HTTPS
    pub cookie_secure: bool,
    /// Max concurrent password hashing jobs
    pub hashing_pool_size: usize,
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "XXXXX".to_string(),
            jwt_expiration_secs: 6 * 60 * 60,
            session_expiration_secs: 60 * 60 * 24 * 360,
            rotate_refresh_tokens: true,
            refresh_token_secret: "xxxxx".to_string(),
            cookie_name: "refresh".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            hashing_pool_size: platform::password::DEFAULT_POOL_SIZE,
        }
    }
}

impl IamConfig {
    /// Cookie settings for the refresh token. The domain falls back to
    /// `request_host` (port stripped) when none is configured.
    pub fn cookie_config(&self, request_host: Option<&str>) -> CookieConfig {
        let domain = self
            .cookie_domain
            .clone()
            .or_else(|| request_host.map(|h| h.split(':').next().unwrap_or(h).to_string()));

        CookieConfig {
            name: self.cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            domain,
            max_age_secs: Some(self.session_expiration_secs),
        }
    }
}
