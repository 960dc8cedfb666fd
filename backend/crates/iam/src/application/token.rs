//! Token Encoders
//!
//! Three token shapes live here:
//! - the HS256 access token carrying the claim set,
//! - the opaque 128-bit refresh token used by the persistent policy,
//! - the signed refresh envelope used by the stateless policy, which is
//!   verifiable with no stored state.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::user::User;
use crate::error::{IamError, IamResult};

/// Claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: i64,
    /// Unix timestamp expiry
    pub exp: i64,
    pub email: String,
    pub email_verified: bool,
    pub principals: Vec<String>,
    pub is_admin: bool,
}

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct AccessTokenEncoder {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl AccessTokenEncoder {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Mint an access token for `user`.
    pub fn create(&self, user: &User) -> IamResult<(String, DateTime<Utc>)> {
        let expires = Utc::now() + Duration::seconds(self.ttl_secs);
        let claims = AccessClaims {
            sub: user.user_id,
            exp: expires.timestamp(),
            email: user.email.clone(),
            email_verified: true,
            principals: user.principals(),
            is_admin: user.is_admin,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IamError::Internal(format!("token encoding failed: {e}")))?;
        Ok((token, expires))
    }

    /// Verify signature, structure and expiry. The three failure modes
    /// are indistinguishable to the caller by design.
    pub fn validate(&self, token: &str) -> IamResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| IamError::InvalidToken)
    }
}

/// Opaque random refresh token for the persistent policy: 128 bits of
/// randomness in hex, meaningless without a store lookup.
pub fn new_opaque_refresh_token(ttl_secs: i64) -> (String, DateTime<Utc>) {
    let token = Uuid::new_v4().simple().to_string();
    (token, Utc::now() + Duration::seconds(ttl_secs))
}

#[derive(Serialize, Deserialize)]
struct RefreshPayload {
    uid: i64,
    exp: i64,
}

/// Signed refresh envelope for the stateless policy.
///
/// Wire format is `base64url(json{uid,exp}) "." base64url(hmac)`, keyed
/// separately from the access token secret.
#[derive(Clone)]
pub struct RefreshTokenEncoder {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl RefreshTokenEncoder {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    pub fn create(&self, user_id: i64) -> IamResult<(String, DateTime<Utc>)> {
        let expires = Utc::now() + Duration::seconds(self.ttl_secs);
        let payload = RefreshPayload {
            uid: user_id,
            exp: expires.timestamp(),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| IamError::Internal(format!("envelope encoding failed: {e}")))?;

        let body_b64 = platform::crypto::to_base64url(&body);
        let tag = platform::crypto::hmac_sha256(&self.secret, body_b64.as_bytes());
        let token = format!("{}.{}", body_b64, platform::crypto::to_base64url(&tag));
        Ok((token, expires))
    }

    /// Verify the envelope and return the embedded user id.
    pub fn validate(&self, token: &str) -> IamResult<i64> {
        let (body_b64, tag_b64) = token
            .split_once('.')
            .ok_or(IamError::InvalidRefreshToken)?;

        let tag = platform::crypto::from_base64url(tag_b64)
            .map_err(|_| IamError::InvalidRefreshToken)?;
        if !platform::crypto::hmac_sha256_verify(&self.secret, body_b64.as_bytes(), &tag) {
            return Err(IamError::InvalidRefreshToken);
        }

        let body = platform::crypto::from_base64url(body_b64)
            .map_err(|_| IamError::InvalidRefreshToken)?;
        let payload: RefreshPayload =
            serde_json::from_slice(&body).map_err(|_| IamError::InvalidRefreshToken)?;

        let expires = Utc
            .timestamp_opt(payload.exp, 0)
            .single()
            .ok_or(IamError::InvalidRefreshToken)?;
        if expires < Utc::now() {
            return Err(IamError::InvalidRefreshToken);
        }

        Ok(payload.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            user_id: 12,
            email: "test@test.com".to_string(),
            username: "noname".to_string(),
            password: "argon2:s:d".to_string(),
            is_staff: true,
            is_active: true,
            is_admin: false,
            date_joined: None,
            last_login: None,
            groups: vec![],
            token: None,
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let encoder = AccessTokenEncoder::new("secret", 3600);
        let (token, expires) = encoder.create(&sample_user()).unwrap();
        let claims = encoder.validate(&token).unwrap();
        assert_eq!(claims.sub, 12);
        assert_eq!(claims.email, "test@test.com");
        assert!(claims.principals.contains(&"user:12".to_string()));
        assert!(claims.principals.contains(&"staff".to_string()));
        assert!(!claims.is_admin);
        assert_eq!(claims.exp, expires.timestamp());
    }

    #[test]
    fn test_access_token_expired_fails() {
        let encoder = AccessTokenEncoder::new("secret", -60);
        let (token, _) = encoder.create(&sample_user()).unwrap();
        assert!(matches!(
            encoder.validate(&token),
            Err(IamError::InvalidToken)
        ));
    }

    #[test]
    fn test_access_token_wrong_key_fails() {
        let encoder = AccessTokenEncoder::new("secret", 3600);
        let (token, _) = encoder.create(&sample_user()).unwrap();
        let other = AccessTokenEncoder::new("other-secret", 3600);
        assert!(matches!(other.validate(&token), Err(IamError::InvalidToken)));
    }

    #[test]
    fn test_access_token_garbage_fails() {
        let encoder = AccessTokenEncoder::new("secret", 3600);
        assert!(matches!(
            encoder.validate("not-a-token"),
            Err(IamError::InvalidToken)
        ));
    }

    #[test]
    fn test_opaque_refresh_token_shape() {
        let (token, expires) = new_opaque_refresh_token(60);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(expires > Utc::now());
    }

    #[test]
    fn test_signed_refresh_token() {
        let encoder = RefreshTokenEncoder::new("xxxxx", 1);
        let (token, _) = encoder.create(12).unwrap();
        assert_eq!(encoder.validate(&token).unwrap(), 12);

        // expired
        let expired = RefreshTokenEncoder::new("xxxxx", -1);
        let (token, _) = expired.create(12).unwrap();
        assert!(matches!(
            expired.validate(&token),
            Err(IamError::InvalidRefreshToken)
        ));

        // structurally invalid
        assert!(matches!(
            encoder.validate("asdfas.dfasdf"),
            Err(IamError::InvalidRefreshToken)
        ));
        assert!(matches!(
            encoder.validate("no-dot-at-all"),
            Err(IamError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn test_tampered_envelope_fails() {
        let encoder = RefreshTokenEncoder::new("xxxxx", 60);
        let (token, _) = encoder.create(7).unwrap();

        // flip one byte of the payload half
        let mut bytes = token.into_bytes();
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(matches!(
            encoder.validate(&tampered),
            Err(IamError::InvalidRefreshToken)
        ));
    }
}
