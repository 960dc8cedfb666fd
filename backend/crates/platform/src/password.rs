//! Password Hashing and Verification
//!
//! Algorithm-tagged Argon2id hashing. Stored values use the format
//! `"<algorithm>:<salt>:<digest>"` so alternate algorithms can coexist
//! with already-stored hashes. Verification fails closed: a malformed
//! value or an unknown algorithm tag is simply "no match", never an
//! error the caller has to handle.
//!
//! Hashing and verification are CPU-bound, so the async entry points
//! run them on `spawn_blocking` behind a bounded semaphore. The bound
//! caps concurrent hashing work and provides natural backpressure when
//! a burst of logins arrives.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier, password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tokio::sync::Semaphore;
use zeroize::Zeroize;

/// Algorithm tag embedded in stored values.
pub const ALGORITHM: &str = "argon2";

/// Default size of the hashing pool.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// The blocking pool was shut down or the task panicked
    #[error("Hashing pool unavailable: {0}")]
    Pool(String),
}

/// Argon2id password hasher with a bounded blocking pool.
///
/// One instance is constructed at startup and shared; `Clone` is cheap
/// and clones share the same concurrency budget.
#[derive(Clone)]
pub struct PasswordHasher {
    permits: Arc<Semaphore>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl PasswordHasher {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Hash `password`, producing an algorithm-tagged stored value.
    ///
    /// `salt` defaults to a fresh random 128-bit hex value per call.
    pub async fn hash(
        &self,
        password: &str,
        salt: Option<String>,
    ) -> Result<String, PasswordHashError> {
        let salt = salt.unwrap_or_else(|| crate::crypto::random_hex(16));
        let password = password.to_string();

        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PasswordHashError::Pool(e.to_string()))?;

        tokio::task::spawn_blocking(move || hash_blocking(&password, &salt))
            .await
            .map_err(|e| PasswordHashError::Pool(e.to_string()))?
    }

    /// Verify `candidate` against a stored tagged value.
    ///
    /// Returns `Ok(false)` for any malformed or foreign-algorithm value.
    /// Only pool failures surface as errors.
    pub async fn check(
        &self,
        stored: &str,
        candidate: &str,
    ) -> Result<bool, PasswordHashError> {
        // Cheap rejection before taking a pool slot.
        if parse_tagged(stored).is_none() {
            return Ok(false);
        }

        let stored = stored.to_string();
        let candidate = candidate.to_string();

        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PasswordHashError::Pool(e.to_string()))?;

        tokio::task::spawn_blocking(move || verify_blocking(&stored, &candidate))
            .await
            .map_err(|e| PasswordHashError::Pool(e.to_string()))
    }
}

/// Split `"<algorithm>:<salt>:<digest>"`, requiring our algorithm tag.
fn parse_tagged(stored: &str) -> Option<(&str, &str)> {
    let mut parts = stored.splitn(3, ':');
    let algorithm = parts.next()?;
    let salt = parts.next()?;
    let digest = parts.next()?;
    if algorithm != ALGORITHM {
        return None;
    }
    Some((salt, digest))
}

/// Synchronous hash. The digest is the Argon2id PHC string of
/// `password || salt`; Argon2 adds its own internal salt on top.
pub fn hash_blocking(password: &str, salt: &str) -> Result<String, PasswordHashError> {
    let mut combined = format!("{password}{salt}");

    let phc_salt = SaltString::generate(&mut OsRng);
    let result = Argon2::default()
        .hash_password(combined.as_bytes(), &phc_salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));

    combined.zeroize();

    let digest = result?;
    Ok(format!("{ALGORITHM}:{salt}:{digest}"))
}

/// Synchronous verify. Equal-cost comparison is delegated to the
/// argon2 verifier; callers must not pre-filter on digest length.
pub fn verify_blocking(stored: &str, candidate: &str) -> bool {
    let Some((salt, digest)) = parse_tagged(stored) else {
        return false;
    };
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };

    let mut combined = format!("{candidate}{salt}");
    let ok = Argon2::default()
        .verify_password(combined.as_bytes(), &parsed)
        .is_ok();
    combined.zeroize();
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_blocking("asdf", "somesalt").unwrap();
        assert!(stored.starts_with("argon2:somesalt:$argon2"));
        assert!(verify_blocking(&stored, "asdf"));
        assert!(!verify_blocking(&stored, "asdf2"));
    }

    #[test]
    fn test_malformed_value_fails_closed() {
        assert!(!verify_blocking("", "asdf"));
        assert!(!verify_blocking("argon2:onlysalt", "asdf"));
        assert!(!verify_blocking("argon2:salt:not-a-phc-string", "asdf"));
    }

    #[test]
    fn test_unknown_algorithm_tag_fails_closed() {
        let stored = hash_blocking("asdf", "s").unwrap();
        let foreign = stored.replacen("argon2", "bcrypt", 1);
        assert!(!verify_blocking(&foreign, "asdf"));
    }

    #[test]
    fn test_salt_changes_digest() {
        let a = hash_blocking("pw", "salt-a").unwrap();
        let b = hash_blocking("pw", "salt-b").unwrap();
        assert_ne!(a, b);
        assert!(verify_blocking(&a, "pw"));
        assert!(verify_blocking(&b, "pw"));
    }

    #[tokio::test]
    async fn test_async_pool_paths() {
        let hasher = PasswordHasher::new(2);
        let stored = hasher.hash("secret", None).await.unwrap();
        assert!(hasher.check(&stored, "secret").await.unwrap());
        assert!(!hasher.check(&stored, "wrong").await.unwrap());
        // malformed input short-circuits without touching the pool
        assert!(!hasher.check("garbage", "secret").await.unwrap());
    }

    #[tokio::test]
    async fn test_fresh_salt_per_hash() {
        let hasher = PasswordHasher::default();
        let a = hasher.hash("pw", None).await.unwrap();
        let b = hasher.hash("pw", None).await.unwrap();
        assert_ne!(a, b);
    }
}
