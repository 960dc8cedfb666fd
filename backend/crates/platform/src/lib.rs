//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the IAM backend:
//! - Cryptographic utilities (SHA-256, HMAC-SHA256, Base64, randomness)
//! - Password hashing (algorithm-tagged Argon2id, bounded blocking pool)
//! - Cookie construction and extraction

pub mod cookie;
pub mod crypto;
pub mod password;
