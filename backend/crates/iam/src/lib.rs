//! IAM (Identity and Access Management) Backend Module
//!
//! Layered structure:
//! - `domain/` - Entities and the repository traits collaborators implement
//! - `application/` - Security policy, token encoders, extractors, authorization
//! - `infra/` - PostgreSQL repository implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Email + password login with uniform failure timing
//! - Signed access tokens (HS256 JWT) carrying the principal set
//! - Two interchangeable session modes behind one policy type:
//!   store-backed revocable sessions or self-contained signed tokens
//! - Refresh-token rotation
//!
//! ## Security Model
//! - Passwords hashed with algorithm-tagged Argon2id on a bounded pool
//! - Failed logins answered after a randomized delay, with one generic error
//! - Access-token validation never distinguishes signature, structure and
//!   expiry failures

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;
pub mod testing;


// Re-exports for convenience
pub use application::authz::RequirePrincipal;
pub use application::config::IamConfig;
pub use application::extract::{Credential, CredentialExtractor};
pub use application::policy::{SecurityPolicy, SessionKind};
pub use error::{IamError, IamResult};
pub use infra::postgres::{PgSessionStore, PgUserDirectory};
pub use presentation::router::iam_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::session::UserSession;
    pub use crate::domain::entity::user::{NewUser, PublicUser, User, UserPatch};
    pub use crate::presentation::dto::*;
}
