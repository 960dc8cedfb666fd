//! Application Layer
//!
//! The security policy and its collaborators.

pub mod authz;
pub mod config;
pub mod extract;
pub mod policy;
pub mod token;

pub use authz::RequirePrincipal;
pub use config::IamConfig;
pub use extract::{BasicExtractor, BearerExtractor, Credential, CredentialExtractor};
pub use policy::{SecurityPolicy, SessionKind};
