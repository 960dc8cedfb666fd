//! Shared Kernel - Domain-crossing minimal core
//!
//! The smallest vocabulary shared by every backend crate:
//! - Error classification ([`error::kind::ErrorKind`]) mapped to HTTP statuses
//! - The unified application error envelope ([`error::app_error::AppError`])
//! - Conversions from infrastructure errors into the envelope
//!
//! **Design Principle**: only things that are hard to change and mean the
//! same thing in every domain belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
