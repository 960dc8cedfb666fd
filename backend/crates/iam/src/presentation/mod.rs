//! Presentation Layer
//!
//! HTTP surface: DTOs, handlers, router.

pub mod dto;
pub mod handlers;
pub mod router;
