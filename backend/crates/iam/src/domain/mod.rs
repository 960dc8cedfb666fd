//! Domain Layer
//!
//! Entities and the repository traits external collaborators implement.

pub mod entity;
pub mod repository;
