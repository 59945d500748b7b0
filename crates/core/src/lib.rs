//! `dormgate-core` — shared primitives for the authorization readiness core.
//!
//! This crate contains **pure** building blocks (no IO, no async).

pub mod error;
pub mod generation;
pub mod id;

pub use error::DomainError;
pub use generation::Generation;
pub use id::{PermissionId, RecordId, RoleId, SubjectId};
