//! `dormgate-auth` — pure role/permission model (no IO, no async).
//!
//! Turns raw reference catalogs into a role → permission mapping and answers
//! "does this role carry this permission".

pub mod authorize;
pub mod catalog;
pub mod permission_map;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, DecisionExplanation, DenialKind, authorize, explain};
pub use catalog::{
    CheckType, ChecklistCategory, ChecklistItem, PermissionRecord, RoleLink, RoleRecord, Zone,
};
pub use permission_map::{PermissionMap, PermissionMapError, build_permission_map};
pub use permissions::Permission;
pub use roles::{Role, SUPERADMIN};
