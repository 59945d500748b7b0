//! Raw reference-catalog rows, as delivered by the reference-data provider.

use serde::{Deserialize, Serialize};

use dormgate_core::{PermissionId, RecordId, RoleId};

use crate::{Permission, Role};

/// Row of the role catalog (source of truth for valid role names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: Role,
}

/// Row of the permission catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub name: Permission,
}

/// Many-to-many link between a role and a permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleLink {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

/// Dormitory zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Kind of inspection that can be performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckType {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Grouping of checklist items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistCategory {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Single item on an inspection checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: RecordId,
    pub category_id: RecordId,
    pub name: String,
}
