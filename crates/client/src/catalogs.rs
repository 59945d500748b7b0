//! The reference-data batch as one value.

use serde::{Deserialize, Serialize};

use dormgate_auth::{
    CheckType, ChecklistCategory, ChecklistItem, PermissionMap, PermissionMapError,
    PermissionRecord, RoleLink, RoleRecord, Zone, build_permission_map,
};

/// Every catalog fetched in one reference-data batch.
///
/// Catalogs from different batches are never mixed: a batch is accepted or
/// discarded as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCatalogs {
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub check_types: Vec<CheckType>,
    #[serde(default)]
    pub checklist_categories: Vec<ChecklistCategory>,
    #[serde(default)]
    pub checklist_items: Vec<ChecklistItem>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
    #[serde(default)]
    pub role_links: Vec<RoleLink>,
}

impl ReferenceCatalogs {
    /// Parse a JSON document holding all catalogs (fixtures, dev data).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether the authorization catalogs are loaded (a cache-valid batch).
    pub fn is_loaded(&self) -> bool {
        !self.roles.is_empty() && !self.permissions.is_empty()
    }

    /// Whether `name` is a catalogued role.
    pub fn contains_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name.as_str() == name)
    }

    pub fn build_permission_map(&self) -> Result<PermissionMap, PermissionMapError> {
        build_permission_map(&self.roles, &self.permissions, &self.role_links)
    }
}
