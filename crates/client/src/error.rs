//! Error taxonomy for the readiness core.
//!
//! Fetch errors never reach the navigation layer as errors: the coordinator
//! folds them into store flags and the `Degraded` phase.

use thiserror::Error;

use dormgate_auth::PermissionMapError;
use dormgate_core::Generation;

/// One of the independent reads in the reference-data batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogSource {
    Zones,
    CheckTypes,
    ChecklistCategories,
    ChecklistItems,
    Roles,
    Permissions,
    RoleLinks,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSource::Zones => "zones",
            CatalogSource::CheckTypes => "check_types",
            CatalogSource::ChecklistCategories => "checklist_categories",
            CatalogSource::ChecklistItems => "checklist_items",
            CatalogSource::Roles => "roles",
            CatalogSource::Permissions => "permissions",
            CatalogSource::RoleLinks => "role_links",
        }
    }
}

impl core::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog read failed; the whole batch is void.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to load {catalog}: {message}")]
pub struct FetchFailure {
    /// Which read failed.
    pub catalog: CatalogSource,
    pub message: String,
}

impl FetchFailure {
    pub fn new(catalog: CatalogSource, message: impl Into<String>) -> Self {
        Self {
            catalog,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The role lookup RPC failed.
    #[error("identity fetch failed: {0}")]
    IdentityFetch(String),

    /// A catalog read in the reference-data batch failed.
    #[error("config fetch failed: {0}")]
    ConfigFetch(#[from] FetchFailure),

    /// The permission map could not be built from the fetched catalogs.
    #[error(transparent)]
    EmptyCatalog(#[from] PermissionMapError),

    /// The resolved role name is not in the role catalog.
    #[error("invalid role: '{0}'")]
    InvalidRole(String),

    /// A result arrived for a generation that is no longer current.
    #[error("stale result discarded (issued under {result_generation}, current {current_generation})")]
    StaleResultDiscarded {
        result_generation: Generation,
        current_generation: Generation,
    },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// A bounded wait elapsed before readiness was reached.
    #[error("authorization not ready before timeout")]
    NotReady,

    /// The coordinator runtime has shut down; readiness can no longer change.
    #[error("authorization coordinator stopped")]
    CoordinatorStopped,
}
