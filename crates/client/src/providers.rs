//! External collaborators, specified at their interface only.

use async_trait::async_trait;

use dormgate_auth::{
    CheckType, ChecklistCategory, ChecklistItem, PermissionRecord, RoleLink, RoleRecord, Zone,
};

use crate::catalogs::ReferenceCatalogs;
use crate::error::{AuthError, FetchFailure};

/// Identity provider: answers "what role does the signed-in subject have".
///
/// Identity *events* are pushed into the runtime through
/// [`AuthorizationHandle::identity_event`](crate::AuthorizationHandle::identity_event).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Role name of the current subject, `None` if the provider has none.
    ///
    /// Failures are reported as [`AuthError::IdentityFetch`].
    async fn fetch_current_role(&self) -> Result<Option<String>, AuthError>;
}

/// Reference-data provider: one independently failable read per catalog.
#[async_trait]
pub trait ReferenceDataProvider: Send + Sync {
    async fn fetch_zones(&self) -> Result<Vec<Zone>, FetchFailure>;

    async fn fetch_check_types(&self) -> Result<Vec<CheckType>, FetchFailure>;

    async fn fetch_checklist_categories(&self) -> Result<Vec<ChecklistCategory>, FetchFailure>;

    async fn fetch_checklist_items(&self) -> Result<Vec<ChecklistItem>, FetchFailure>;

    async fn fetch_roles(&self) -> Result<Vec<RoleRecord>, FetchFailure>;

    async fn fetch_permissions(&self) -> Result<Vec<PermissionRecord>, FetchFailure>;

    async fn fetch_role_links(&self) -> Result<Vec<RoleLink>, FetchFailure>;
}

/// Issue every catalog read concurrently and collect them into one batch.
///
/// The first failing read voids the batch; nothing fetched alongside it is
/// returned.
pub async fn fetch_reference_catalogs(
    provider: &dyn ReferenceDataProvider,
) -> Result<ReferenceCatalogs, FetchFailure> {
    let (
        zones,
        check_types,
        checklist_categories,
        checklist_items,
        roles,
        permissions,
        role_links,
    ) = tokio::try_join!(
        provider.fetch_zones(),
        provider.fetch_check_types(),
        provider.fetch_checklist_categories(),
        provider.fetch_checklist_items(),
        provider.fetch_roles(),
        provider.fetch_permissions(),
        provider.fetch_role_links(),
    )?;

    Ok(ReferenceCatalogs {
        zones,
        check_types,
        checklist_categories,
        checklist_items,
        roles,
        permissions,
        role_links,
    })
}
