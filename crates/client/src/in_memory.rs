//! In-memory providers for tests/dev.
//!
//! - No network
//! - Results are configurable at any time
//! - Optional gating (`pause`/`resume`) to hold fetches in flight

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use dormgate_auth::{
    CheckType, ChecklistCategory, ChecklistItem, PermissionRecord, RoleLink, RoleRecord, Zone,
};

use crate::catalogs::ReferenceCatalogs;
use crate::error::{AuthError, CatalogSource, FetchFailure};
use crate::providers::{IdentityProvider, ReferenceDataProvider};

/// Open/closed valve that in-flight fetches wait on.
#[derive(Debug)]
struct Valve {
    tx: watch::Sender<bool>,
}

impl Valve {
    fn open() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx }
    }

    fn set(&self, open: bool) {
        self.tx.send_replace(open);
    }

    async fn pass(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// Identity provider returning a configurable role.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    role: Mutex<Result<Option<String>, String>>,
    calls: AtomicUsize,
    valve: Valve,
}

impl InMemoryIdentityProvider {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Mutex::new(Ok(Some(role.into()))),
            calls: AtomicUsize::new(0),
            valve: Valve::open(),
        }
    }

    pub fn without_role() -> Self {
        Self {
            role: Mutex::new(Ok(None)),
            calls: AtomicUsize::new(0),
            valve: Valve::open(),
        }
    }

    pub fn set_role(&self, role: Option<&str>) {
        if let Ok(mut guard) = self.role.lock() {
            *guard = Ok(role.map(str::to_string));
        }
    }

    /// Make subsequent lookups fail with `message`.
    pub fn fail(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.role.lock() {
            *guard = Err(message.into());
        }
    }

    /// Hold lookups in flight until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.valve.set(false);
    }

    pub fn resume(&self) {
        self.valve.set(true);
    }

    /// Number of lookups started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn fetch_current_role(&self) -> Result<Option<String>, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.valve.pass().await;

        let guard = self
            .role
            .lock()
            .map_err(|_| AuthError::IdentityFetch("in-memory provider lock poisoned".to_string()))?;
        guard.clone().map_err(AuthError::IdentityFetch)
    }
}

/// Reference-data provider serving a fixed batch of catalogs.
#[derive(Debug)]
pub struct InMemoryReferenceData {
    catalogs: Mutex<ReferenceCatalogs>,
    failure: Mutex<Option<FetchFailure>>,
    batches: AtomicUsize,
    valve: Valve,
}

impl InMemoryReferenceData {
    pub fn new(catalogs: ReferenceCatalogs) -> Self {
        Self {
            catalogs: Mutex::new(catalogs),
            failure: Mutex::new(None),
            batches: AtomicUsize::new(0),
            valve: Valve::open(),
        }
    }

    pub fn replace(&self, catalogs: ReferenceCatalogs) {
        if let Ok(mut guard) = self.catalogs.lock() {
            *guard = catalogs;
        }
    }

    /// Make reads of `source` fail with `message` until [`recover`](Self::recover).
    pub fn fail_on(&self, source: CatalogSource, message: impl Into<String>) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = Some(FetchFailure::new(source, message));
        }
    }

    pub fn recover(&self) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = None;
        }
    }

    pub fn pause(&self) {
        self.valve.set(false);
    }

    pub fn resume(&self) {
        self.valve.set(true);
    }

    /// Number of batches started so far (counted on the zones read).
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    async fn read<T>(
        &self,
        source: CatalogSource,
        select: impl FnOnce(&ReferenceCatalogs) -> Vec<T>,
    ) -> Result<Vec<T>, FetchFailure> {
        self.valve.pass().await;

        let poisoned = || FetchFailure::new(source, "in-memory provider lock poisoned");

        if let Some(failure) = self.failure.lock().map_err(|_| poisoned())?.as_ref() {
            if failure.catalog == source {
                return Err(failure.clone());
            }
        }

        let guard = self.catalogs.lock().map_err(|_| poisoned())?;
        Ok(select(&guard))
    }
}

#[async_trait]
impl ReferenceDataProvider for InMemoryReferenceData {
    async fn fetch_zones(&self) -> Result<Vec<Zone>, FetchFailure> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.read(CatalogSource::Zones, |c| c.zones.clone()).await
    }

    async fn fetch_check_types(&self) -> Result<Vec<CheckType>, FetchFailure> {
        self.read(CatalogSource::CheckTypes, |c| c.check_types.clone())
            .await
    }

    async fn fetch_checklist_categories(&self) -> Result<Vec<ChecklistCategory>, FetchFailure> {
        self.read(CatalogSource::ChecklistCategories, |c| {
            c.checklist_categories.clone()
        })
        .await
    }

    async fn fetch_checklist_items(&self) -> Result<Vec<ChecklistItem>, FetchFailure> {
        self.read(CatalogSource::ChecklistItems, |c| c.checklist_items.clone())
            .await
    }

    async fn fetch_roles(&self) -> Result<Vec<RoleRecord>, FetchFailure> {
        self.read(CatalogSource::Roles, |c| c.roles.clone()).await
    }

    async fn fetch_permissions(&self) -> Result<Vec<PermissionRecord>, FetchFailure> {
        self.read(CatalogSource::Permissions, |c| c.permissions.clone())
            .await
    }

    async fn fetch_role_links(&self) -> Result<Vec<RoleLink>, FetchFailure> {
        self.read(CatalogSource::RoleLinks, |c| c.role_links.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fetch_reference_catalogs;

    #[tokio::test]
    async fn identity_provider_reports_configured_role_and_failures() {
        let provider = InMemoryIdentityProvider::with_role("inspector");
        assert_eq!(
            provider.fetch_current_role().await.unwrap(),
            Some("inspector".to_string())
        );

        provider.fail("rpc down");
        assert_eq!(
            provider.fetch_current_role().await.unwrap_err(),
            AuthError::IdentityFetch("rpc down".to_string())
        );
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn role_can_be_assigned_after_construction() {
        let provider = InMemoryIdentityProvider::without_role();
        assert_eq!(provider.fetch_current_role().await.unwrap(), None);

        provider.set_role(Some("admin"));
        assert_eq!(
            provider.fetch_current_role().await.unwrap(),
            Some("admin".to_string())
        );

        provider.fail("rpc down");
        provider.set_role(None);
        assert_eq!(provider.fetch_current_role().await.unwrap(), None);
    }

    #[tokio::test]
    async fn paused_reads_wait_for_resume() {
        let provider = std::sync::Arc::new(InMemoryReferenceData::new(ReferenceCatalogs::default()));
        provider.pause();

        let task = {
            let provider = provider.clone();
            tokio::spawn(async move { fetch_reference_catalogs(provider.as_ref()).await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        provider.resume();
        assert!(task.await.unwrap().is_ok());
        assert_eq!(provider.batches(), 1);
    }

    #[tokio::test]
    async fn failure_is_scoped_to_one_source() {
        let provider = InMemoryReferenceData::new(ReferenceCatalogs::default());
        provider.fail_on(CatalogSource::Permissions, "denied");

        assert!(provider.fetch_zones().await.is_ok());
        let err = provider.fetch_permissions().await.unwrap_err();
        assert_eq!(err.catalog, CatalogSource::Permissions);

        provider.recover();
        assert!(provider.fetch_permissions().await.is_ok());
    }
}
