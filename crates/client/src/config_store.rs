//! Reference-config store: the single writer of [`ConfigState`].

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use dormgate_auth::PermissionMap;
use dormgate_core::Generation;

use crate::catalogs::ReferenceCatalogs;
use crate::error::AuthError;
use crate::providers::{ReferenceDataProvider, fetch_reference_catalogs};
use crate::state::ConfigState;

/// Owner of the reference catalogs and the permission map built from them.
///
/// The map is only ever replaced together with the batch it was built from.
/// A failed fetch or build leaves the last-good pair in place and sets `error`.
#[derive(Debug)]
pub struct ConfigStore {
    tx: watch::Sender<ConfigState>,
}

impl ConfigStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConfigState::default());
        Self { tx }
    }

    pub fn view(&self) -> ConfigView {
        ConfigView {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> ConfigState {
        self.tx.borrow().clone()
    }

    /// Mark a fetch for `generation` as started: `loading=true`, error cleared.
    pub fn begin_fetch(&mut self, generation: Generation) {
        self.tx.send_modify(|s| {
            s.generation = generation;
            s.loading = true;
            s.error = None;
        });
    }

    /// Complete a fetch with its batch (or its failure).
    ///
    /// A successful batch is only installed if its permission map builds; a
    /// build failure is recorded exactly like a fetch failure. `loading` is
    /// cleared on every path.
    pub fn finish_fetch(
        &mut self,
        generation: Generation,
        result: Result<ReferenceCatalogs, AuthError>,
    ) -> Result<(), AuthError> {
        let built = result.and_then(|catalogs| {
            let map = catalogs.build_permission_map()?;
            Ok((catalogs, map))
        });

        match built {
            Ok((catalogs, map)) => {
                info!(
                    zones = catalogs.zones.len(),
                    check_types = catalogs.check_types.len(),
                    categories = catalogs.checklist_categories.len(),
                    items = catalogs.checklist_items.len(),
                    roles = catalogs.roles.len(),
                    permissions = catalogs.permissions.len(),
                    links = catalogs.role_links.len(),
                    "reference config loaded"
                );
                self.tx.send_modify(|s| {
                    s.generation = generation;
                    s.catalogs = Arc::new(catalogs);
                    s.permission_map = Arc::new(map);
                    s.error = None;
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "reference config load failed");
                self.tx.send_modify(|s| {
                    s.generation = generation;
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
                Err(e)
            }
        }
    }

    /// Fetch every catalog from `provider` and rebuild the permission map.
    pub async fn fetch_all(
        &mut self,
        generation: Generation,
        provider: &dyn ReferenceDataProvider,
    ) -> Result<(), AuthError> {
        self.begin_fetch(generation);
        let result = fetch_reference_catalogs(provider)
            .await
            .map_err(AuthError::from);
        self.finish_fetch(generation, result)
    }

    /// Carry the held batch over to `generation` without refetching.
    pub fn adopt(&mut self, generation: Generation) {
        self.tx.send_modify(|s| s.generation = generation);
    }

    /// Drop all catalogs and the map (sign-out).
    pub fn clear(&mut self, generation: Generation) {
        self.tx.send_modify(|s| {
            *s = ConfigState {
                generation,
                ..ConfigState::default()
            }
        });
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the config state.
#[derive(Debug, Clone)]
pub struct ConfigView {
    rx: watch::Receiver<ConfigState>,
}

impl ConfigView {
    pub fn snapshot(&self) -> ConfigState {
        self.rx.borrow().clone()
    }

    pub fn generation(&self) -> Generation {
        self.rx.borrow().generation
    }

    pub fn loading(&self) -> bool {
        self.rx.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.rx.borrow().error.clone()
    }

    pub fn catalogs(&self) -> Arc<ReferenceCatalogs> {
        Arc::clone(&self.rx.borrow().catalogs)
    }

    pub fn permission_map(&self) -> Arc<PermissionMap> {
        Arc::clone(&self.rx.borrow().permission_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogSource, FetchFailure};
    use crate::in_memory::InMemoryReferenceData;

    const G1: Generation = Generation::from_u64(1);

    fn fixture() -> ReferenceCatalogs {
        ReferenceCatalogs::from_json(
            r#"{
                "zones": [{"id": 1, "name": "North"}],
                "roles": [{"id": 1, "name": "inspector"}],
                "permissions": [{"id": 9, "name": "manage_zones"}],
                "role_links": [{"role_id": 1, "permission_id": 9}]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_all_installs_catalogs_and_map() {
        let provider = InMemoryReferenceData::new(fixture());
        let mut store = ConfigStore::new();
        let view = store.view();

        store.fetch_all(G1, &provider).await.unwrap();

        assert!(!view.loading());
        assert_eq!(view.error(), None);
        assert_eq!(view.catalogs().zones.len(), 1);
        assert!(view.permission_map().grants("inspector", "manage_zones"));
    }

    #[tokio::test]
    async fn single_read_failure_voids_the_batch() {
        let provider = InMemoryReferenceData::new(fixture());
        let mut store = ConfigStore::new();
        store.fetch_all(G1, &provider).await.unwrap();

        let mut changed = fixture();
        changed.zones.clear();
        provider.replace(changed);
        provider.fail_on(CatalogSource::RoleLinks, "timeout");

        let err = store.fetch_all(G1, &provider).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::ConfigFetch(FetchFailure::new(CatalogSource::RoleLinks, "timeout"))
        );

        let state = store.snapshot();
        assert!(!state.loading);
        assert!(state.error.is_some());
        // Last-good batch is untouched.
        assert_eq!(state.catalogs.zones.len(), 1);
        assert!(state.permission_map.grants("inspector", "manage_zones"));
    }

    #[tokio::test]
    async fn empty_role_catalog_is_a_load_failure() {
        let mut catalogs = fixture();
        catalogs.roles.clear();
        let provider = InMemoryReferenceData::new(catalogs);
        let mut store = ConfigStore::new();

        let err = store.fetch_all(G1, &provider).await.unwrap_err();

        assert!(matches!(err, AuthError::EmptyCatalog(_)));
        let state = store.snapshot();
        assert!(state.error.is_some());
        assert!(state.permission_map.is_empty());
        assert!(!state.catalogs.is_loaded());
    }

    #[test]
    fn begin_fetch_clears_previous_error() {
        let mut store = ConfigStore::new();
        let _ = store.finish_fetch(G1, Err(AuthError::ConfigFetch(FetchFailure::new(
            CatalogSource::Zones,
            "boom",
        ))));
        assert!(store.snapshot().error.is_some());

        store.begin_fetch(Generation::from_u64(2));

        let state = store.snapshot();
        assert_eq!(state.generation, Generation::from_u64(2));
        assert!(state.loading);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let provider = InMemoryReferenceData::new(fixture());
        let mut store = ConfigStore::new();
        store.fetch_all(G1, &provider).await.unwrap();

        store.clear(Generation::from_u64(2));

        assert_eq!(
            store.snapshot(),
            ConfigState {
                generation: Generation::from_u64(2),
                ..ConfigState::default()
            }
        );
    }

    #[tokio::test]
    async fn adopt_moves_the_batch_to_a_new_generation() {
        let provider = InMemoryReferenceData::new(fixture());
        let mut store = ConfigStore::new();
        store.fetch_all(G1, &provider).await.unwrap();
        let before = store.snapshot();

        store.adopt(Generation::from_u64(2));

        let after = store.snapshot();
        assert_eq!(after.generation, Generation::from_u64(2));
        assert_eq!(after.catalogs, before.catalogs);
        assert_eq!(provider.batches(), 1);
    }
}
