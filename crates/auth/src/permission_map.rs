//! Role → permission mapping, built from the raw catalogs.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tracing::warn;

use dormgate_core::{PermissionId, RoleId};

use crate::{Permission, PermissionRecord, Role, RoleLink, RoleRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionMapError {
    /// A required catalog was empty, so the map cannot be trusted as complete.
    #[error("cannot build permission map: {catalog} catalog is empty")]
    EmptyCatalog { catalog: &'static str },
}

/// Mapping from role name to the set of permission names it carries.
///
/// A map is always produced whole by [`build_permission_map`] and replaces its
/// predecessor; it is never merged or edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionMap {
    grants: HashMap<Role, BTreeSet<Permission>>,
}

impl PermissionMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `role` carries `permission`. Unknown roles carry nothing.
    pub fn grants(&self, role: &str, permission: &str) -> bool {
        self.grants
            .get(role)
            .is_some_and(|perms| perms.contains(permission))
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.grants.contains_key(role)
    }

    /// Permissions carried by `role`, or `None` if the role is not in the map.
    pub fn permissions_for(&self, role: &str) -> Option<&BTreeSet<Permission>> {
        self.grants.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.grants.keys()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Build a [`PermissionMap`] from the role, permission and link catalogs.
///
/// - No IO
/// - Every catalogued role appears in the output, possibly with no permissions
/// - Links whose ids cannot be resolved are skipped and logged
///
/// Fails when `roles` or `permissions` is empty; callers treat that exactly
/// like a failed fetch.
pub fn build_permission_map(
    roles: &[RoleRecord],
    permissions: &[PermissionRecord],
    links: &[RoleLink],
) -> Result<PermissionMap, PermissionMapError> {
    if roles.is_empty() {
        return Err(PermissionMapError::EmptyCatalog { catalog: "roles" });
    }
    if permissions.is_empty() {
        return Err(PermissionMapError::EmptyCatalog {
            catalog: "permissions",
        });
    }

    let role_names: HashMap<&RoleId, &Role> = roles.iter().map(|r| (&r.id, &r.name)).collect();
    let permission_names: HashMap<&PermissionId, &Permission> =
        permissions.iter().map(|p| (&p.id, &p.name)).collect();

    let mut grants: HashMap<Role, BTreeSet<Permission>> = roles
        .iter()
        .map(|r| (r.name.clone(), BTreeSet::new()))
        .collect();

    for link in links {
        let Some(role) = role_names.get(&link.role_id) else {
            warn!(
                role_id = %link.role_id,
                permission_id = %link.permission_id,
                "role link references unknown role id; skipping"
            );
            continue;
        };
        let Some(permission) = permission_names.get(&link.permission_id) else {
            warn!(
                role_id = %link.role_id,
                permission_id = %link.permission_id,
                "role link references unknown permission id; skipping"
            );
            continue;
        };

        grants
            .entry((*role).clone())
            .or_default()
            .insert((*permission).clone());
    }

    Ok(PermissionMap { grants })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: u64, name: &'static str) -> RoleRecord {
        RoleRecord {
            id: RoleId::from(id),
            name: Role::new(name),
        }
    }

    fn perm(id: u64, name: &'static str) -> PermissionRecord {
        PermissionRecord {
            id: PermissionId::from(id),
            name: Permission::new(name),
        }
    }

    fn link(role_id: u64, permission_id: u64) -> RoleLink {
        RoleLink {
            role_id: RoleId::from(role_id),
            permission_id: PermissionId::from(permission_id),
        }
    }

    #[test]
    fn builds_single_role_mapping() {
        let map = build_permission_map(
            &[role(1, "inspector")],
            &[perm(9, "manage_zones")],
            &[link(1, 9)],
        )
        .unwrap();

        assert_eq!(map.len(), 1);
        assert!(map.grants("inspector", "manage_zones"));
        assert!(!map.grants("auditor", "manage_zones"));

        let perms: Vec<&str> = map
            .permissions_for("inspector")
            .unwrap()
            .iter()
            .map(|p| p.as_str())
            .collect();
        assert_eq!(perms, vec!["manage_zones"]);
    }

    #[test]
    fn empty_roles_is_an_error() {
        let err = build_permission_map(&[], &[perm(9, "manage_zones")], &[]).unwrap_err();
        assert_eq!(err, PermissionMapError::EmptyCatalog { catalog: "roles" });
    }

    #[test]
    fn empty_permissions_is_an_error() {
        let err = build_permission_map(&[role(1, "inspector")], &[], &[]).unwrap_err();
        assert_eq!(
            err,
            PermissionMapError::EmptyCatalog {
                catalog: "permissions"
            }
        );
    }

    #[test]
    fn no_links_maps_every_role_to_nothing() {
        let map = build_permission_map(
            &[role(1, "inspector"), role(2, "admin")],
            &[perm(9, "manage_zones")],
            &[],
        )
        .unwrap();

        assert_eq!(map.len(), 2);
        assert!(map.permissions_for("inspector").unwrap().is_empty());
        assert!(map.permissions_for("admin").unwrap().is_empty());
    }

    #[test]
    fn dangling_links_are_skipped() {
        let map = build_permission_map(
            &[role(1, "inspector")],
            &[perm(9, "manage_zones"), perm(10, "manage_rooms")],
            &[link(1, 9), link(42, 10), link(1, 77)],
        )
        .unwrap();

        let perms = map.permissions_for("inspector").unwrap();
        assert_eq!(perms.len(), 1);
        assert!(perms.contains("manage_zones"));
    }

    #[test]
    fn many_to_many_links_resolve() {
        let map = build_permission_map(
            &[role(1, "inspector"), role(2, "admin")],
            &[perm(9, "manage_zones"), perm(10, "manage_users")],
            &[link(1, 9), link(2, 9), link(2, 10)],
        )
        .unwrap();

        assert!(map.grants("inspector", "manage_zones"));
        assert!(!map.grants("inspector", "manage_users"));
        assert!(map.grants("admin", "manage_zones"));
        assert!(map.grants("admin", "manage_users"));
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let roles = [role(1, "inspector"), role(2, "admin")];
        let perms = [perm(9, "manage_zones"), perm(10, "manage_users")];
        let links = [link(2, 10), link(1, 9)];

        let a = build_permission_map(&roles, &perms, &links).unwrap();
        let b = build_permission_map(&roles, &perms, &links).unwrap();
        assert_eq!(a, b);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        const ROLE_NAMES: [&str; 4] = ["inspector", "admin", "auditor", "warden"];
        const PERMISSION_NAMES: [&str; 4] =
            ["manage_zones", "manage_rooms", "manage_users", "read_all_reports"];

        proptest! {
            /// Property: a role carries a permission iff some link resolves to both.
            #[test]
            fn grants_match_resolvable_links(
                raw_links in proptest::collection::vec((0u64..6, 0u64..6), 0..24)
            ) {
                let roles: Vec<RoleRecord> = ROLE_NAMES
                    .iter()
                    .enumerate()
                    .map(|(i, n)| role(i as u64, *n))
                    .collect();
                let perms: Vec<PermissionRecord> = PERMISSION_NAMES
                    .iter()
                    .enumerate()
                    .map(|(i, n)| perm(i as u64, *n))
                    .collect();
                let links: Vec<RoleLink> = raw_links.iter().map(|(r, p)| link(*r, *p)).collect();

                let map = build_permission_map(&roles, &perms, &links).unwrap();

                prop_assert_eq!(map.len(), ROLE_NAMES.len());
                for (ri, role_name) in ROLE_NAMES.iter().enumerate() {
                    for (pi, perm_name) in PERMISSION_NAMES.iter().enumerate() {
                        let linked = raw_links
                            .iter()
                            .any(|(r, p)| *r == ri as u64 && *p == pi as u64);
                        prop_assert_eq!(map.grants(role_name, perm_name), linked);
                    }
                }
            }
        }
    }
}
