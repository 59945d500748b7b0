use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

/// Name of the distinguished role that bypasses the permission map.
pub const SUPERADMIN: &str = "superadmin";

/// Role name used for RBAC.
///
/// Roles are opaque strings at this layer; whether a name is *valid* is
/// decided against the role catalog, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn superadmin() -> Self {
        Self::new(SUPERADMIN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
