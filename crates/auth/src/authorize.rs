use serde::Serialize;
use thiserror::Error;

use crate::{Permission, PermissionMap, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no role resolved for the current actor")]
    NoRole,

    #[error("role '{0}' is not present in the permission map")]
    UnknownRole(String),

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Check a resolved role against a permission map.
///
/// - No IO
/// - No panics
/// - Readiness is the caller's concern: this only looks at `role` and `map`
///
/// `superadmin` names the bypass role; it is allowed without consulting the map.
pub fn authorize(
    role: Option<&Role>,
    map: &PermissionMap,
    required: &Permission,
    superadmin: &str,
) -> Result<(), AuthzError> {
    let Some(role) = role else {
        return Err(AuthzError::NoRole);
    };

    if role.as_str() == superadmin {
        return Ok(());
    }

    if !map.contains_role(role.as_str()) {
        return Err(AuthzError::UnknownRole(role.as_str().to_string()));
    }

    if map.grants(role.as_str(), required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an allow/deny decision, for debug and audit display.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionExplanation {
    /// The permission that was being checked.
    pub required_permission: String,

    /// Whether access was granted.
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Role the decision was made for, if any.
    pub role: Option<String>,

    /// Permissions the role carries according to the map (sorted).
    pub effective_permissions: Vec<String>,

    /// If denied, the category of denial.
    pub denial: Option<DenialKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Identity or authorization data is not in a terminal, successful state.
    NotReady,
    NoRole,
    UnknownRole,
    MissingPermission,
}

impl From<&AuthzError> for DenialKind {
    fn from(err: &AuthzError) -> Self {
        match err {
            AuthzError::NoRole => DenialKind::NoRole,
            AuthzError::UnknownRole(_) => DenialKind::UnknownRole,
            AuthzError::Forbidden(_) => DenialKind::MissingPermission,
        }
    }
}

/// Explain why [`authorize`] would allow or deny `required` for `role`.
pub fn explain(
    role: Option<&Role>,
    map: &PermissionMap,
    required: &Permission,
    superadmin: &str,
) -> DecisionExplanation {
    let effective_permissions: Vec<String> = role
        .and_then(|r| map.permissions_for(r.as_str()))
        .map(|perms| perms.iter().map(|p| p.as_str().to_string()).collect())
        .unwrap_or_default();

    let (granted, reason, denial) = match authorize(role, map, required, superadmin) {
        Ok(()) if role.is_some_and(|r| r.as_str() == superadmin) => (
            true,
            format!("Role '{}' bypasses the permission map", superadmin),
            None,
        ),
        Ok(()) => (
            true,
            format!("Role carries permission '{}'", required.as_str()),
            None,
        ),
        Err(e) => (false, e.to_string(), Some(DenialKind::from(&e))),
    };

    DecisionExplanation {
        required_permission: required.as_str().to_string(),
        granted,
        reason,
        role: role.map(|r| r.as_str().to_string()),
        effective_permissions,
        denial,
    }
}
