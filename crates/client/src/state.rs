//! Published snapshots of the two stores.

use std::sync::Arc;

use serde::Serialize;

use tracing::warn;

use dormgate_auth::{PermissionMap, Role};
use dormgate_core::Generation;

use crate::catalogs::ReferenceCatalogs;
use crate::error::AuthError;
use crate::session::Session;

/// Phase of the authorization coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// Process start; no identity event seen yet.
    AwaitingIdentity,
    NoSession,
    /// Role and config fetches for the current generation are in flight.
    Resolving,
    /// Role and config both resolved successfully.
    Authorized,
    /// Signed in, but role or config could not be resolved.
    Degraded,
}

impl AuthPhase {
    /// Whether readiness has been reached for the current generation.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AuthPhase::AwaitingIdentity | AuthPhase::Resolving)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthPhase::AwaitingIdentity => "awaiting_identity",
            AuthPhase::NoSession => "no_session",
            AuthPhase::Resolving => "resolving",
            AuthPhase::Authorized => "authorized",
            AuthPhase::Degraded => "degraded",
        }
    }
}

impl core::fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity snapshot: session, resolved role and readiness flags.
///
/// `auth_ready` describes `generation`: once set for a generation it stays set
/// until a sign-in or sign-out moves to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityState {
    pub session: Option<Session>,
    pub role: Option<Role>,
    pub loading: bool,
    pub auth_ready: bool,
    pub phase: AuthPhase,
    pub generation: Generation,
}

impl IdentityState {
    /// State at process start, before the initial session check.
    pub fn unresolved() -> Self {
        Self {
            session: None,
            role: None,
            loading: true,
            auth_ready: false,
            phase: AuthPhase::AwaitingIdentity,
            generation: Generation::initial(),
        }
    }

    pub fn session_present(&self) -> bool {
        self.session.is_some()
    }

    pub fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
    }

    /// Set the role, keeping it only if `catalogs` knows the name.
    ///
    /// An unrecognized name is stored as absent and reported as
    /// [`AuthError::InvalidRole`].
    pub fn set_role(
        &mut self,
        name: Option<&str>,
        catalogs: &ReferenceCatalogs,
    ) -> Result<(), AuthError> {
        match name {
            None => {
                self.role = None;
                Ok(())
            }
            Some(name) if catalogs.contains_role(name) => {
                self.role = Some(Role::new(name.to_string()));
                Ok(())
            }
            Some(name) => {
                warn!(role = %name, "rejecting role not present in role catalog");
                self.role = None;
                Err(AuthError::InvalidRole(name.to_string()))
            }
        }
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_auth_ready(&mut self, ready: bool) {
        self.auth_ready = ready;
    }

    /// Signed out: no session, no role, and resolved.
    pub fn clear(&mut self) {
        self.session = None;
        self.role = None;
        self.loading = false;
        self.auth_ready = true;
        self.phase = AuthPhase::NoSession;
    }
}

impl Default for IdentityState {
    fn default() -> Self {
        Self::unresolved()
    }
}

/// Reference-config snapshot: last-good catalogs, their permission map, and
/// fetch status.
///
/// `generation` is the identity epoch this snapshot was last written for. A
/// reader must only combine it with an [`IdentityState`] of the same epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigState {
    pub generation: Generation,
    pub catalogs: Arc<ReferenceCatalogs>,
    pub permission_map: Arc<PermissionMap>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ConfigState {
    /// Whether a complete batch is held, no fetch is in flight and no fetch
    /// error is outstanding.
    pub fn is_cache_valid(&self) -> bool {
        !self.loading && self.error.is_none() && self.catalogs.is_loaded()
    }

    /// Whether this snapshot was written for the same epoch as `identity`.
    pub fn matches(&self, identity: &IdentityState) -> bool {
        self.generation == identity.generation
    }
}
