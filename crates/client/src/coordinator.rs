//! Authorization coordinator: the readiness state machine.
//!
//! The coordinator is synchronous and does no IO. It consumes [`Input`]s
//! (identity events and fetch completions), mutates the two stores it owns,
//! and returns the [`Effect`]s a driver must execute. Every fetch it asks for
//! is tagged with the generation current at the time; completions for any
//! other generation are discarded without touching state.
//!
//! ```text
//! AwaitingIdentity ─┬─ InitialSessionCheck(None) ──────────────→ NoSession
//!                   └─ InitialSessionCheck(Some) / SignedIn ───→ Resolving
//! Resolving ── role ✓ + config ✓ ──→ Authorized
//!           ── role ✗ or config ✗ ─→ Degraded
//! any ── SignedOut ─→ NoSession
//! ```

use tracing::{debug, info, warn};

use dormgate_core::Generation;

use crate::catalogs::ReferenceCatalogs;
use crate::config_store::{ConfigStore, ConfigView};
use crate::error::AuthError;
use crate::identity_store::{IdentityStore, IdentityView};
use crate::session::{IdentityEvent, Session};
use crate::state::AuthPhase;

/// Something the coordinator reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Identity(IdentityEvent),
    RoleFetched {
        generation: Generation,
        result: Result<Option<String>, AuthError>,
    },
    ConfigFetched {
        generation: Generation,
        result: Result<ReferenceCatalogs, AuthError>,
    },
    /// The routing layer committed a navigation.
    RouteEntered { requires_session: bool },
}

/// Work the driver must perform on the coordinator's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    FetchRole { generation: Generation },
    FetchConfig { generation: Generation },
    RedirectToLogin,
}

/// Results collected for the current generation.
///
/// `open` is true only while this generation has fetches outstanding.
#[derive(Debug, Default)]
struct Pending {
    role: Option<Result<Option<String>, AuthError>>,
    config: Option<Result<(), AuthError>>,
    open: bool,
}

#[derive(Debug)]
pub struct Coordinator {
    identity: IdentityStore,
    config: ConfigStore,
    generation: Generation,
    pending: Pending,
    route_requires_session: bool,
}

impl Coordinator {
    /// Take ownership of both stores; from here on the coordinator is their
    /// only writer.
    pub fn new(identity: IdentityStore, config: ConfigStore) -> Self {
        Self {
            identity,
            config,
            generation: Generation::initial(),
            pending: Pending::default(),
            route_requires_session: false,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn phase(&self) -> AuthPhase {
        self.identity.snapshot().phase
    }

    pub fn identity_view(&self) -> IdentityView {
        self.identity.view()
    }

    pub fn config_view(&self) -> ConfigView {
        self.config.view()
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Identity(event) => self.on_identity(event),
            Input::RoleFetched { generation, result } => {
                if self.discard_if_stale(generation, "role") {
                    return Vec::new();
                }
                if let Err(e) = &result {
                    warn!(generation = %generation, error = %e, "role fetch failed");
                }
                self.pending.role = Some(result);
                self.try_settle();
                Vec::new()
            }
            Input::ConfigFetched { generation, result } => {
                if self.discard_if_stale(generation, "config") {
                    return Vec::new();
                }
                let outcome = self.config.finish_fetch(generation, result);
                self.pending.config = Some(outcome);
                self.try_settle();
                Vec::new()
            }
            Input::RouteEntered { requires_session } => {
                self.route_requires_session = requires_session;
                Vec::new()
            }
        }
    }

    fn on_identity(&mut self, event: IdentityEvent) -> Vec<Effect> {
        debug!(event = event.kind(), generation = %self.generation, "identity event");

        match event {
            IdentityEvent::InitialSessionCheck(None) => {
                let generation = self.advance();
                self.identity.update(|s| {
                    s.generation = generation;
                    s.set_session(None);
                    s.role = None;
                    s.set_loading(false);
                    s.set_auth_ready(true);
                    s.phase = AuthPhase::NoSession;
                });
                self.config.adopt(generation);
                info!(generation = %generation, "no initial session");
                Vec::new()
            }
            IdentityEvent::InitialSessionCheck(Some(session)) => self.begin_resolving(session, false),
            IdentityEvent::SignedIn(session) => self.begin_resolving(session, true),
            IdentityEvent::SignedOut => {
                let generation = self.advance();
                self.identity.update(|s| {
                    s.generation = generation;
                    s.clear();
                });
                self.config.clear(generation);
                info!(generation = %generation, "signed out");

                if self.route_requires_session {
                    vec![Effect::RedirectToLogin]
                } else {
                    Vec::new()
                }
            }
            IdentityEvent::TokenRefreshed(session) => {
                let replaced = self.identity.update(|s| {
                    if s.session_present() {
                        s.set_session(Some(session));
                        true
                    } else {
                        false
                    }
                });
                if !replaced {
                    debug!("token refresh without an active session; ignoring");
                }
                Vec::new()
            }
        }
    }

    /// Start a new generation for `session` and request its role and config.
    ///
    /// With `reuse_config`, a settled, error-free config batch is kept instead
    /// of refetched. The role is always refetched: it belongs to the subject.
    fn begin_resolving(&mut self, session: Session, reuse_config: bool) -> Vec<Effect> {
        let generation = self.advance();
        self.pending.open = true;
        self.identity.update(|s| {
            s.generation = generation;
            s.set_session(Some(session));
            s.role = None;
            s.set_loading(true);
            s.set_auth_ready(false);
            s.phase = AuthPhase::Resolving;
        });

        let mut effects = vec![Effect::FetchRole { generation }];
        if reuse_config && self.config.snapshot().is_cache_valid() {
            debug!(generation = %generation, "reusing cached reference config");
            self.config.adopt(generation);
            self.pending.config = Some(Ok(()));
        } else {
            self.config.begin_fetch(generation);
            effects.push(Effect::FetchConfig { generation });
        }

        info!(generation = %generation, "resolving role and config");
        effects
    }

    fn advance(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.pending = Pending::default();
        self.generation
    }

    fn discard_if_stale(&self, generation: Generation, what: &'static str) -> bool {
        if generation.is_current(self.generation) && self.pending.open {
            return false;
        }
        let discarded = AuthError::StaleResultDiscarded {
            result_generation: generation,
            current_generation: self.generation,
        };
        debug!(result = what, "{}", discarded);
        true
    }

    /// Move to a terminal phase once both results for this generation are in.
    fn try_settle(&mut self) {
        if !self.pending.open {
            return;
        }
        let (Some(role), Some(config)) = (&self.pending.role, &self.pending.config) else {
            return;
        };

        let catalogs = self.config.snapshot().catalogs;
        let generation = self.generation;
        let phase = self.identity.update(|s| {
            let role_name = role.as_ref().ok().and_then(|r| r.as_deref());
            // Rejection is logged by set_role and leaves the role absent.
            let _ = s.set_role(role_name, &catalogs);

            let phase = if role.is_ok() && config.is_ok() {
                AuthPhase::Authorized
            } else {
                AuthPhase::Degraded
            };
            s.phase = phase;
            s.set_loading(false);
            s.set_auth_ready(true);
            phase
        });
        self.pending.open = false;

        match phase {
            AuthPhase::Authorized => info!(generation = %generation, "authorization ready"),
            _ => warn!(
                generation = %generation,
                "authorization degraded; permission-gated navigation will be denied"
            ),
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(IdentityStore::new(), ConfigStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dormgate_auth::Role;
    use dormgate_core::SubjectId;

    use crate::error::{CatalogSource, FetchFailure};

    fn session() -> Session {
        Session::new("token", SubjectId::new())
    }

    fn catalogs() -> ReferenceCatalogs {
        ReferenceCatalogs::from_json(
            r#"{
                "roles": [{"id": 1, "name": "inspector"}, {"id": 2, "name": "superadmin"}],
                "permissions": [{"id": 9, "name": "manage_zones"}],
                "role_links": [{"role_id": 1, "permission_id": 9}]
            }"#,
        )
        .unwrap()
    }

    fn config_failure() -> AuthError {
        AuthError::ConfigFetch(FetchFailure::new(CatalogSource::Zones, "offline"))
    }

    fn role_ok(generation: Generation, name: &str) -> Input {
        Input::RoleFetched {
            generation,
            result: Ok(Some(name.to_string())),
        }
    }

    fn config_ok(generation: Generation) -> Input {
        Input::ConfigFetched {
            generation,
            result: Ok(catalogs()),
        }
    }

    /// Sign in through the initial check and settle successfully.
    fn authorized(role: &str) -> Coordinator {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(Some(session()))));
        let g = c.generation();
        c.handle(role_ok(g, role));
        c.handle(config_ok(g));
        c
    }

    #[test]
    fn starts_awaiting_identity() {
        let c = Coordinator::default();
        let state = c.identity_view().snapshot();
        assert_eq!(state.phase, AuthPhase::AwaitingIdentity);
        assert!(state.loading);
        assert!(!state.auth_ready);
    }

    #[test]
    fn initial_check_without_session_resolves_immediately() {
        let mut c = Coordinator::default();
        let effects = c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(None)));

        assert!(effects.is_empty());
        let state = c.identity_view().snapshot();
        assert_eq!(state.phase, AuthPhase::NoSession);
        assert!(state.auth_ready);
        assert!(!state.loading);
        assert_eq!(state.role, None);
    }

    #[test]
    fn initial_check_with_session_fetches_role_and_config() {
        let mut c = Coordinator::default();
        let effects = c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(Some(session()))));

        let g = c.generation();
        assert_eq!(g, Generation::from_u64(1));
        assert_eq!(
            effects,
            vec![Effect::FetchRole { generation: g }, Effect::FetchConfig { generation: g }]
        );
        assert_eq!(c.phase(), AuthPhase::Resolving);
        assert!(c.config_view().loading());
        assert!(!c.identity_view().auth_ready());
    }

    #[test]
    fn both_results_required_before_ready() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(Some(session()))));
        let g = c.generation();

        c.handle(role_ok(g, "inspector"));
        assert_eq!(c.phase(), AuthPhase::Resolving);
        assert!(!c.identity_view().auth_ready());

        c.handle(config_ok(g));
        let state = c.identity_view().snapshot();
        assert_eq!(state.phase, AuthPhase::Authorized);
        assert!(state.auth_ready);
        assert!(!state.loading);
        assert_eq!(state.role, Some(Role::new("inspector")));
    }

    #[test]
    fn completion_order_does_not_matter() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(Some(session()))));
        let g = c.generation();

        c.handle(config_ok(g));
        assert_eq!(c.phase(), AuthPhase::Resolving);
        c.handle(role_ok(g, "inspector"));

        assert_eq!(c.phase(), AuthPhase::Authorized);
        assert_eq!(c.identity_view().role(), Some(Role::new("inspector")));
    }

    #[test]
    fn role_failure_degrades() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(Some(session()))));
        let g = c.generation();

        c.handle(Input::RoleFetched {
            generation: g,
            result: Err(AuthError::IdentityFetch("rpc failed".to_string())),
        });
        c.handle(config_ok(g));

        let state = c.identity_view().snapshot();
        assert_eq!(state.phase, AuthPhase::Degraded);
        assert!(state.auth_ready);
        assert!(state.session_present());
        assert_eq!(state.role, None);
    }

    #[test]
    fn superadmin_with_config_failure_is_degraded() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(Some(session()))));
        let g = c.generation();

        c.handle(role_ok(g, "superadmin"));
        c.handle(Input::ConfigFetched {
            generation: g,
            result: Err(config_failure()),
        });

        assert_eq!(c.phase(), AuthPhase::Degraded);
        assert!(c.identity_view().auth_ready());
        assert!(c.config_view().error().is_some());
    }

    #[test]
    fn unknown_role_is_not_retained() {
        let c = authorized("janitor");
        let state = c.identity_view().snapshot();
        assert_eq!(state.phase, AuthPhase::Authorized);
        assert_eq!(state.role, None);
    }

    #[test]
    fn sign_out_mid_fetch_discards_late_results() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(None)));
        c.handle(Input::Identity(IdentityEvent::SignedIn(session())));
        let g2 = c.generation();
        assert_eq!(g2, Generation::from_u64(2));
        assert_eq!(c.phase(), AuthPhase::Resolving);

        c.handle(Input::Identity(IdentityEvent::SignedOut));
        assert_eq!(c.generation(), Generation::from_u64(3));

        let before = c.identity_view().snapshot();
        c.handle(role_ok(g2, "inspector"));
        c.handle(config_ok(g2));

        let after = c.identity_view().snapshot();
        assert_eq!(before, after);
        assert_eq!(after.phase, AuthPhase::NoSession);
        assert_eq!(after.role, None);
        assert!(!c.config_view().catalogs().is_loaded());
    }

    #[test]
    fn sign_out_clears_stores_and_stays_ready() {
        let mut c = authorized("inspector");

        c.handle(Input::Identity(IdentityEvent::SignedOut));

        let state = c.identity_view().snapshot();
        assert_eq!(state.phase, AuthPhase::NoSession);
        assert!(state.auth_ready);
        assert!(!state.session_present());
        assert_eq!(state.role, None);
        assert!(c.config_view().permission_map().is_empty());
    }

    #[test]
    fn sign_out_redirects_only_from_session_routes() {
        let mut c = authorized("inspector");
        assert!(c.handle(Input::Identity(IdentityEvent::SignedOut)).is_empty());

        let mut c = authorized("inspector");
        c.handle(Input::RouteEntered {
            requires_session: true,
        });
        assert_eq!(
            c.handle(Input::Identity(IdentityEvent::SignedOut)),
            vec![Effect::RedirectToLogin]
        );
    }

    #[test]
    fn sign_in_reuses_cached_config() {
        let mut c = authorized("inspector");
        let effects = c.handle(Input::Identity(IdentityEvent::SignedIn(session())));
        let g = c.generation();

        assert_eq!(effects, vec![Effect::FetchRole { generation: g }]);
        assert!(!c.identity_view().auth_ready());

        c.handle(role_ok(g, "inspector"));
        assert_eq!(c.phase(), AuthPhase::Authorized);
    }

    #[test]
    fn sign_in_after_config_error_refetches() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(Some(session()))));
        let g = c.generation();
        c.handle(role_ok(g, "inspector"));
        c.handle(Input::ConfigFetched {
            generation: g,
            result: Err(config_failure()),
        });

        let effects = c.handle(Input::Identity(IdentityEvent::SignedIn(session())));
        let g = c.generation();
        assert_eq!(
            effects,
            vec![Effect::FetchRole { generation: g }, Effect::FetchConfig { generation: g }]
        );
    }

    #[test]
    fn sign_in_after_sign_out_refetches_config() {
        let mut c = authorized("inspector");
        c.handle(Input::Identity(IdentityEvent::SignedOut));

        let effects = c.handle(Input::Identity(IdentityEvent::SignedIn(session())));
        assert_eq!(effects.len(), 2);
    }

    #[test]
    fn duplicate_result_after_settling_is_ignored() {
        let mut c = authorized("inspector");
        let g = c.generation();
        let before = c.identity_view().snapshot();

        c.handle(Input::RoleFetched {
            generation: g,
            result: Err(AuthError::IdentityFetch("late".to_string())),
        });

        assert_eq!(c.identity_view().snapshot(), before);
    }

    #[test]
    fn token_refresh_replaces_session_without_new_generation() {
        let mut c = authorized("inspector");
        let g = c.generation();
        let refreshed = Session::new("rotated", SubjectId::new());

        let effects = c.handle(Input::Identity(IdentityEvent::TokenRefreshed(refreshed.clone())));

        assert!(effects.is_empty());
        assert_eq!(c.generation(), g);
        let state = c.identity_view().snapshot();
        assert_eq!(state.session, Some(refreshed));
        assert_eq!(state.phase, AuthPhase::Authorized);
        assert!(state.auth_ready);
    }

    #[test]
    fn token_refresh_without_session_is_ignored() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(None)));

        c.handle(Input::Identity(IdentityEvent::TokenRefreshed(session())));

        assert!(!c.identity_view().session_present());
    }

    #[test]
    fn results_for_a_generation_without_fetches_are_ignored() {
        let mut c = Coordinator::default();
        c.handle(Input::Identity(IdentityEvent::InitialSessionCheck(None)));
        let g = c.generation();
        let before = c.identity_view().snapshot();

        c.handle(role_ok(g, "inspector"));
        c.handle(config_ok(g));

        assert_eq!(c.identity_view().snapshot(), before);
        assert!(!c.config_view().catalogs().is_loaded());
    }
}
