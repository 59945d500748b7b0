//! Navigation gate: the routing layer's only view of authorization.
//!
//! The gate never mutates the stores. It waits for readiness, then answers
//! from the published store snapshots, denying whenever the answer is not a
//! clear "allow". Identity and config snapshots are only combined when both
//! were written for the same generation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use dormgate_auth::{DecisionExplanation, DenialKind, Permission, Role, authorize, explain};

use crate::config::GateConfig;
use crate::config_store::ConfigView;
use crate::error::GateError;
use crate::identity_store::IdentityView;
use crate::routes::{NavigationDecision, RouteMeta, RouteTable};
use crate::runtime::RouteReporter;
use crate::state::{AuthPhase, ConfigState, IdentityState};

const DENIED_NOTICE: &str = "You do not have permission to access this page.";
const DEFAULT_TITLE: &str = "Dormitory Inspection";

#[derive(Debug, Clone)]
pub struct NavigationGate {
    identity: IdentityView,
    config: ConfigView,
    routes: Arc<RouteTable>,
    settings: Arc<GateConfig>,
    reporter: Option<RouteReporter>,
}

impl NavigationGate {
    pub fn new(
        identity: IdentityView,
        config: ConfigView,
        routes: RouteTable,
        settings: GateConfig,
    ) -> Self {
        Self {
            identity,
            config,
            routes: Arc::new(routes),
            settings: Arc::new(settings),
            reporter: None,
        }
    }

    pub(crate) fn reporting_to(mut self, reporter: RouteReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Resolve once `auth_ready` holds for the current generation.
    ///
    /// Returns immediately if it already does. Fails only if the coordinator
    /// has gone away, in which case readiness can never be reached.
    pub async fn await_ready(&self) -> Result<(), GateError> {
        self.identity
            .wait_for(|s| s.auth_ready)
            .await
            .map(|_| ())
            .map_err(|_| GateError::CoordinatorStopped)
    }

    /// [`await_ready`](Self::await_ready) with an upper bound.
    ///
    /// Elapsing leaves all state untouched; readiness is never forced.
    pub async fn await_ready_within(&self, timeout: Duration) -> Result<(), GateError> {
        match tokio::time::timeout(timeout, self.await_ready()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "authorization not ready in time");
                Err(GateError::NotReady)
            }
        }
    }

    /// Whether the current actor may proceed to something requiring `required`.
    ///
    /// With no requirement this is just readiness. With one, the actor must be
    /// fully authorized: any loading, degraded or signed-out state denies.
    pub fn is_allowed(&self, required: Option<&Permission>) -> bool {
        let identity = self.identity.snapshot();
        if !identity.auth_ready {
            return false;
        }
        let Some(required) = required else {
            return true;
        };

        let config = self.config.snapshot();
        if !Self::settled_together(&identity, &config) {
            return false;
        }

        authorize(
            identity.role.as_ref(),
            &config.permission_map,
            required,
            &self.settings.superadmin_role,
        )
        .is_ok()
    }

    /// Both snapshots describe one fully authorized epoch.
    fn settled_together(identity: &IdentityState, config: &ConfigState) -> bool {
        identity.auth_ready
            && identity.phase == AuthPhase::Authorized
            && config.error.is_none()
            && config.matches(identity)
    }

    pub fn check_permission(&self, name: &str) -> bool {
        self.is_allowed(Some(&Permission::new(name.to_string())))
    }

    /// Explain the current decision for `required`.
    pub fn explain(&self, required: &Permission) -> DecisionExplanation {
        let identity = self.identity.snapshot();
        let config = self.config.snapshot();
        let mut explanation = explain(
            identity.role.as_ref(),
            &config.permission_map,
            required,
            &self.settings.superadmin_role,
        );

        if !Self::settled_together(&identity, &config) {
            explanation.granted = false;
            explanation.denial = Some(DenialKind::NotReady);
            explanation.reason = match &config.error {
                Some(err) => format!("Authorization data unavailable: {}", err),
                None if !config.matches(&identity) => format!(
                    "Authorization data is from {}, identity is at {}",
                    config.generation, identity.generation
                ),
                None => format!("Authorization is {}", identity.phase),
            };
        }
        explanation
    }

    pub fn session_present(&self) -> bool {
        self.identity.session_present()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.role()
    }

    pub fn auth_ready(&self) -> bool {
        self.identity.auth_ready()
    }

    pub fn config_error(&self) -> Option<String> {
        self.config.error()
    }

    /// Wait for readiness, then decide a navigation from `from` to `to`.
    ///
    /// Both are route names or paths. When this gate came from
    /// [`AuthorizationHandle::gate`](crate::AuthorizationHandle::gate), an
    /// allowed navigation is recorded as the entered route, so a later
    /// sign-out redirects to login if that route needs a session. Routing
    /// layers that navigate without `decide` must call
    /// [`AuthorizationHandle::route_entered`](crate::AuthorizationHandle::route_entered)
    /// themselves.
    pub async fn decide(&self, to: &str, from: Option<&str>) -> Result<NavigationDecision, GateError> {
        self.await_ready().await?;
        let decision = self.evaluate(to, from);

        if decision.is_allowed() {
            if let (Some(reporter), Some(route)) = (&self.reporter, self.landing(to)) {
                reporter.report(self.routes.requires_session(route));
            }
        }
        Ok(decision)
    }

    /// Decide a navigation against the current snapshots without waiting.
    ///
    /// Nothing is recorded; see [`decide`](Self::decide).
    pub fn evaluate(&self, to: &str, from: Option<&str>) -> NavigationDecision {
        match self.landing(to) {
            Some(route) => self.evaluate_route(route, from),
            None => NavigationDecision::NotFound {
                target: to.to_string(),
            },
        }
    }

    /// The route a navigation to `to` ends up on.
    fn landing(&self, to: &str) -> Option<&RouteMeta> {
        let route = self.routes.resolve(to)?;
        // Forwarding routes are decided as their target.
        let forwarded = route.redirect.as_deref().and_then(|t| self.routes.get(t));
        Some(forwarded.unwrap_or(route))
    }

    fn evaluate_route(&self, route: &RouteMeta, from: Option<&str>) -> NavigationDecision {
        let session = self.identity.session_present();

        if self.routes.requires_session(route) && !session {
            debug!(route = %route.name, "session required; redirecting to login");
            return NavigationDecision::RedirectToLogin {
                return_to: route.path.clone(),
            };
        }

        if let Some(required) = &route.required_permission {
            if !self.is_allowed(Some(required)) {
                warn!(
                    route = %route.name,
                    permission = %required,
                    role = ?self.identity.role().map(|r| r.to_string()),
                    "navigation denied"
                );
                if !session {
                    return NavigationDecision::RedirectToLogin {
                        return_to: route.path.clone(),
                    };
                }
                let home = &self.settings.home_route;
                let from_home = from.is_some_and(|f| {
                    f == home.as_str() || self.routes.resolve(f).is_some_and(|r| &r.name == home)
                });
                return NavigationDecision::Reject {
                    notice: DENIED_NOTICE.to_string(),
                    redirect_to: if from_home { None } else { Some(home.clone()) },
                };
            }
        }

        if route.name == self.settings.login_route && session {
            return NavigationDecision::Redirect {
                to: self.settings.home_route.clone(),
            };
        }

        NavigationDecision::Allow {
            document_title: format!(
                "{} - System",
                route.title.as_deref().unwrap_or(DEFAULT_TITLE)
            ),
        }
    }
}
