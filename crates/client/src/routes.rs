//! Route metadata and the decisions the gate hands back to the routing layer.

use serde::Serialize;

use dormgate_auth::Permission;

/// Guard-relevant metadata of one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub name: String,
    pub path: String,
    pub title: Option<String>,
    pub requires_session: bool,
    pub required_permission: Option<Permission>,
    /// Enclosing route; its session requirement is inherited.
    pub parent: Option<String>,
    /// Route this one forwards to when entered directly.
    pub redirect: Option<String>,
}

impl RouteMeta {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            title: None,
            requires_session: false,
            required_permission: None,
            parent: None,
            redirect: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn requires_session(mut self) -> Self {
        self.requires_session = true;
        self
    }

    pub fn requires_permission(mut self, permission: &'static str) -> Self {
        self.required_permission = Some(Permission::new(permission));
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn redirects_to(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationDecision {
    /// Proceed; `document_title` is the page title to display.
    Allow { document_title: String },
    /// No session; go to login and come back to `return_to` afterwards.
    RedirectToLogin { return_to: String },
    /// Go somewhere else without a rejection (e.g. login while signed in).
    Redirect { to: String },
    /// Permission denied. `redirect_to` is `None` when navigation should
    /// simply be cancelled.
    Reject {
        notice: String,
        redirect_to: Option<String>,
    },
    NotFound { target: String },
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow { .. })
    }
}

/// Flat table of routes, linked through `parent`.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteMeta>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, route: RouteMeta) -> Self {
        self.routes.push(route);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteMeta> {
        self.routes.iter()
    }

    pub fn get(&self, name: &str) -> Option<&RouteMeta> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Look a route up by name, then by path.
    pub fn resolve(&self, target: &str) -> Option<&RouteMeta> {
        self.get(target)
            .or_else(|| self.routes.iter().find(|r| r.path == target))
    }

    /// Whether `route` or any of its ancestors requires a session.
    pub fn requires_session(&self, route: &RouteMeta) -> bool {
        let mut current = route;
        // Bounded walk: a malformed table with a parent cycle must not hang.
        for _ in 0..=self.routes.len() {
            if current.requires_session {
                return true;
            }
            match current.parent.as_deref().and_then(|p| self.get(p)) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        true
    }

    /// Route table of the inspection client.
    pub fn inspection_app() -> Self {
        Self::new()
            .with_route(RouteMeta::new("Login", "/login").titled("Sign In"))
            .with_route(
                RouteMeta::new("Inspection", "/")
                    .titled("Inspection Mode")
                    .requires_session(),
            )
            .with_route(
                RouteMeta::new("KeyReturn", "/key-return")
                    .titled("Key Return")
                    .requires_session(),
            )
            .with_route(
                RouteMeta::new("Admin", "/admin")
                    .requires_session()
                    .redirects_to("AdminDashboard"),
            )
            .with_route(admin("AdminDashboard", "dashboard", "Admin Dashboard", "read_all_reports"))
            .with_route(admin("ManageZones", "zones", "Manage Zones", "manage_zones"))
            .with_route(admin("ManageRooms", "rooms", "Manage Rooms", "manage_rooms"))
            .with_route(admin("ManageTypes", "types", "Manage Check Types", "manage_types"))
            .with_route(admin("ManageChecklist", "checklist", "Manage Checklist", "manage_checklist"))
            .with_route(admin("ManageAllocation", "allocation", "Bed Allocation Import", "manage_allocations"))
            .with_route(admin("ManagePermissions", "permissions", "Permission Management", "manage_permissions"))
            .with_route(admin("ManageUsers", "users", "Account Management", "manage_users"))
    }
}

fn admin(name: &str, segment: &str, title: &str, permission: &'static str) -> RouteMeta {
    RouteMeta::new(name, format!("/admin/{}", segment))
        .titled(title)
        .child_of("Admin")
        .requires_permission(permission)
}
