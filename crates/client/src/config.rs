//! Environment-driven configuration for the gate and its runtime.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use dormgate_auth::SUPERADMIN;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var} must be a whole number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Role name that bypasses the permission map.
    pub superadmin_role: String,
    /// Route name of the login entry point.
    pub login_route: String,
    /// Route name of the safe default page.
    pub home_route: String,
    /// Optional bound for callers that wait on readiness. Never forces
    /// readiness; see `NavigationGate::await_ready_within`.
    pub ready_timeout: Option<Duration>,
    /// JSON fixture of reference catalogs (demo binary).
    pub catalog_path: Option<PathBuf>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            superadmin_role: SUPERADMIN.to_string(),
            login_route: "Login".to_string(),
            home_route: "Inspection".to_string(),
            ready_timeout: None,
            catalog_path: None,
        }
    }
}

impl GateConfig {
    pub const SUPERADMIN_ROLE_VAR: &'static str = "DORMGATE_SUPERADMIN_ROLE";
    pub const LOGIN_ROUTE_VAR: &'static str = "DORMGATE_LOGIN_ROUTE";
    pub const HOME_ROUTE_VAR: &'static str = "DORMGATE_HOME_ROUTE";
    pub const READY_TIMEOUT_VAR: &'static str = "DORMGATE_READY_TIMEOUT_MS";
    pub const CATALOG_PATH_VAR: &'static str = "DORMGATE_CATALOG_PATH";

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let text = |var: &'static str, default: String| -> Result<String, ConfigError> {
            match lookup(var) {
                Some(value) if value.trim().is_empty() => Err(ConfigError::Empty { var }),
                Some(value) => Ok(value.trim().to_string()),
                None => {
                    debug!(var, default = %default, "not set; using default");
                    Ok(default)
                }
            }
        };

        let ready_timeout = match lookup(Self::READY_TIMEOUT_VAR) {
            Some(value) => {
                let ms: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidTimeout {
                    var: Self::READY_TIMEOUT_VAR,
                    value: value.clone(),
                })?;
                Some(Duration::from_millis(ms))
            }
            None => None,
        };

        Ok(Self {
            superadmin_role: text(Self::SUPERADMIN_ROLE_VAR, defaults.superadmin_role)?,
            login_route: text(Self::LOGIN_ROUTE_VAR, defaults.login_route)?,
            home_route: text(Self::HOME_ROUTE_VAR, defaults.home_route)?,
            ready_timeout,
            catalog_path: lookup(Self::CATALOG_PATH_VAR).map(PathBuf::from),
        })
    }

    pub fn with_superadmin_role(mut self, role: impl Into<String>) -> Self {
        self.superadmin_role = role.into();
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn with_home_route(mut self, route: impl Into<String>) -> Self {
        self.home_route = route.into();
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }
}
