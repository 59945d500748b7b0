//! `dormgate-client`
//!
//! **Responsibility:** authorization readiness and permission resolution for
//! the inspection client's navigation layer.
//!
//! This crate provides:
//! - Identity and reference-config stores (single writer, many readers)
//! - The authorization coordinator (generation-guarded state machine)
//! - A runtime driver that executes role/config fetches concurrently
//! - The navigation gate consumed by the routing layer
//!
//! All checks run against data already fetched by this process; nothing here
//! is a server-side authorization engine.

pub mod catalogs;
pub mod config;
pub mod config_store;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod identity_store;
pub mod in_memory;
pub mod providers;
pub mod routes;
pub mod runtime;
pub mod session;
pub mod state;

pub use catalogs::ReferenceCatalogs;
pub use config::{ConfigError, GateConfig};
pub use config_store::{ConfigStore, ConfigView};
pub use coordinator::{Coordinator, Effect, Input};
pub use error::{AuthError, CatalogSource, FetchFailure, GateError};
pub use gate::NavigationGate;
pub use identity_store::{IdentityStore, IdentityView};
pub use providers::{IdentityProvider, ReferenceDataProvider, fetch_reference_catalogs};
pub use routes::{NavigationDecision, RouteMeta, RouteTable};
pub use runtime::{AuthorizationHandle, AuthorizationRuntime, Redirect};
pub use session::{IdentityEvent, Session};
pub use state::{AuthPhase, ConfigState, IdentityState};
