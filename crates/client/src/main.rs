//! `dormgate` demo: drive the authorization runtime against in-memory
//! providers and log the navigation decision for every route.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use dormgate_auth::Permission;
use dormgate_client::in_memory::{InMemoryIdentityProvider, InMemoryReferenceData};
use dormgate_client::{
    AuthorizationRuntime, GateConfig, IdentityEvent, ReferenceCatalogs, RouteTable, Session,
};
use dormgate_core::SubjectId;

const DEMO_ROLE_VAR: &str = "DORMGATE_DEMO_ROLE";
const DEMO_CATALOGS: &str = include_str!("../fixtures/demo_catalogs.json");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dormgate_observability::init();

    let config = GateConfig::from_env()?;

    let catalogs = match &config.catalog_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalogs from {}", path.display()))?;
            ReferenceCatalogs::from_json(&json).context("parsing catalog file")?
        }
        None => ReferenceCatalogs::from_json(DEMO_CATALOGS).context("parsing built-in catalogs")?,
    };

    let role = std::env::var(DEMO_ROLE_VAR).unwrap_or_else(|_| {
        tracing::warn!("{} not set; signing in as inspector", DEMO_ROLE_VAR);
        "inspector".to_string()
    });

    let identity = Arc::new(InMemoryIdentityProvider::with_role(role));
    let reference = Arc::new(InMemoryReferenceData::new(catalogs));
    let (runtime, handle, mut redirects) = AuthorizationRuntime::new(identity, reference, &config);
    let task = runtime.spawn();

    let gate = handle.gate(RouteTable::inspection_app(), config.clone());

    handle.identity_event(IdentityEvent::InitialSessionCheck(Some(Session::new(
        "demo-token",
        SubjectId::new(),
    ))))?;

    match config.ready_timeout {
        Some(timeout) => gate.await_ready_within(timeout).await?,
        None => gate.await_ready().await?,
    }

    let view = handle.identity_view();
    tracing::info!(
        phase = %view.phase(),
        role = ?gate.role().map(|r| r.to_string()),
        config_error = ?gate.config_error(),
        "authorization ready"
    );

    let targets: Vec<String> = gate.routes().iter().map(|r| r.name.clone()).collect();
    for target in &targets {
        let decision = gate.decide(target, None).await?;
        tracing::info!(
            route = %target,
            decision = %serde_json::to_string(&decision)?,
            "navigation decision"
        );
    }

    let explanation = gate.explain(&Permission::new("manage_users"));
    tracing::info!(explanation = %serde_json::to_string(&explanation)?, "manage_users");

    // Land on the home route; allowed decisions are recorded as the current route.
    let landed = gate.decide(&config.home_route, None).await?;
    tracing::info!(route = %config.home_route, allowed = landed.is_allowed(), "landed");

    handle.identity_event(IdentityEvent::SignedOut)?;
    match tokio::time::timeout(Duration::from_secs(1), redirects.recv()).await {
        Ok(Some(redirect)) => tracing::info!(route = %redirect.route, "redirected after sign-out"),
        _ => tracing::info!("signed out without a redirect"),
    }

    handle.shutdown();
    task.await.context("authorization runtime panicked")?;
    Ok(())
}
