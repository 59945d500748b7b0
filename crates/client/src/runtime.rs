//! Runtime driver for the coordinator.
//!
//! Identity events and route changes are applied to the [`Coordinator`]
//! synchronously by the [`AuthorizationHandle`] that accepts them, so the new
//! epoch is published before the call returns. The runtime loop executes the
//! effects those transitions ask for: each fetch runs as a separate task and
//! reports back through the loop, tagged with the generation that asked for
//! it. Every mutation goes through one mutex, so the coordinator stays the
//! single writer of both stores and mutations never interleave.
//!
//! The runtime holds the only strong reference to the coordinator, and fetch
//! tasks hold only a weak sender: once every handle is dropped (or
//! [`AuthorizationHandle::shutdown`] is called) the loop ends, the stores
//! close, and waiting readers observe [`GateError::CoordinatorStopped`].

use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;
use tokio::sync::mpsc::{
    UnboundedReceiver, UnboundedSender, WeakUnboundedSender, unbounded_channel,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use dormgate_core::Generation;

use crate::config::GateConfig;
use crate::config_store::{ConfigStore, ConfigView};
use crate::coordinator::{Coordinator, Effect, Input};
use crate::error::{AuthError, GateError};
use crate::gate::NavigationGate;
use crate::identity_store::{IdentityStore, IdentityView};
use crate::providers::{IdentityProvider, ReferenceDataProvider, fetch_reference_catalogs};
use crate::routes::RouteTable;
use crate::session::IdentityEvent;

/// Instruction to the routing layer to navigate away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub route: String,
}

/// Work queued for the runtime loop.
#[derive(Debug)]
enum Message {
    /// A fetch finished; feed its result to the coordinator.
    Completed(Input),
    /// A transition accepted by a handle asked for this effect.
    Execute(Effect),
}

pub struct AuthorizationRuntime {
    coordinator: Arc<Mutex<Coordinator>>,
    identity_provider: Arc<dyn IdentityProvider>,
    reference_data: Arc<dyn ReferenceDataProvider>,
    messages: UnboundedReceiver<Message>,
    feedback: WeakUnboundedSender<Message>,
    redirects: UnboundedSender<Redirect>,
    shutdown: Arc<Notify>,
    login_route: String,
}

impl AuthorizationRuntime {
    /// Create a runtime with fresh stores.
    ///
    /// Returns the runtime (start it with [`spawn`](Self::spawn)), the handle
    /// used to feed it and read from it, and the stream of redirects it asks
    /// the routing layer to perform.
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        reference_data: Arc<dyn ReferenceDataProvider>,
        config: &GateConfig,
    ) -> (Self, AuthorizationHandle, UnboundedReceiver<Redirect>) {
        let coordinator = Coordinator::new(IdentityStore::new(), ConfigStore::new());
        let identity = coordinator.identity_view();
        let config_view = coordinator.config_view();
        let coordinator = Arc::new(Mutex::new(coordinator));

        let (tx, messages) = unbounded_channel();
        let (redirects, redirect_rx) = unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        let handle = AuthorizationHandle {
            coordinator: Arc::downgrade(&coordinator),
            messages: tx.clone(),
            identity,
            config: config_view,
            shutdown: shutdown.clone(),
        };

        let runtime = Self {
            coordinator,
            identity_provider,
            reference_data,
            messages,
            feedback: tx.downgrade(),
            redirects,
            shutdown,
            login_route: config.login_route.clone(),
        };

        (runtime, handle, redirect_rx)
    }

    /// Run the loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process queued work until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        info!("authorization runtime started");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("authorization runtime received shutdown signal");
                    break;
                }
                message = self.messages.recv() => match message {
                    Some(Message::Completed(input)) => self.complete(input),
                    Some(Message::Execute(effect)) => self.execute(effect),
                    None => {
                        debug!("all handles dropped");
                        break;
                    }
                },
            }
        }

        info!("authorization runtime stopped");
    }

    fn complete(&self, input: Input) {
        let effects = match self.coordinator.lock() {
            Ok(mut coordinator) => coordinator.handle(input),
            Err(_) => {
                error!("coordinator lock poisoned; dropping fetch result");
                return;
            }
        };
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&self, effect: Effect) {
        match effect {
            Effect::FetchRole { generation } => self.fetch_role(generation),
            Effect::FetchConfig { generation } => self.fetch_config(generation),
            Effect::RedirectToLogin => {
                let redirect = Redirect {
                    route: self.login_route.clone(),
                };
                if self.redirects.send(redirect).is_err() {
                    debug!("redirect receiver dropped; skipping redirect");
                }
            }
        }
    }

    fn fetch_role(&self, generation: Generation) {
        let provider = self.identity_provider.clone();
        let feedback = self.feedback.clone();
        tokio::spawn(async move {
            let result = provider.fetch_current_role().await;
            deliver(&feedback, Input::RoleFetched { generation, result });
        });
    }

    fn fetch_config(&self, generation: Generation) {
        let provider = self.reference_data.clone();
        let feedback = self.feedback.clone();
        tokio::spawn(async move {
            let result = fetch_reference_catalogs(provider.as_ref())
                .await
                .map_err(AuthError::from);
            deliver(&feedback, Input::ConfigFetched { generation, result });
        });
    }
}

fn deliver(feedback: &WeakUnboundedSender<Message>, input: Input) {
    let delivered = feedback
        .upgrade()
        .is_some_and(|tx| tx.send(Message::Completed(input)).is_ok());
    if !delivered {
        debug!("runtime stopped; dropping fetch result");
    }
}

/// Records committed navigations on a gate's behalf.
///
/// Holds the coordinator weakly so a gate never keeps a stopped runtime's
/// stores alive.
#[derive(Debug, Clone)]
pub(crate) struct RouteReporter {
    coordinator: Weak<Mutex<Coordinator>>,
}

impl RouteReporter {
    pub(crate) fn report(&self, requires_session: bool) {
        let Some(coordinator) = self.coordinator.upgrade() else {
            debug!("runtime stopped; route change not recorded");
            return;
        };
        match coordinator.lock() {
            // Route changes never produce effects.
            Ok(mut coordinator) => {
                coordinator.handle(Input::RouteEntered { requires_session });
            }
            Err(_) => error!("coordinator lock poisoned; route change not recorded"),
        }
    }
}

/// Cloneable front door to a running [`AuthorizationRuntime`].
#[derive(Debug, Clone)]
pub struct AuthorizationHandle {
    coordinator: Weak<Mutex<Coordinator>>,
    messages: UnboundedSender<Message>,
    identity: IdentityView,
    config: ConfigView,
    shutdown: Arc<Notify>,
}

impl AuthorizationHandle {
    /// Apply an identity-provider notification.
    ///
    /// The transition is published before this returns: after a `SignedOut`
    /// readers see the signed-out state, and after a `SignedIn` they see
    /// `auth_ready=false` until the new role and config settle.
    pub fn identity_event(&self, event: IdentityEvent) -> Result<(), GateError> {
        self.apply(Input::Identity(event))
    }

    /// Record whether the route the user is now on requires a session.
    ///
    /// Gates built by [`gate`](Self::gate) do this for every navigation they
    /// allow through `decide`.
    pub fn route_entered(&self, requires_session: bool) -> Result<(), GateError> {
        self.apply(Input::RouteEntered { requires_session })
    }

    pub fn identity_view(&self) -> IdentityView {
        self.identity.clone()
    }

    pub fn config_view(&self) -> ConfigView {
        self.config.clone()
    }

    /// Navigation gate over this runtime's stores.
    ///
    /// Navigations it allows through `decide` are recorded as entered routes.
    pub fn gate(&self, routes: RouteTable, config: GateConfig) -> NavigationGate {
        NavigationGate::new(self.identity.clone(), self.config.clone(), routes, config)
            .reporting_to(RouteReporter {
                coordinator: self.coordinator.clone(),
            })
    }

    /// Ask the runtime loop to stop after the work it is processing.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    fn apply(&self, input: Input) -> Result<(), GateError> {
        let stopped = || {
            warn!("authorization runtime is not running");
            GateError::CoordinatorStopped
        };

        if self.messages.is_closed() {
            return Err(stopped());
        }
        let coordinator = self.coordinator.upgrade().ok_or_else(stopped)?;
        let effects = coordinator.lock().map_err(|_| stopped())?.handle(input);

        for effect in effects {
            self.messages
                .send(Message::Execute(effect))
                .map_err(|_| stopped())?;
        }
        Ok(())
    }
}
