//! Identity store: the single writer of [`IdentityState`].

use tokio::sync::watch;

use dormgate_auth::Role;
use dormgate_core::Generation;

use crate::state::{AuthPhase, IdentityState};

/// Owner of the identity state.
///
/// Only the coordinator holds an `IdentityStore`; everyone else reads through
/// an [`IdentityView`]. Each [`update`](Self::update) publishes exactly one new
/// snapshot, so readers never observe a half-applied transition.
#[derive(Debug)]
pub struct IdentityStore {
    tx: watch::Sender<IdentityState>,
}

impl IdentityStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(IdentityState::unresolved());
        Self { tx }
    }

    /// Read-only handle to the published state.
    pub fn view(&self) -> IdentityView {
        IdentityView {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> IdentityState {
        self.tx.borrow().clone()
    }

    /// Apply `f` to the state and publish the result once.
    ///
    /// Observers are only woken when `f` actually changed something.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut IdentityState) -> R) -> R {
        let mut next = self.tx.borrow().clone();
        let out = f(&mut next);
        self.tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        out
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the identity state.
#[derive(Debug, Clone)]
pub struct IdentityView {
    rx: watch::Receiver<IdentityState>,
}

impl IdentityView {
    pub fn snapshot(&self) -> IdentityState {
        self.rx.borrow().clone()
    }

    pub fn session_present(&self) -> bool {
        self.rx.borrow().session_present()
    }

    pub fn role(&self) -> Option<Role> {
        self.rx.borrow().role.clone()
    }

    pub fn auth_ready(&self) -> bool {
        self.rx.borrow().auth_ready
    }

    pub fn phase(&self) -> AuthPhase {
        self.rx.borrow().phase
    }

    pub fn generation(&self) -> Generation {
        self.rx.borrow().generation
    }

    /// Wait until a published snapshot satisfies `pred`, returning that snapshot.
    ///
    /// Fails only if the store has been dropped.
    pub async fn wait_for(
        &self,
        mut pred: impl FnMut(&IdentityState) -> bool,
    ) -> Result<IdentityState, watch::error::RecvError> {
        let mut rx = self.rx.clone();
        let state = rx.wait_for(|s| pred(s)).await?;
        Ok(state.clone())
    }
}
