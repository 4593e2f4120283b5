//! Lazily resolved current principal.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::identity::IdentitySource;
use super::principal::Principal;
use super::storage::{LocalStore, USER_KEY};
use crate::telemetry;

/// Where [`SessionState::load_principal`] found the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Memory,
    Storage,
    Remote,
    None,
}

impl Source {
    fn label(self) -> &'static str {
        match self {
            Source::Memory => "memory",
            Source::Storage => "storage",
            Source::Remote => "remote",
            Source::None => "none",
        }
    }
}

/// Holds the current principal for the lifetime of the process.
///
/// Resolution order: memory, then the persisted `"user"` snapshot, then
/// the remote identity source. A persisted snapshot is trusted without a
/// server round trip, so a session revoked server-side stays
/// authenticated here until [`logout`](Self::logout) or until a remote
/// call fails.
pub struct SessionState {
    store: Arc<dyn LocalStore>,
    identity: Arc<dyn IdentitySource>,
    principal: watch::Sender<Option<Arc<Principal>>>,
    resolving: Mutex<()>,
}

impl SessionState {
    pub fn new(store: Arc<dyn LocalStore>, identity: Arc<dyn IdentitySource>) -> Self {
        let (principal, _) = watch::channel(None);
        Self {
            store,
            identity,
            principal,
            resolving: Mutex::new(()),
        }
    }

    /// Current in-memory principal, without resolving.
    pub fn current(&self) -> Option<Arc<Principal>> {
        self.principal.borrow().clone()
    }

    /// Watch the principal change (sign-in, resolution, logout).
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Principal>>> {
        self.principal.subscribe()
    }

    /// Resolve the principal, or `None` if the user is not authenticated.
    ///
    /// Never fails: remote errors resolve to `None`. Concurrent callers
    /// share a single resolution.
    pub async fn load_principal(&self) -> Option<Arc<Principal>> {
        if let Some(principal) = self.current() {
            record(Source::Memory);
            return Some(principal);
        }

        let _resolving = self.resolving.lock().await;
        // Another caller may have resolved while we waited.
        if let Some(principal) = self.current() {
            record(Source::Memory);
            return Some(principal);
        }

        if let Some(principal) = self.load_persisted() {
            let principal = Arc::new(principal);
            self.principal.send_replace(Some(Arc::clone(&principal)));
            debug!(id = %principal.id, "principal restored from storage");
            record(Source::Storage);
            return Some(principal);
        }

        match self.identity.who_am_i().await {
            Ok(principal) => {
                self.persist(&principal);
                let principal = Arc::new(principal);
                self.principal.send_replace(Some(Arc::clone(&principal)));
                info!(id = %principal.id, "principal resolved");
                record(Source::Remote);
                Some(principal)
            }
            Err(e) => {
                self.principal.send_replace(None);
                info!(error = %e, "no authenticated principal");
                record(Source::None);
                None
            }
        }
    }

    /// True iff a principal is held and its scopes intersect `required`.
    ///
    /// An empty `required` set yields `false`; callers decide whether an
    /// empty set means "unrestricted".
    pub fn has_scope<S: AsRef<str>>(&self, required: &[S]) -> bool {
        match self.current() {
            Some(principal) => principal.has_any_scope(required),
            None => false,
        }
    }

    /// Adopt `principal` after a completed login and persist it.
    pub fn sign_in(&self, principal: Principal) -> Arc<Principal> {
        self.persist(&principal);
        let principal = Arc::new(principal);
        self.principal.send_replace(Some(Arc::clone(&principal)));
        info!(id = %principal.id, "signed in");
        principal
    }

    /// Forget the principal in memory and in storage.
    ///
    /// The identity provider's own logout flow is driven by the caller.
    pub fn logout(&self) {
        if let Err(e) = self.store.remove(USER_KEY) {
            warn!(error = %e, "failed to remove persisted principal");
        }
        if let Some(previous) = self.principal.send_replace(None) {
            info!(id = %previous.id, "logged out");
        }
    }

    fn load_persisted(&self) -> Option<Principal> {
        let raw = match self.store.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "failed to read persisted principal");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(principal) => Some(principal),
            Err(e) => {
                warn!(error = %e, "discarding corrupt persisted principal");
                if let Err(e) = self.store.remove(USER_KEY) {
                    warn!(error = %e, "failed to remove corrupt principal");
                }
                None
            }
        }
    }

    fn persist(&self, principal: &Principal) {
        let result = serde_json::to_string(principal)
            .map_err(crate::CorralError::from)
            .and_then(|json| self.store.set(USER_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist principal");
        }
    }
}

fn record(source: Source) {
    metrics::counter!(telemetry::SESSION_RESOLUTIONS_TOTAL, "source" => source.label())
        .increment(1);
}
