//! Per-navigation authorization state machine.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::session::{Principal, SessionState};
use crate::telemetry;

/// Default login page.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Default page for authenticated users lacking a scope.
pub const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Query parameter carrying the originally requested destination.
pub const RETURN_URL_PARAM: &str = "returnUrl";

/// State of one navigation attempt.
///
/// `Pending → Resolving → Allowed | DeniedUnauthenticated | DeniedInsufficientScope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Resolving,
    Allowed,
    DeniedUnauthenticated,
    DeniedInsufficientScope,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GateState::Allowed
                | GateState::DeniedUnauthenticated
                | GateState::DeniedInsufficientScope
        )
    }

    fn can_advance_to(self, next: GateState) -> bool {
        match self {
            GateState::Pending => next == GateState::Resolving,
            GateState::Resolving => next.is_terminal(),
            _ => false,
        }
    }

    fn outcome_label(self) -> &'static str {
        match self {
            GateState::Allowed => "allowed",
            GateState::DeniedUnauthenticated => "unauthenticated",
            GateState::DeniedInsufficientScope => "insufficient_scope",
            GateState::Pending | GateState::Resolving => "pending",
        }
    }
}

/// Replacement navigation for a denied attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Page to navigate to instead (login or unauthorized).
    pub path: String,
    /// The destination that was denied.
    pub return_url: String,
}

impl Redirect {
    /// `path?returnUrl=<encoded destination>`.
    pub fn location(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(RETURN_URL_PARAM, &self.return_url)
            .finish();
        format!("{}?{query}", self.path)
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}

/// Terminal result of [`AuthorizationGate::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub destination: String,
    pub state: GateState,
    /// Set for both denied states.
    pub redirect: Option<Redirect>,
}

impl GateDecision {
    pub fn allowed(&self) -> bool {
        self.state == GateState::Allowed
    }
}

/// One navigation attempt moving through [`GateState`]s.
struct Attempt<'a> {
    destination: &'a str,
    state: GateState,
}

impl<'a> Attempt<'a> {
    fn new(destination: &'a str) -> Self {
        Self {
            destination,
            state: GateState::Pending,
        }
    }

    fn advance(&mut self, next: GateState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal gate transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(destination = self.destination, from = ?self.state, to = ?next, "gate transition");
        self.state = next;
    }
}

/// Decides whether a navigation may proceed.
pub struct AuthorizationGate {
    session: Arc<SessionState>,
    login_path: String,
    unauthorized_path: String,
}

impl AuthorizationGate {
    pub fn new(session: Arc<SessionState>) -> Self {
        Self::with_paths(session, DEFAULT_LOGIN_PATH, DEFAULT_UNAUTHORIZED_PATH)
    }

    pub fn with_paths(
        session: Arc<SessionState>,
        login_path: impl Into<String>,
        unauthorized_path: impl Into<String>,
    ) -> Self {
        Self {
            session,
            login_path: login_path.into(),
            unauthorized_path: unauthorized_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn unauthorized_path(&self) -> &str {
        &self.unauthorized_path
    }

    /// Run the gate for `destination` requiring any of `required_scopes`.
    ///
    /// An empty scope set admits every authenticated user. Unauthenticated
    /// users are always denied, whatever the scope set.
    pub async fn authorize<S: AsRef<str>>(
        &self,
        destination: &str,
        required_scopes: &[S],
    ) -> GateDecision {
        let mut attempt = Attempt::new(destination);
        attempt.advance(GateState::Resolving);

        let principal = self.session.load_principal().await;
        let (state, redirect_path) = self.decide(principal.as_deref(), required_scopes);
        attempt.advance(state);

        metrics::counter!(telemetry::GATE_DECISIONS_TOTAL, "outcome" => state.outcome_label())
            .increment(1);

        GateDecision {
            destination: destination.to_string(),
            state,
            redirect: redirect_path.map(|path| Redirect {
                path: path.clone(),
                return_url: destination.to_string(),
            }),
        }
    }

    /// Terminal state for the principal this attempt resolved.
    fn decide<S: AsRef<str>>(
        &self,
        principal: Option<&Principal>,
        required_scopes: &[S],
    ) -> (GateState, Option<&String>) {
        match principal {
            None => (GateState::DeniedUnauthenticated, Some(&self.login_path)),
            Some(_) if required_scopes.is_empty() => (GateState::Allowed, None),
            Some(p) if p.has_any_scope(required_scopes) => (GateState::Allowed, None),
            Some(_) => (
                GateState::DeniedInsufficientScope,
                Some(&self.unauthorized_path),
            ),
        }
    }
}
