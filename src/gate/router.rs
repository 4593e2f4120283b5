//! Navigation entry point: route lookup followed by the gate.

use super::authorize::{AuthorizationGate, GateDecision, Redirect};
use super::routes::{Route, RouteTable};

/// Result of [`Router::navigate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Render `route`. `decision` is present when the route is guarded.
    Proceed {
        route: Route,
        decision: Option<GateDecision>,
    },
    /// The requested navigation is replaced by `redirect`.
    Redirect {
        decision: GateDecision,
        redirect: Redirect,
    },
    /// No route (not even a wildcard) matches.
    NotFound,
}

impl Navigation {
    pub fn proceeds(&self) -> bool {
        matches!(self, Navigation::Proceed { .. })
    }
}

/// Runs the authorization gate for every guarded route transition.
pub struct Router {
    routes: RouteTable,
    gate: AuthorizationGate,
}

impl Router {
    pub fn new(routes: RouteTable, gate: AuthorizationGate) -> Self {
        Self { routes, gate }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub async fn navigate(&self, url: &str) -> Navigation {
        let Some(route) = self.routes.resolve(url) else {
            return Navigation::NotFound;
        };
        if !route.guarded {
            return Navigation::Proceed {
                route: route.clone(),
                decision: None,
            };
        }

        let decision = self.gate.authorize(url, &route.scopes).await;
        match decision.redirect.clone() {
            Some(redirect) => Navigation::Redirect { decision, redirect },
            None => Navigation::Proceed {
                route: route.clone(),
                decision: Some(decision),
            },
        }
    }
}
