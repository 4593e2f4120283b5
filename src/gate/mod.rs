//! Route guarding.
//!
//! [`AuthorizationGate`] runs one navigation attempt through
//! `Pending → Resolving → terminal`, resolving the principal through
//! [`SessionState`](crate::SessionState) on the way. Denials are
//! redirects, never errors: unauthenticated users go to the login page,
//! users lacking every required scope go to the unauthorized page, both
//! carrying the original destination as `returnUrl`.
//!
//! [`Router`] pairs the gate with a [`RouteTable`] so callers can hand it
//! a URL and act on the [`Navigation`] it returns.

mod authorize;
mod router;
mod routes;

pub use authorize::{
    AuthorizationGate, DEFAULT_LOGIN_PATH, DEFAULT_UNAUTHORIZED_PATH, GateDecision, GateState,
    RETURN_URL_PARAM, Redirect,
};
pub use router::{Navigation, Router};
pub use routes::{Route, RouteTable, path_of};
