//! Process-wide client context.
//!
//! One [`AppContext`] owns the API client, the request cache, the session
//! state, the theme preference and the router. Build it once at start-up
//! with [`Corral::builder()`] and share it by reference.

mod builder;

use std::sync::Arc;

pub use builder::{Corral, CorralBuilder};

use crate::api::ApiClient;
use crate::cache::CacheService;
use crate::gate::Router;
use crate::session::SessionState;
use crate::theme::ThemeSettings;

pub struct AppContext {
    api: ApiClient,
    cache: Arc<CacheService>,
    session: Arc<SessionState>,
    theme: ThemeSettings,
    router: Router,
}

impl AppContext {
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn theme(&self) -> &ThemeSettings {
        &self.theme
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Forget the principal and every cached response.
    pub fn logout(&self) {
        self.session.logout();
        self.cache.clear_all();
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("api", &self.api)
            .field("cached_keys", &self.cache.keys().len())
            .field("authenticated", &self.session.current().is_some())
            .field("theme", &self.theme.current())
            .finish()
    }
}
