//! Builder for the process-wide client context

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::AppContext;
use crate::api::{ApiClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::cache::{CacheService, DEFAULT_TTL};
use crate::config::ClientConfig;
use crate::gate::{
    AuthorizationGate, DEFAULT_LOGIN_PATH, DEFAULT_UNAUTHORIZED_PATH, Route, RouteTable, Router,
};
use crate::session::storage::default_storage_path;
use crate::session::{
    DEFAULT_ME_PATH, FileStore, HttpIdentitySource, IdentitySource, LocalStore, SessionState,
};
use crate::theme::ThemeSettings;
use crate::{CorralError, Result};

/// Main entry point for creating a client context.
pub struct Corral;

impl Corral {
    /// Create a new builder for configuring the context.
    pub fn builder() -> CorralBuilder {
        CorralBuilder::new()
    }
}

/// Builder for [`AppContext`].
pub struct CorralBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    bearer_token: Option<String>,
    me_path: Option<String>,
    default_ttl: Option<Duration>,
    storage: Option<Arc<dyn LocalStore>>,
    storage_path: Option<PathBuf>,
    identity: Option<Arc<dyn IdentitySource>>,
    login_path: Option<String>,
    unauthorized_path: Option<String>,
    routes: Vec<Route>,
}

impl CorralBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout_secs: None,
            bearer_token: None,
            me_path: None,
            default_ttl: None,
            storage: None,
            storage_path: None,
            identity: None,
            login_path: None,
            unauthorized_path: None,
            routes: Vec::new(),
        }
    }

    /// Seed every option from a loaded [`ClientConfig`].
    ///
    /// Later builder calls override what the config set.
    pub fn from_config(mut self, config: &ClientConfig) -> Self {
        self.base_url = Some(config.api.base_url.clone());
        self.timeout_secs = Some(config.api.timeout_secs);
        self.me_path = Some(config.api.me_path.clone());
        self.default_ttl = Some(config.cache.default_ttl());
        if let Some(path) = &config.storage.path {
            self.storage_path = Some(path.clone());
        }
        self.login_path = Some(config.navigation.login_path.clone());
        self.unauthorized_path = Some(config.navigation.unauthorized_path.clone());
        self.routes.extend(config.navigation.routes.iter().cloned());
        self
    }

    /// Ranch API base URL (default: http://localhost:8000).
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Request timeout in seconds (default: 30).
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Opaque access token attached to API requests.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Current-user endpoint used by the default identity source.
    pub fn me_path(mut self, path: impl Into<String>) -> Self {
        self.me_path = Some(path.into());
        self
    }

    /// Default cache TTL (default: 5 minutes).
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Use a custom local store instead of the JSON file.
    pub fn storage(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.storage = Some(store);
        self
    }

    /// Location of the JSON storage file. Ignored when [`storage`](Self::storage) is set.
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Use a custom identity source instead of `GET me_path`.
    pub fn identity(mut self, identity: Arc<dyn IdentitySource>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    pub fn unauthorized_path(mut self, path: impl Into<String>) -> Self {
        self.unauthorized_path = Some(path.into());
        self
    }

    /// Add a route on top of the client defaults (same path replaces).
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Build the context.
    pub fn build(self) -> Result<AppContext> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url).map_err(|e| {
            CorralError::Configuration(format!("invalid API base URL '{base_url}': {e}"))
        })?;

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let mut api = ApiClient::with_timeout(base_url, timeout)?;
        if let Some(token) = self.bearer_token {
            api = api.bearer_token(token);
        }

        let store: Arc<dyn LocalStore> = match self.storage {
            Some(store) => store,
            None => {
                let path = self.storage_path.unwrap_or_else(default_storage_path);
                debug!(path = %path.display(), "using file storage");
                Arc::new(FileStore::new(path))
            }
        };

        let identity: Arc<dyn IdentitySource> = match self.identity {
            Some(identity) => identity,
            None => Arc::new(HttpIdentitySource::with_path(
                api.clone(),
                self.me_path.unwrap_or_else(|| DEFAULT_ME_PATH.to_string()),
            )),
        };

        let cache = Arc::new(CacheService::with_default_ttl(
            self.default_ttl.unwrap_or(DEFAULT_TTL),
        ));
        let session = Arc::new(SessionState::new(Arc::clone(&store), identity));
        let theme = ThemeSettings::load(store);

        let mut routes = RouteTable::client_defaults();
        for route in self.routes {
            routes.insert(route);
        }
        let gate = AuthorizationGate::with_paths(
            Arc::clone(&session),
            self.login_path
                .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            self.unauthorized_path
                .unwrap_or_else(|| DEFAULT_UNAUTHORIZED_PATH.to_string()),
        );
        let router = Router::new(routes, gate);

        Ok(AppContext {
            api,
            cache,
            session,
            theme,
            router,
        })
    }
}

impl Default for CorralBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;

    #[test]
    fn rejects_invalid_base_url() {
        let result = Corral::builder()
            .api_base_url("not a url")
            .storage(Arc::new(MemoryStore::new()))
            .build();
        assert!(matches!(result, Err(CorralError::Configuration(_))));
    }

    #[test]
    fn config_routes_extend_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            [cache]
            default_ttl_secs = 42

            [navigation]
            unauthorized_path = "/denied"

            [[navigation.routes]]
            path = "home"
            scopes = ["tenant:member"]
            "#,
        )
        .unwrap();
        let ctx = Corral::builder()
            .from_config(&config)
            .storage(Arc::new(MemoryStore::new()))
            .build()
            .unwrap();

        assert_eq!(ctx.cache().default_ttl(), Duration::from_secs(42));
        assert_eq!(ctx.router().gate().unauthorized_path(), "/denied");
        let home = ctx.router().routes().resolve("/home").unwrap();
        assert_eq!(home.scopes, vec!["tenant:member".to_string()]);
        assert!(ctx.router().routes().resolve("/register").is_some());
    }
}
