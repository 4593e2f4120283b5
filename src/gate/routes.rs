//! Route declarations and path matching.

use serde::Deserialize;

/// One navigable route.
///
/// Patterns are `/`-separated segments without a leading slash. `:name`
/// matches any single segment; a lone `*` matches any path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Route {
    pub path: String,
    /// Whether navigation runs the authorization gate.
    #[serde(default)]
    pub guarded: bool,
    /// Any one of these scopes grants access. Empty admits every
    /// authenticated user.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Route {
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            guarded: false,
            scopes: Vec::new(),
        }
    }

    pub fn guarded(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            guarded: true,
            scopes: Vec::new(),
        }
    }

    pub fn with_scopes<S: Into<String>>(mut self, scopes: impl IntoIterator<Item = S>) -> Self {
        self.guarded = true;
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    fn is_wildcard(&self) -> bool {
        self.path == "*" || self.path == "**"
    }

    fn matches(&self, segments: &[&str]) -> bool {
        let pattern: Vec<&str> = split_segments(&self.path);
        pattern.len() == segments.len()
            && pattern
                .iter()
                .zip(segments)
                .all(|(p, s)| p.starts_with(':') || p == s)
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Path component of a URL: query and fragment removed.
pub fn path_of(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Ordered route table; the first matching route wins, wildcards last.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The client's page routes.
    pub fn client_defaults() -> Self {
        Self::new()
            .route(Route::public(""))
            .route(Route::public("register"))
            .route(Route::public("login"))
            .route(Route::public("login/callback"))
            .route(Route::public("forgot-password"))
            .route(Route::public("reset-password/:token"))
            .route(Route::public("multifactor-auth"))
            .route(Route::guarded("home"))
            .route(Route::public("unauthorized"))
            .route(Route::public("*"))
    }

    /// Add a route. A route with the same path replaces the existing one.
    pub fn route(mut self, route: Route) -> Self {
        self.insert(route);
        self
    }

    /// Insert or replace. A route declaring scopes is always guarded.
    pub fn insert(&mut self, mut route: Route) {
        route.guarded |= !route.scopes.is_empty();
        match self.routes.iter_mut().find(|r| r.path == route.path) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Route for `url` (query and fragment ignored).
    pub fn resolve(&self, url: &str) -> Option<&Route> {
        let segments = split_segments(path_of(url));
        self.routes
            .iter()
            .filter(|r| !r.is_wildcard())
            .find(|r| r.matches(&segments))
            .or_else(|| self.routes.iter().find(|r| r.is_wildcard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_and_fragment() {
        assert_eq!(path_of("/home?tab=1#top"), "/home");
        assert_eq!(path_of("/home#top"), "/home");
        assert_eq!(path_of("/home"), "/home");
    }

    #[test]
    fn resolves_defaults() {
        let table = RouteTable::client_defaults();
        assert_eq!(table.resolve("/").unwrap().path, "");
        assert!(table.resolve("/home").unwrap().guarded);
        assert_eq!(
            table.resolve("/reset-password/abc123").unwrap().path,
            "reset-password/:token"
        );
        assert_eq!(table.resolve("/login/callback?code=x").unwrap().path, "login/callback");
    }

    #[test]
    fn unknown_paths_hit_wildcard() {
        let table = RouteTable::client_defaults();
        assert_eq!(table.resolve("/no/such/page").unwrap().path, "*");
    }

    #[test]
    fn no_wildcard_means_none() {
        let table = RouteTable::new().route(Route::guarded("home"));
        assert!(table.resolve("/elsewhere").is_none());
    }

    #[test]
    fn wildcard_declared_first_still_loses() {
        let table = RouteTable::new()
            .route(Route::public("*"))
            .route(Route::guarded("animals/:id").with_scopes(["animal:read"]));
        let route = table.resolve("/animals/9").unwrap();
        assert_eq!(route.scopes, vec!["animal:read".to_string()]);
    }

    #[test]
    fn scoped_route_is_guarded() {
        let route: Route = toml::from_str("path = \"herds\"\nscopes = [\"herd:read\"]").unwrap();
        assert!(!route.guarded);
        let table = RouteTable::new().route(route);
        assert!(table.resolve("/herds").unwrap().guarded);
    }

    #[test]
    fn insert_replaces_same_path() {
        let table = RouteTable::client_defaults().route(Route::guarded("home").with_scopes(["tenant:member"]));
        let home: Vec<_> = table.routes().iter().filter(|r| r.path == "home").collect();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].scopes, vec!["tenant:member".to_string()]);
    }
}
