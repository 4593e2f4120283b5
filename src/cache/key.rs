//! Structured cache keys and their canonical string form.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// Optional identifier segment of a [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Text(String),
    Number(i64),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Text(s) => f.write_str(s),
            Identifier::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Text(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::Text(s)
    }
}

impl From<i64> for Identifier {
    fn from(n: i64) -> Self {
        Identifier::Number(n)
    }
}

impl From<i32> for Identifier {
    fn from(n: i32) -> Self {
        Identifier::Number(n.into())
    }
}

impl From<u32> for Identifier {
    fn from(n: u32) -> Self {
        Identifier::Number(n.into())
    }
}

/// Structured key addressing one cache entry.
///
/// Equality for caching purposes is defined by [`canonical()`](Self::canonical):
/// `scope`, then `:identifier`, then `?name=<json>&...` with params sorted
/// by name.
///
/// ```rust
/// # use corral::CacheKey;
/// let key = CacheKey::new("animals").id(42).param("page", 2).param("herd", "north");
/// assert_eq!(key.canonical(), r#"animals:42?herd="north"&page=2"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    scope: String,
    identifier: Option<Identifier>,
    params: BTreeMap<String, Value>,
}

impl CacheKey {
    /// Key with only a scope.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            identifier: None,
            params: BTreeMap::new(),
        }
    }

    /// Set the identifier segment.
    pub fn id(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Add (or overwrite) a query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Deterministic string encoding used for lookup.
    ///
    /// Independent of the order in which params were added.
    pub fn canonical(&self) -> String {
        let mut key = self.scope.clone();

        if let Some(identifier) = &self.identifier {
            key.push(':');
            key.push_str(&identifier.to_string());
        }

        if !self.params.is_empty() {
            let joined = self
                .params
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("&");
            key.push('?');
            key.push_str(&joined);
        }

        key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<&str> for CacheKey {
    fn from(scope: &str) -> Self {
        CacheKey::new(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scope_only() {
        assert_eq!(CacheKey::new("profile").canonical(), "profile");
    }

    #[test]
    fn identifier_text_and_number() {
        assert_eq!(CacheKey::new("users").id(7).canonical(), "users:7");
        assert_eq!(
            CacheKey::new("tenants").id("north-ranch").canonical(),
            "tenants:north-ranch"
        );
    }

    #[test]
    fn param_order_is_irrelevant() {
        let a = CacheKey::new("a").param("y", 1).param("x", 2);
        let b = CacheKey::new("a").param("x", 2).param("y", 1);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "a?x=2&y=1");
    }

    #[test]
    fn params_are_json_encoded() {
        let key = CacheKey::new("animals")
            .param("breed", "angus")
            .param("tags", json!(["a", "b"]))
            .param("active", true);
        assert_eq!(
            key.canonical(),
            r#"animals?active=true&breed="angus"&tags=["a","b"]"#
        );
    }

    #[test]
    fn string_and_number_params_differ() {
        let text = CacheKey::new("a").param("page", "1");
        let number = CacheKey::new("a").param("page", 1);
        assert_ne!(text.canonical(), number.canonical());
    }

    #[test]
    fn display_matches_canonical() {
        let key = CacheKey::new("users").id(3).param("q", "x");
        assert_eq!(key.to_string(), key.canonical());
    }
}
