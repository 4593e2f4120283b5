//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (e.g. `--config <path>`), which must exist
//! 2. `~/.corral/config.toml` (user)
//! 3. `/etc/corral/config.toml` (system)
//!
//! When no file is found the defaults are used.
//!
//! ```toml
//! [api]
//! base_url = "https://api.ranch.example"
//!
//! [cache]
//! default_ttl_secs = 120
//!
//! [[navigation.routes]]
//! path = "animals/:id"
//! scopes = ["animal:read"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::gate::{DEFAULT_LOGIN_PATH, DEFAULT_UNAUTHORIZED_PATH, Route};
use crate::session::DEFAULT_ME_PATH;
use crate::session::storage::default_storage_path;
use crate::{CorralError, Result};

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// Ranch API access.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL (default: http://localhost:8000).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Current-user endpoint (default: /api/v1/users/me).
    #[serde(default = "default_me_path")]
    pub me_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            me_path: default_me_path(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_me_path() -> String {
    DEFAULT_ME_PATH.to_string()
}

/// Request cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Default TTL in seconds (default: 300).
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

fn default_ttl_secs() -> u64 {
    300
}

/// Durable local storage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Storage file (default: `<data dir>/corral/storage.json`).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_storage_path)
    }
}

/// Redirect targets and extra routes.
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_unauthorized_path")]
    pub unauthorized_path: String,
    /// Added to (or replacing entries of) the default route table.
    /// Routes declaring scopes are always guarded.
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            unauthorized_path: default_unauthorized_path(),
            routes: Vec::new(),
        }
    }
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_unauthorized_path() -> String {
    DEFAULT_UNAUTHORIZED_PATH.to_string()
}

impl ClientConfig {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CorralError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            CorralError::Configuration(msg) => {
                CorralError::Configuration(format!("Failed to parse config file {path:?}: {msg}"))
            }
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CorralError::Configuration(e.to_string()))
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CorralError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".corral").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/corral/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.me_path, "/api/v1/users/me");
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(300));
        assert_eq!(config.navigation.login_path, "/login");
        assert_eq!(config.navigation.unauthorized_path, "/unauthorized");
        assert!(config.navigation.routes.is_empty());
        assert!(config.storage.resolved_path().ends_with("storage.json"));
    }

    #[test]
    fn parses_full_config() {
        let toml = r#"
            [api]
            base_url = "https://api.ranch.test"
            timeout_secs = 5

            [cache]
            default_ttl_secs = 60

            [storage]
            path = "/tmp/corral/storage.json"

            [navigation]
            login_path = "/sign-in"

            [[navigation.routes]]
            path = "animals/:id"
            guarded = true
            scopes = ["animal:read", "animal:write"]
        "#;
        let config = ClientConfig::from_toml(toml).unwrap();
        assert_eq!(config.api.base_url, "https://api.ranch.test");
        assert_eq!(config.api.timeout(), Duration::from_secs(5));
        assert_eq!(config.cache.default_ttl_secs, 60);
        assert_eq!(
            config.storage.resolved_path(),
            PathBuf::from("/tmp/corral/storage.json")
        );
        assert_eq!(config.navigation.login_path, "/sign-in");
        assert_eq!(config.navigation.unauthorized_path, "/unauthorized");
        assert_eq!(config.navigation.routes[0].scopes.len(), 2);
    }

    #[test]
    fn invalid_toml_is_configuration_error() {
        let err = ClientConfig::from_toml("[api\nbase_url = 1").unwrap_err();
        assert!(matches!(err, CorralError::Configuration(_)));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let err = ClientConfig::load(Some(Path::new("/nonexistent/corral.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\ndefault_ttl_secs = 10\n").unwrap();
        let config = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(config.cache.default_ttl_secs, 10);
    }
}
