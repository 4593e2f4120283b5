//! Corral error types

/// User-facing message for failures that never reached the server.
pub const CONNECTIVITY_MESSAGE: &str = "Network error. Please check your connection.";

/// Corral error types
#[derive(Debug, thiserror::Error)]
pub enum CorralError {
    // Cache usage errors
    /// `load`/`refresh` was called for a key whose handle was never acquired.
    #[error("handle not acquired for key: {0}. Call acquire_handle() first.")]
    HandleNotAcquired(String),

    /// The key was first acquired with a different value type.
    #[error("cache key '{key}' holds {stored}, not {requested}")]
    TypeMismatch {
        key: String,
        stored: &'static str,
        requested: &'static str,
    },

    // Persistence errors
    #[error("storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Remote errors surfaced outside the cache (CLI, identity probes)
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Failure of a data-producing operation.
///
/// Producers handed to [`CacheService::load`](crate::CacheService::load)
/// fail with this type. The coordinator never propagates it; it turns it
/// into the entry's `error` message via [`user_message()`](Self::user_message).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// No response reached the client (DNS, refused connection, timeout).
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// The server answered with a non-success status.
    #[error("server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    /// The server answered but the body could not be decoded.
    #[error("invalid response ({status}): {detail}")]
    InvalidResponse { status: u16, detail: String },
}

impl FetchError {
    /// Shorthand for a server failure carrying a message.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        FetchError::Server {
            status,
            message: Some(message.into()),
        }
    }

    /// The message stored in a cache entry when a fetch fails.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Connectivity(_) => CONNECTIVITY_MESSAGE.to_string(),
            FetchError::Server {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            FetchError::Server { status, .. } | FetchError::InvalidResponse { status, .. } => {
                format!("Server error: {status}")
            }
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Connectivity(_) => None,
            FetchError::Server { status, .. } | FetchError::InvalidResponse { status, .. } => {
                Some(*status)
            }
        }
    }

    /// Whether an explicit retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Connectivity(_) => true,
            FetchError::Server { status, .. } => *status == 429 || *status >= 500,
            FetchError::InvalidResponse { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if err.is_decode() => FetchError::InvalidResponse {
                status: status.as_u16(),
                detail: err.to_string(),
            },
            Some(status) => FetchError::Server {
                status: status.as_u16(),
                message: None,
            },
            None => FetchError::Connectivity(err.to_string()),
        }
    }
}

/// Result type alias for Corral operations
pub type Result<T> = std::result::Result<T, CorralError>;
