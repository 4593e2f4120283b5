//! Corral - client-side data layer for the ranch management API
//!
//! This crate provides a keyed request cache with deduplication,
//! TTL freshness and stale-while-revalidate, a lazily resolved session
//! principal persisted across restarts, and an authorization gate that
//! turns denied navigations into redirects.
//!
//! # Example
//!
//! ```rust,no_run
//! use corral::{CacheKey, Corral, LoadConfig};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Animal {
//!     id: i64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> corral::Result<()> {
//!     let ctx = Corral::builder()
//!         .api_base_url("https://api.ranch.example")
//!         .build()?;
//!
//!     let key = CacheKey::new("animals").id(7);
//!     let animal = ctx.cache().acquire_handle::<Animal>(&key)?;
//!
//!     let api = ctx.api().clone();
//!     ctx.cache()
//!         .load(&key, || async move { api.get_data::<Animal>("/api/v1/animals/7").await }, &LoadConfig::new())
//!         .await?;
//!
//!     if let Some(animal) = animal.data() {
//!         println!("{} #{}", animal.name, animal.id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod session;
pub mod telemetry;
pub mod theme;

// Re-export main types at crate root
pub use api::{ApiClient, RetryConfig, with_retry};
pub use cache::{
    CacheEntry, CacheHandle, CacheKey, CacheService, CacheStats, DEFAULT_TTL, Identifier,
    KeyPattern, LoadConfig, LoadOutcome,
};
pub use config::ClientConfig;
pub use context::{AppContext, Corral, CorralBuilder};
pub use error::{CONNECTIVITY_MESSAGE, CorralError, FetchError, Result};
pub use gate::{
    AuthorizationGate, GateDecision, GateState, Navigation, Redirect, Route, RouteTable, Router,
};
pub use session::{
    FileStore, HttpIdentitySource, IdentitySource, LocalStore, MemoryStore, Principal, ScopeGrant,
    SessionState,
};
pub use theme::{ThemePreference, ThemeSettings};

/// Crate version.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
