//! Client-side request cache.
//!
//! - [`CacheKey`]: structured key with a deterministic canonical string.
//! - [`CacheService`]: fetch coordinator that binds handles, runs
//!   producers with dedup / TTL / stale-while-revalidate, invalidates.
//! - [`CacheHandle`]: reactive typed view for binding entries into views.
//!
//! # Policy
//!
//! `load` serves a fresh entry as-is, declines while another fetch for
//! the same key is running, and otherwise starts exactly one fetch.
//! Failures are stored as the entry's `error` message and never clear
//! existing data, so a view can keep showing the last good value next to
//! the error.
//!
//! # Stale-while-revalidate
//!
//! With [`LoadConfig::stale_while_revalidate`] and stale data present, the
//! background fetch leaves `loading` lowered. Views get no signal that a
//! silent refresh is running until its result lands.

mod entry;
mod handle;
mod key;
pub mod pattern;
mod service;
mod store;

pub use entry::{CacheEntry, CacheStats};
pub use handle::CacheHandle;
pub use key::{CacheKey, Identifier};
pub use pattern::KeyPattern;
pub use service::{CacheService, DEFAULT_TTL, LoadConfig, LoadOutcome};
