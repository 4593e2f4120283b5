//! Telemetry metric name constants.
//!
//! Centralised metric names for corral operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `corral_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `scope`: the cache key scope (e.g. "animals", "profile")
//! - `status`: outcome: "ok" or "error"
//! - `source`: where a principal came from: "memory", "storage", "remote", "none"
//! - `outcome`: gate terminal state: "allowed", "unauthenticated", "insufficient_scope"

/// Loads served from a fresh entry without invoking the producer.
///
/// Labels: `scope`.
pub const CACHE_HITS_TOTAL: &str = "corral_cache_hits_total";

/// Loads declined because a fetch for the same key was already in flight.
///
/// Labels: `scope`.
pub const CACHE_DEDUPLICATED_TOTAL: &str = "corral_cache_deduplicated_total";

/// Completed fetches.
///
/// Labels: `scope`, `status` ("ok" | "error").
pub const FETCHES_TOTAL: &str = "corral_fetches_total";

/// Fetch duration in seconds.
///
/// Labels: `scope`.
pub const FETCH_DURATION_SECONDS: &str = "corral_fetch_duration_seconds";

/// Entries marked stale by `invalidate` / `invalidate_pattern`.
pub const INVALIDATIONS_TOTAL: &str = "corral_invalidations_total";

/// Explicit retry attempts (not counting the initial request).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "corral_retries_total";

/// Principal resolutions.
///
/// Labels: `source`.
pub const SESSION_RESOLUTIONS_TOTAL: &str = "corral_session_resolutions_total";

/// Authorization gate decisions.
///
/// Labels: `outcome`.
pub const GATE_DECISIONS_TOTAL: &str = "corral_gate_decisions_total";
