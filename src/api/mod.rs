//! Ranch API access: HTTP client and explicit retry.

mod client;
pub mod retry;

pub use client::{ApiClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, Envelope};
pub use retry::{RetryConfig, with_retry};
