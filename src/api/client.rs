//! HTTP client for the ranch API.
//!
//! Every failure is classified into a [`FetchError`] so results can be
//! handed straight to the cache as a producer.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{CorralError, FetchError, Result};

/// Default base URL of the ranch API (local development server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `{ "data": ... }` wrapper used by every API response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Error body shape; only `message` is surfaced.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the ranch API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            CorralError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    /// Attach an opaque access token issued by the identity provider.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base}/{path}` decoded as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, FetchError> {
        let mut request = self
            .http
            .get(self.url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        let status = response.status().as_u16();

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::InvalidResponse {
            status,
            detail: e.to_string(),
        })
    }

    /// `GET` an enveloped resource and return its `data`.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, FetchError> {
        self.get_json::<Envelope<T>>(path).await.map(|e| e.data)
    }

    async fn check_status(response: Response) -> std::result::Result<Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .bytes()
            .await
            .ok()
            .and_then(|body| serde_json::from_slice::<ErrorBody>(&body).ok())
            .and_then(|body| body.message);
        Err(FetchError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.bearer_token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client = ApiClient::new("http://api.test/").unwrap();
        assert_eq!(client.url("/api/v1/users/me"), "http://api.test/api/v1/users/me");
        assert_eq!(client.url("animals"), "http://api.test/animals");
    }

    #[test]
    fn debug_hides_token() {
        let client = ApiClient::new("http://api.test").unwrap().bearer_token("secret");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("authenticated: true"));
    }
}
