//! Remote "who am I" resolution.

use async_trait::async_trait;

use super::principal::Principal;
use crate::FetchError;
use crate::api::ApiClient;

/// Default path of the current-user endpoint.
pub const DEFAULT_ME_PATH: &str = "/api/v1/users/me";

/// Source of the current authenticated principal.
///
/// Any failure (including "not authenticated") is reported as an error;
/// [`SessionState`](super::SessionState) turns it into an absent principal.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn who_am_i(&self) -> Result<Principal, FetchError>;
}

/// [`IdentitySource`] backed by the ranch API's `users/me` endpoint.
pub struct HttpIdentitySource {
    client: ApiClient,
    me_path: String,
}

impl HttpIdentitySource {
    pub fn new(client: ApiClient) -> Self {
        Self::with_path(client, DEFAULT_ME_PATH)
    }

    pub fn with_path(client: ApiClient, me_path: impl Into<String>) -> Self {
        Self {
            client,
            me_path: me_path.into(),
        }
    }
}

#[async_trait]
impl IdentitySource for HttpIdentitySource {
    async fn who_am_i(&self) -> Result<Principal, FetchError> {
        self.client.get_data::<Principal>(&self.me_path).await
    }
}
