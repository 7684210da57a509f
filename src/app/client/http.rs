//! Core HTTP operations against the Canvas API
//!
//! Every request leaves through [`HttpHandler`], which attaches the bearer
//! token. Requests are attempted once; status codes of 400 and above are
//! errors.

use std::fmt;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::{ApiError, ApiResult};

/// Authenticated HTTP operations handler
pub struct HttpHandler {
    client: Client,
    token: String,
}

impl fmt::Debug for HttpHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpHandler")
            .field("client", &self.client)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HttpHandler {
    /// Creates a new HttpHandler; `token` must already be validated
    pub(crate) fn new(client: Client, token: String) -> Self {
        Self { client, token }
    }

    /// Sends an authenticated GET and returns the raw response
    ///
    /// The response status is not inspected; callers decide what counts as
    /// failure.
    pub async fn get(&self, url: &Url) -> reqwest::Result<Response> {
        tracing::trace!("GET {}", url);
        self.client
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
    }

    /// Fetches `url` and decodes its JSON body
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the transport fails, the status is 400 or
    /// above, or the body does not decode into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> ApiResult<T> {
        let response = self.get(url).await.map_err(|source| ApiError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|source| ApiError::Request {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
