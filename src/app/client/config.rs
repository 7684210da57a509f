//! HTTP client configuration and building logic
//!
//! This module holds where the Canvas API lives and how the underlying
//! transport is built, or accepts a pre-built transport.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{canvas, http};
use crate::errors::{ApiError, ApiResult, AuthError, AuthResult};

/// Configuration for the Canvas API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Canvas host, optionally with an explicit `http://` or `https://` scheme
    pub host: String,
    /// Prefix of every API path (e.g. `/api/v1`)
    pub api_path_prefix: String,
    /// Pre-built transport; when absent one is built from the settings below
    #[serde(skip)]
    pub transport: Option<Client>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout (None = no deadline)
    pub request_timeout: Option<Duration>,
    /// Maximum idle connections kept per host
    pub pool_max_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: canvas::DEFAULT_HOST.to_string(),
            api_path_prefix: canvas::DEFAULT_API_PATH.to_string(),
            transport: None,
            connect_timeout: http::CONNECT_TIMEOUT,
            request_timeout: None,
            pool_max_per_host: http::POOL_MAX_PER_HOST,
        }
    }
}

impl ClientConfig {
    /// Point the client at another host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Use another API path prefix
    pub fn with_api_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_path_prefix = prefix.into();
        self
    }

    /// Use a pre-built HTTP client for every request
    pub fn with_transport(mut self, client: Client) -> Self {
        self.transport = Some(client);
        self
    }

    /// Root URL of the API: scheme, host and path prefix
    ///
    /// The result always ends with `/` so that relative endpoint paths join
    /// beneath the prefix rather than replacing its last segment.
    pub fn api_base_url(&self) -> ApiResult<Url> {
        let host = self.host.trim().trim_end_matches('/');
        let origin = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("{}://{}", canvas::DEFAULT_SCHEME, host)
        };

        let prefix = self.api_path_prefix.trim_matches('/');
        let raw = if prefix.is_empty() {
            format!("{}/", origin)
        } else {
            format!("{}/{}/", origin, prefix)
        };

        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: raw.clone(),
            error: e.to_string(),
        })
    }

    /// Builds the HTTP client, or hands back the injected one
    pub fn build_http_client(&self) -> AuthResult<Client> {
        if let Some(client) = &self.transport {
            return Ok(client.clone());
        }

        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .pool_idle_timeout(http::POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if let Some(timeout) = self.request_timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder.build().map_err(AuthError::Http)
    }
}
