//! HTTP client for the dataserv coordinator
//!
//! The coordinator exposes three GET endpoints keyed by the client address:
//! `/api/register/<address>`, `/api/ping/<address>` and
//! `/api/height/<address>/<height>`. Transport failures are retried with a
//! fixed delay; HTTP error statuses are mapped to [`ClientError`] variants
//! and never retried.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Retry settings for transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub limit: u32,
    /// Pause before each retry
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(limit: u32, delay: Duration) -> Self {
        Self { limit, delay }
    }

    /// Fail on the first transport error
    pub fn none() -> Self {
        Self {
            limit: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Coordinator API client bound to one address
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    server_url: String,
    address: String,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client for `address` against the coordinator at `server_url`
    pub fn new(server_url: &str, address: &str, retry: RetryPolicy) -> Result<Self> {
        if address.is_empty() {
            return Err(ClientError::AddressRequired);
        }
        reqwest::Url::parse(server_url).map_err(|e| {
            ClientError::InvalidArgument(format!("invalid server URL {}: {}", server_url, e))
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
            address: address.to_string(),
            retry,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Register this address with the coordinator
    pub async fn register(&self) -> Result<bool> {
        self.query(&format!("/api/register/{}", self.address)).await
    }

    /// Send a heartbeat for this address
    pub async fn ping(&self) -> Result<bool> {
        self.query(&format!("/api/ping/{}", self.address)).await
    }

    /// Claim `height` shards for this address
    pub async fn height(&self, height: u64) -> Result<bool> {
        self.query(&format!("/api/height/{}/{}", self.address, height))
            .await
    }

    /// GET `api_path`; `Ok(true)` on 200, `Ok(false)` on any other 2xx
    async fn query(&self, api_path: &str) -> Result<bool> {
        let url = format!("{}{}", self.server_url, api_path);
        let mut attempt = 0;

        loop {
            match self.http.get(&url).send().await {
                Ok(response) => {
                    debug!("GET {} -> {}", url, response.status());
                    return self.check_status(response.status());
                }
                Err(e) => {
                    if attempt >= self.retry.limit {
                        return Err(ClientError::ConnectionError(self.server_url.clone()));
                    }
                    attempt += 1;
                    warn!(
                        "Connection to {} failed ({}), retry {}/{} in {:?}",
                        self.server_url, e, attempt, self.retry.limit, self.retry.delay
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }

    fn check_status(&self, status: StatusCode) -> Result<bool> {
        match status {
            StatusCode::OK => Ok(true),
            s if s.is_success() => Ok(false),
            StatusCode::CONFLICT => Err(ClientError::AddressAlreadyRegistered {
                address: self.address.clone(),
                url: self.server_url.clone(),
            }),
            StatusCode::NOT_FOUND => Err(ClientError::FarmerNotFound(self.server_url.clone())),
            StatusCode::BAD_REQUEST => Err(ClientError::InvalidAddress(self.address.clone())),
            StatusCode::INTERNAL_SERVER_ERROR => {
                Err(ClientError::FarmerError(self.server_url.clone()))
            }
            s => Err(ClientError::UnexpectedStatus {
                status: s.as_u16(),
                url: self.server_url.clone(),
            }),
        }
    }
}
