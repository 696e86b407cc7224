//! HTTP client for the Docker Hub repositories API.
//!
//! Wraps `reqwest` with typed response deserialization. Only the
//! `pull_count` field of the repository endpoint is consumed.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Production Docker Hub API base for repository metadata.
pub const DEFAULT_URL_BASE: &str = "https://hub.docker.com/v2/repositories/";

/// Errors returned when fetching a pull count.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, TLS, timeout, or body decode failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("Registry returned {status} for image '{image}'")]
    Status {
        image: String,
        status: reqwest::StatusCode,
    },
}

/// Repository metadata returned by the registry. Remaining fields of the
/// response are ignored.
#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    pull_count: u64,
}

/// Client for the Docker Hub repositories API.
///
/// Use [`RegistryClient::new`] for production or
/// [`RegistryClient::with_url_base`] to point at a mock server in tests.
pub struct RegistryClient {
    client: reqwest::Client,
    url_base: String,
}

impl RegistryClient {
    /// Create a client pointed at the production Docker Hub API.
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        Self::with_url_base(DEFAULT_URL_BASE, timeout_secs)
    }

    /// Create a client with a custom base URL.
    pub fn with_url_base(url_base: &str, timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("pullwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Normalise to exactly one trailing slash so image paths append
        // cleanly.
        let url_base = format!("{}/", url_base.trim_end_matches('/'));

        Ok(Self { client, url_base })
    }

    /// Fetch the current cumulative pull count for an image reference
    /// (e.g. `falcosecurity/falco`).
    pub async fn fetch_pull_count(&self, image: &str) -> Result<u64, FetchError> {
        let url = format!("{}{}", self.url_base, image);
        debug!("Fetching pull count from {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                image: image.to_string(),
                status: response.status(),
            });
        }

        let info: RepositoryInfo = response.json().await?;
        Ok(info.pull_count)
    }
}
