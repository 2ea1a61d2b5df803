//! Configuration types for talking to the PDFsimple service.
//!
//! Every knob lives in [`ClientConfig`], built via its
//! [`ClientConfigBuilder`] or read from the environment with
//! [`ClientConfig::from_env`].

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the service base URL.
pub const API_URL_ENV: &str = "PDFSIMPLE_API_URL";

/// Base URL used when [`API_URL_ENV`] is unset or empty.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Configuration for a [`crate::client::JobClient`].
///
/// # Example
/// ```rust
/// use pdfsimple_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://pdf.example.com")
///     .poll_interval_ms(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://pdf.example.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service root, without a trailing slash. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Delay between status queries for a single job. Default: 1000 ms.
    pub poll_interval_ms: u64,

    /// Delay between status queries for each batch item. Default: 2000 ms.
    ///
    /// A batch of N files runs N chains at once.
    pub batch_poll_interval_ms: u64,

    /// Per-request timeout for submissions and status queries. Default: 120 s.
    ///
    /// Uploads of large scans dominate this number; status queries return in
    /// milliseconds.
    pub request_timeout_secs: u64,

    /// Timeout for result downloads. Default: 300 s.
    pub download_timeout_secs: u64,

    /// Maximum status queries per job before giving up. Default: None (poll
    /// until terminal or cancelled).
    pub max_polls: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            poll_interval_ms: 1000,
            batch_poll_interval_ms: 2000,
            request_timeout_secs: 120,
            download_timeout_secs: 300,
            max_polls: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the base URL taken from `PDFSIMPLE_API_URL` when set.
    ///
    /// The variable goes through the same validation as
    /// [`ClientConfigBuilder::base_url`], so a malformed value is an error.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::with_url_override(std::env::var(API_URL_ENV).ok())
    }

    fn with_url_override(url: Option<String>) -> Result<Self, ClientError> {
        match url {
            Some(url) if !url.trim().is_empty() => Self::builder().base_url(url).build(),
            _ => Ok(Self::default()),
        }
    }

    /// Poll cadence for a job submitted on its own.
    pub fn single_cadence(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Poll cadence for a job that is one item of a batch.
    pub fn batch_cadence(&self) -> Duration {
        Duration::from_millis(self.batch_poll_interval_ms)
    }

    /// Absolute URL for an API path such as `/jobs`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn batch_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.batch_poll_interval_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn max_polls(mut self, n: Option<u32>) -> Self {
        self.config.max_polls = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        let c = &self.config;
        if c.base_url.is_empty() {
            return Err(ClientError::InvalidConfig("base URL must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.poll_interval_ms == 0 || c.batch_poll_interval_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "poll intervals must be ≥ 1 ms".into(),
            ));
        }
        if c.max_polls == Some(0) {
            return Err(ClientError::InvalidConfig("max polls must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
