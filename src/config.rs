//! Configuration types for the batch pipeline

use crate::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default number of jobs kept in flight
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Default number of concurrent capability invocations
pub const DEFAULT_INVOKE_WORKERS: usize = 1;

/// Configuration for resolving, invoking and scheduling batch items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeout for a single remote fetch, in seconds
    pub fetch_timeout_secs: u64,

    /// Maximum number of jobs resolving or invoking at the same time
    pub fetch_concurrency: usize,

    /// Maximum number of concurrent background-removal invocations
    pub invoke_workers: usize,

    /// Optional timeout for one invocation, in seconds (None = unbounded)
    pub invoke_timeout_secs: Option<u64>,

    /// User agent sent with remote fetches
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            invoke_workers: DEFAULT_INVOKE_WORKERS,
            invoke_timeout_secs: None,
            user_agent: format!("bgremove-batch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Load configuration from a JSON file and validate it
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BatchError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            BatchError::invalid_config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(BatchError::config_value_error(
                "fetch_timeout_secs",
                self.fetch_timeout_secs,
                ">= 1",
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(BatchError::config_value_error(
                "fetch_concurrency",
                self.fetch_concurrency,
                ">= 1",
            ));
        }
        if self.invoke_workers == 0 {
            return Err(BatchError::config_value_error(
                "invoke_workers",
                self.invoke_workers,
                ">= 1",
            ));
        }
        if self.invoke_timeout_secs == Some(0) {
            return Err(BatchError::config_value_error(
                "invoke_timeout_secs",
                0,
                ">= 1 or unset",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for `PipelineConfig`
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from a file)
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn fetch_concurrency(mut self, jobs: usize) -> Self {
        self.config.fetch_concurrency = jobs;
        self
    }

    #[must_use]
    pub fn invoke_workers(mut self, workers: usize) -> Self {
        self.config.invoke_workers = workers;
        self
    }

    #[must_use]
    pub fn invoke_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.invoke_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Zero worker or concurrency counts
    /// - Zero timeouts
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
