//! Error types for the batch pipeline
//!
//! Two layers: [`BatchError`] for failures of the pipeline machinery itself
//! (configuration, capability setup, archive writing), and [`ItemError`] for
//! the per-item outcomes that end up in a batch's `failed` list. An
//! `ItemError` never aborts a batch.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Errors raised by the pipeline machinery
#[derive(Error, Debug)]
pub enum BatchError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Archive container errors
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client construction or transport setup errors
    #[error("Network error: {0}")]
    Network(String),

    /// Background-removal capability setup or execution errors
    #[error("Capability error: {0}")]
    Capability(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new capability error
    pub fn capability<S: Into<String>>(msg: S) -> Self {
        Self::Capability(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a network error with the originating cause
    pub fn network_error<S: AsRef<str>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.as_ref(), error))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!(
                "Failed to {} '{}': {}",
                operation,
                path.as_ref().display(),
                error
            ),
        ))
    }
}

/// Why a single item of a batch failed
///
/// Carries only strings so outcomes can be cloned and handed to whatever
/// renders them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// The reference was malformed and never attempted
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network, transport or non-success status during remote retrieval
    #[error("Fetch failed: {cause}")]
    Fetch { cause: String },

    /// The background-removal capability failed, panicked or timed out
    #[error("Background removal failed: {cause}")]
    Invoke { cause: String },

    /// A zero-length payload reached the pipeline
    #[error("Empty input: no image bytes")]
    EmptyInput,

    /// Abandoned before completion because the batch was cancelled
    #[error("Cancelled before processing")]
    Cancelled,
}

impl ItemError {
    pub fn invalid_url<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn fetch<S: Into<String>>(cause: S) -> Self {
        Self::Fetch {
            cause: cause.into(),
        }
    }

    pub fn invoke<S: Into<String>>(cause: S) -> Self {
        Self::Invoke {
            cause: cause.into(),
        }
    }

    /// Short machine-friendly name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "InvalidURL",
            Self::Fetch { .. } => "FetchError",
            Self::Invoke { .. } => "InvokeError",
            Self::EmptyInput => "EmptyInput",
            Self::Cancelled => "Cancelled",
        }
    }
}
