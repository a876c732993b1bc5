//! Tracing configuration for structured logging
//!
//! The library only emits events; the CLI installs the subscriber. Records
//! emitted through the `log` facade are bridged into the same subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors and emojis (default for CLI)
    Console,
    /// Compact console output without colors for CI environments
    Compact,
    /// JSON structured logging
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
    /// Session ID for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Set session ID for correlation
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Install the global subscriber
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = match &self.env_filter {
            Some(env_filter) => EnvFilter::try_new(env_filter)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };
        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(fmt_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "🚀 Batch session started");
        }

        Ok(())
    }
}

/// Initialize tracing for the CLI with a fresh session ID
///
/// A non-empty `RUST_LOG` takes precedence over the verbosity flag. Returns
/// the session ID so callers can attach it to their own spans.
pub fn init_cli_tracing(verbosity: u8, format: TracingFormat) -> anyhow::Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    cli_tracing_config(verbosity, format, rust_log)
        .with_session_id(session_id.clone())
        .init()?;

    Ok(session_id)
}

fn cli_tracing_config(
    verbosity: u8,
    format: TracingFormat,
    rust_log: Option<String>,
) -> TracingConfig {
    let config = TracingConfig::new().with_verbosity(verbosity).with_format(format);
    match rust_log.filter(|filter| !filter.trim().is_empty()) {
        Some(filter) => config.with_env_filter(filter),
        None => config,
    }
}

/// Span creation helpers
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering a whole CLI session
    pub fn session(session_id: &str, capability: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            capability = %capability
        )
    }

    /// Span covering one submitted batch
    pub fn batch(batch_number: usize, items: usize) -> Span {
        tracing::span!(
            Level::INFO,
            "batch",
            batch_number = %batch_number,
            items = %items
        )
    }

    /// Span covering archive packaging
    pub fn packaging(entries: usize) -> Span {
        tracing::span!(Level::DEBUG, "packaging", entries = %entries)
    }
}
