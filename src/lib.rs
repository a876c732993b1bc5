#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Batch Background Removal
//!
//! A library for removing image backgrounds in batches. Images arrive either
//! as uploaded bytes or as remote URLs, are run through a pluggable
//! background-removal capability, and the results accumulate in a
//! per-session store from which they can be downloaded individually or
//! bundled as a zip archive.
//!
//! ## Features
//!
//! - **Source-agnostic ingestion**: uploads and URLs flow through the same pipeline
//! - **Per-item failure isolation**: one bad item never aborts its batch
//! - **Stable naming**: `<stem>no_bg<n>.png`, with `n` counting across batches
//! - **Bounded concurrency**: parallel fetching with a separate worker pool for the capability
//! - **Capabilities**: border key-colour removal built in, ONNX segmentation with the `onnx` feature
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_batch::{
//!     build_archive, JobRunner, KeyColorRemover, PipelineConfig, ResultStore, SourceReference,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PipelineConfig::default();
//! let runner = JobRunner::from_config(&config, Arc::new(KeyColorRemover::new()))?;
//! let store = ResultStore::new();
//!
//! let outcome = runner
//!     .run_batch(
//!         &store,
//!         vec![
//!             SourceReference::upload(std::fs::read("cat.png")?, "cat.png"),
//!             SourceReference::remote_url("https://example.com/dog.jpg"),
//!         ],
//!     )
//!     .await;
//!
//! for failure in &outcome.failed {
//!     eprintln!("{}: {}", failure.source, failure.reason());
//! }
//! if let Some(zip) = build_archive(&store.list())? {
//!     std::fs::write("results.zip", zip)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and progress bar
//! - `webp-support` (default): WebP input decoding
//! - `onnx`: ONNX Runtime segmentation capability
//! - `tracing-json`: JSON log output for the CLI

pub mod archive;
pub mod capabilities;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod invoker;
pub mod progress;
pub mod runner;
pub mod source;
pub mod store;
#[cfg(test)]
pub(crate) mod test_utils;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Public API exports
pub use archive::{archive_name_now, build_archive, default_archive_name};
pub use capabilities::{create_capability, CapabilityKind, CapabilityOptions, KeyColorRemover};
#[cfg(feature = "onnx")]
pub use capabilities::{OnnxConfig, OnnxRemover};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{BatchError, ItemError, Result};
pub use invoker::{RemovalCapability, RemovalInvoker};
pub use progress::{
    BatchSummary, ConsoleProgressReporter, ItemProgress, ItemStage, NoOpProgressReporter,
    ProgressReporter,
};
pub use runner::JobRunner;
pub use source::{HttpFetcher, ImageFetcher, ResolvedImage, SourceResolver};
pub use store::{output_filename, ResultStore};
pub use types::{
    BatchOutcome, FailedItem, ImageBytes, ImageKind, ProcessedResult, SourceLabel,
    SourceReference,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
