//! Configuration conversion utilities for CLI arguments

use crate::capabilities::{CapabilityKind, CapabilityOptions};
use crate::cli::main_impl::{CapabilityArg, Cli};
use crate::config::{PipelineConfig, PipelineConfigBuilder};
use anyhow::{Context, Result};

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the pipeline configuration
    ///
    /// Values from `--config` are loaded first, then any flag given on the
    /// command line overrides them.
    pub(crate) fn from_cli(cli: &Cli) -> Result<PipelineConfig> {
        let base = match &cli.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        let mut builder = PipelineConfigBuilder::from_config(base);
        if let Some(secs) = cli.fetch_timeout {
            builder = builder.fetch_timeout_secs(secs);
        }
        if let Some(jobs) = cli.jobs {
            builder = builder.fetch_concurrency(jobs);
        }
        if let Some(workers) = cli.workers {
            builder = builder.invoke_workers(workers);
        }
        if let Some(secs) = cli.invoke_timeout {
            builder = builder.invoke_timeout_secs(Some(secs));
        }
        if let Some(user_agent) = &cli.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        builder.build().context("Invalid configuration")
    }

    /// Capability selection and options
    pub(crate) fn capability(cli: &Cli) -> (CapabilityKind, CapabilityOptions) {
        let kind = match cli.capability {
            CapabilityArg::KeyColor => CapabilityKind::KeyColor,
            CapabilityArg::Onnx => CapabilityKind::Onnx,
        };
        let options = CapabilityOptions {
            model_path: cli.model.clone(),
            tolerance: cli.tolerance,
            feather: cli.feather,
        };
        (kind, options)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.input.is_empty() && cli.url.is_empty() && cli.urls_file.is_none() {
            anyhow::bail!("At least one input file, directory, --url or --urls-file is required");
        }

        if cli.capability == CapabilityArg::Onnx && cli.model.is_none() {
            anyhow::bail!("--capability onnx requires --model PATH");
        }
        if cli.model.is_some() && cli.capability != CapabilityArg::Onnx {
            anyhow::bail!("--model is only used with --capability onnx");
        }
        if cli.capability != CapabilityArg::KeyColor
            && (cli.tolerance.is_some() || cli.feather.is_some())
        {
            anyhow::bail!("--tolerance and --feather are only used with --capability key-color");
        }

        if let Some(output) = &cli.output {
            if output.is_file() {
                anyhow::bail!(
                    "Output path exists and is a file, not a directory: {}",
                    output.display()
                );
            }
        }

        Ok(())
    }
}
