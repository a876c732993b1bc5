//! Batch background removal CLI
//!
//! Uploaded files form the first batch and URLs the second, both processed in
//! one session so output names keep counting across them.

use super::config::CliConfigBuilder;
use super::progress::IndicatifProgressReporter;
use crate::{
    archive::{archive_name_now, build_archive},
    capabilities::create_capability,
    progress::{ConsoleProgressReporter, ProgressReporter},
    runner::JobRunner,
    store::ResultStore,
    tracing_config::{init_cli_tracing, spans, TracingFormat},
    types::{BatchOutcome, ProcessedResult, SourceReference},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// Remove backgrounds from batches of uploaded files and remote URLs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-batch")]
pub struct Cli {
    /// Input image files or directories
    #[arg(value_name = "INPUT")]
    pub input: Vec<PathBuf>,

    /// Remote image URL (repeatable)
    #[arg(long, value_name = "URL")]
    pub url: Vec<String>,

    /// File with one image URL per line (blank lines are skipped)
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// Directory to write individual results into
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Bundle all results into a zip archive [default name: background_removed_images_<unix_ts>.zip]
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub zip: Option<Option<PathBuf>>,

    /// Background-removal capability
    #[arg(long, value_enum, default_value_t = CapabilityArg::KeyColor)]
    pub capability: CapabilityArg,

    /// ONNX model file (required with --capability onnx)
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Colour distance keyed out as background (key-color only)
    #[arg(long)]
    pub tolerance: Option<f32>,

    /// Width of the soft edge ramp (key-color only)
    #[arg(long)]
    pub feather: Option<f32>,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Pattern for files found in directories (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-URL fetch timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// Number of items processed concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Number of concurrent background-removal invocations
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-image background-removal timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub invoke_timeout: Option<u64>,

    /// User agent for remote fetches
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log progress lines instead of drawing a progress bar
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Log output format (json needs the tracing-json feature)
    #[arg(long, value_enum, default_value_t = LogFormatArg::Console)]
    pub log_format: LogFormatArg,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum LogFormatArg {
    Console,
    Compact,
    Json,
}

impl LogFormatArg {
    pub(crate) fn tracing_format(self) -> TracingFormat {
        match self {
            Self::Console => TracingFormat::Console,
            Self::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            Self::Json => TracingFormat::Json,
            #[cfg(not(feature = "tracing-json"))]
            Self::Json => {
                eprintln!("JSON logging not compiled in; rebuild with --features tracing-json");
                TracingFormat::Console
            },
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CapabilityArg {
    KeyColor,
    Onnx,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose, cli.log_format.tracing_format())
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli)?;

    let (kind, options) = CliConfigBuilder::capability(&cli);
    let capability =
        create_capability(kind, &options).context("Failed to create background-removal capability")?;

    let progress: Arc<dyn ProgressReporter> = if cli.no_progress_bar {
        Arc::new(ConsoleProgressReporter::new(cli.verbose > 0))
    } else {
        Arc::new(IndicatifProgressReporter::new())
    };
    let runner = JobRunner::from_config(&config, Arc::clone(&capability))?.with_progress(progress);

    let span = spans::session(&session_id, capability.name());
    run_session(&cli, &runner).instrument(span).await
}

async fn run_session(cli: &Cli, runner: &JobRunner) -> Result<()> {
    let started = Instant::now();
    let uploads = collect_uploads(&cli.input, cli.recursive, cli.pattern.as_deref()).await?;
    let urls = collect_urls(&cli.url, cli.urls_file.as_deref()).await?;

    let batches: Vec<Vec<SourceReference>> =
        [uploads, urls].into_iter().filter(|b| !b.is_empty()).collect();
    if batches.is_empty() {
        warn!("No supported inputs found");
        anyhow::bail!("Nothing to process");
    }

    let store = ResultStore::new();
    let mut combined = BatchOutcome::default();

    for (number, batch) in batches.into_iter().enumerate() {
        let batch_span = spans::batch(number + 1, batch.len());
        info!("Processing batch {} with {} item(s)", number + 1, batch.len());

        let outcome = runner.run_batch(&store, batch).instrument(batch_span).await;
        for failure in &outcome.failed {
            eprintln!("❌ {}: {}", failure.source, failure.reason());
        }
        combined.succeeded.extend(outcome.succeeded);
        combined.failed.extend(outcome.failed);
    }

    let results = store.list();
    deliver(cli, &results).await?;

    println!(
        "✅ {} image(s) processed, {} failed in {:.2}s",
        combined.succeeded.len(),
        combined.failed.len(),
        started.elapsed().as_secs_f64()
    );

    if combined.all_failed() {
        anyhow::bail!("All {} item(s) failed", combined.total());
    }
    Ok(())
}

/// Write results individually and/or as an archive
///
/// With neither `-o` nor `--zip` the results go to the current directory.
async fn deliver(cli: &Cli, results: &[ProcessedResult]) -> Result<()> {
    let output_dir = match (&cli.output, &cli.zip) {
        (Some(dir), _) => Some(dir.clone()),
        (None, None) => Some(PathBuf::from(".")),
        (None, Some(_)) => None,
    };

    if let Some(dir) = output_dir {
        write_results(&dir, results).await?;
    }

    if let Some(zip_target) = &cli.zip {
        let archive = spans::packaging(results.len()).in_scope(|| build_archive(results))?;
        match archive {
            Some(bytes) => {
                let path = zip_target.clone().unwrap_or_else(|| {
                    cli.output
                        .clone()
                        .unwrap_or_else(|| PathBuf::from("."))
                        .join(archive_name_now())
                });
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("Failed to write archive {}", path.display()))?;
                println!("📦 Archive written to {}", path.display());
            },
            None => {
                println!("No processed images to download. Please process some images first.");
            },
        }
    }

    Ok(())
}

async fn write_results(dir: &Path, results: &[ProcessedResult]) -> Result<()> {
    if results.is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    for result in results {
        let path = dir.join(&result.filename);
        tokio::fs::write(&path, &result.data[..])
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    info!("Wrote {} result(s) to {}", results.len(), dir.display());
    Ok(())
}

/// Read every input file, expanding directories
///
/// Files are processed in sorted path order.
async fn collect_uploads(
    inputs: &[PathBuf],
    recursive: bool,
    pattern: Option<&str>,
) -> Result<Vec<SourceReference>> {
    let mut all_files = Vec::new();

    for path in inputs {
        if path.is_file() {
            if is_image_file(path) {
                all_files.push(path.clone());
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(path, recursive, pattern)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    all_files.sort();

    let mut uploads = Vec::with_capacity(all_files.len());
    for path in all_files {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        uploads.push(SourceReference::upload(bytes, filename));
    }
    Ok(uploads)
}

/// Gather URLs from flags and the optional list file
async fn collect_urls(urls: &[String], urls_file: Option<&Path>) -> Result<Vec<SourceReference>> {
    let mut all = urls.to_vec();
    if let Some(path) = urls_file {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read URL list {}", path.display()))?;
        all.extend(parse_url_list(&contents));
    }
    Ok(all.into_iter().map(SourceReference::remote_url).collect())
}

/// One URL per line; surrounding whitespace is trimmed and blank lines skipped
fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find all image files in a directory
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if is_image_file(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if is_image_file(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    Ok(files)
}

/// Check if file is an image based on extension
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Check if file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}
