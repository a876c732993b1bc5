//! Progress reporting service
//!
//! Separates progress reporting from the job runner so each frontend can
//! render progress its own way (log lines, a progress bar, nothing at all).

use crate::types::SourceLabel;
use std::time::Duration;

/// Stage an individual batch item has reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStage {
    /// Reading the upload or fetching the URL
    Resolving,
    /// Waiting for or running the background-removal capability
    Removing,
    /// Result named and appended to the store
    Stored { filename: String },
    /// Item recorded as failed
    Failed { reason: String },
}

impl ItemStage {
    /// Get a human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Resolving => "Resolving source",
            Self::Removing => "Removing background",
            Self::Stored { .. } => "Stored result",
            Self::Failed { .. } => "Failed",
        }
    }

    /// Whether this stage ends the item
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stored { .. } | Self::Failed { .. })
    }
}

/// Progress update for one item
#[derive(Debug, Clone)]
pub struct ItemProgress {
    /// Zero-based position in the batch
    pub index: usize,
    /// Number of items in the batch
    pub total: usize,
    pub source: SourceLabel,
    pub stage: ItemStage,
}

/// Summary reported once a batch has finished
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Items processed per second
    #[must_use]
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        }
    }
}

/// Trait for reporting progress during batch processing
pub trait ProgressReporter: Send + Sync {
    /// Report a stage change for one item
    fn report_item(&self, update: &ItemProgress);

    /// Report that the whole batch finished
    fn report_batch_complete(&self, _summary: &BatchSummary) {}
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_item(&self, _update: &ItemProgress) {}
}

/// Console progress reporter that logs progress through the `log` facade
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to also log intermediate stages
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_item(&self, update: &ItemProgress) {
        let position = update.index + 1;
        match &update.stage {
            ItemStage::Stored { filename } => {
                log::info!(
                    "[{}/{}] ✅ {} → {}",
                    position,
                    update.total,
                    update.source,
                    filename
                );
            },
            ItemStage::Failed { reason } => {
                log::error!(
                    "[{}/{}] ❌ {}: {}",
                    position,
                    update.total,
                    update.source,
                    reason
                );
            },
            stage if self.verbose => {
                log::info!(
                    "[{}/{}] {} ({})",
                    position,
                    update.total,
                    stage.description(),
                    update.source
                );
            },
            _ => {},
        }
    }

    fn report_batch_complete(&self, summary: &BatchSummary) {
        log::info!(
            "📊 Batch complete: {} succeeded, {} failed in {:.2}s",
            summary.succeeded,
            summary.failed,
            summary.elapsed.as_secs_f64()
        );
    }
}
