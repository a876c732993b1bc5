//! Progress bar reporter for the CLI

use crate::progress::{BatchSummary, ItemProgress, ItemStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Renders per-batch progress with an `indicatif` bar
///
/// A bar is created on the first update of a batch and finished when the
/// batch summary arrives, so each batch gets its own bar.
pub(crate) struct IndicatifProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgressReporter {
    pub(crate) fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn new_bar(total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn report_item(&self, update: &ItemProgress) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let bar = guard.get_or_insert_with(|| Self::new_bar(update.total));

        match &update.stage {
            ItemStage::Resolving | ItemStage::Removing => {
                bar.set_message(format!("{} {}", update.stage.description(), update.source));
            },
            ItemStage::Stored { filename } => {
                bar.set_message(filename.clone());
                bar.inc(1);
            },
            ItemStage::Failed { .. } => {
                bar.set_message(format!("failed {}", update.source));
                bar.inc(1);
            },
        }
    }

    fn report_batch_complete(&self, summary: &BatchSummary) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        if let Some(bar) = guard.take() {
            bar.finish_with_message(format!(
                "{} succeeded, {} failed",
                summary.succeeded, summary.failed
            ));
        }
    }
}
