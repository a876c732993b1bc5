//! Job runner: drives a batch of source references through resolve → remove → store
//!
//! Jobs run concurrently up to `fetch_concurrency`, with capability calls
//! further limited by the invoker's worker pool, but finished jobs are
//! committed strictly in submission order. Sequence numbers, the `succeeded`
//! and `failed` lists, and the store order therefore match a one-at-a-time
//! run exactly.

use crate::{
    config::PipelineConfig,
    error::{ItemError, Result},
    invoker::{RemovalCapability, RemovalInvoker},
    progress::{BatchSummary, ItemProgress, ItemStage, NoOpProgressReporter, ProgressReporter},
    source::{ResolvedImage, SourceResolver},
    store::ResultStore,
    types::{BatchOutcome, FailedItem, ImageBytes, SourceLabel, SourceReference},
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// What one job produced before it is committed
struct JobOutput {
    index: usize,
    source: SourceLabel,
    result: std::result::Result<(String, ImageBytes), ItemError>,
}

/// Orchestrates batches end to end
#[derive(Clone)]
pub struct JobRunner {
    resolver: SourceResolver,
    invoker: RemovalInvoker,
    concurrency: usize,
    progress: Arc<dyn ProgressReporter>,
}

impl JobRunner {
    /// Create a runner from explicit parts
    pub fn new(resolver: SourceResolver, invoker: RemovalInvoker, concurrency: usize) -> Self {
        Self {
            resolver,
            invoker,
            concurrency: concurrency.max(1),
            progress: Arc::new(NoOpProgressReporter),
        }
    }

    /// Create a runner that fetches over HTTP and invokes `capability`
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP client
    pub fn from_config(
        config: &PipelineConfig,
        capability: Arc<dyn RemovalCapability>,
    ) -> Result<Self> {
        config.validate()?;
        let resolver = SourceResolver::http(config)?;
        let invoker = RemovalInvoker::new(capability, config.invoke_workers)
            .with_timeout(config.invoke_timeout());
        Ok(Self::new(resolver, invoker, config.fetch_concurrency))
    }

    /// Attach a progress reporter
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Run a batch to completion, appending every success to `store`
    ///
    /// Never fails as a whole: each item ends up in exactly one of
    /// `succeeded` or `failed`.
    pub async fn run_batch(&self, store: &ResultStore, refs: Vec<SourceReference>) -> BatchOutcome {
        self.run_batch_with_cancellation(store, refs, &CancellationToken::new())
            .await
    }

    /// Run a batch that can be abandoned through `cancel`
    ///
    /// Items that have not started resolving or removing when cancellation is
    /// observed fail with `ItemError::Cancelled`. Results already stored stay
    /// in the store.
    #[instrument(skip_all, fields(items = refs.len(), capability = %self.invoker.capability_name()))]
    pub async fn run_batch_with_cancellation(
        &self,
        store: &ResultStore,
        refs: Vec<SourceReference>,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let total = refs.len();
        let started = Instant::now();
        info!(items = total, concurrency = self.concurrency, "🚀 Starting batch");

        let mut outcome = BatchOutcome::default();
        let mut jobs = stream::iter(refs.into_iter().enumerate())
            .map(|(index, reference)| self.run_job(index, total, reference, cancel))
            .buffered(self.concurrency);

        while let Some(job) = jobs.next().await {
            self.commit(store, job, total, &mut outcome);
        }

        let summary = BatchSummary {
            total,
            succeeded: outcome.succeeded.len(),
            failed: outcome.failed.len(),
            elapsed: started.elapsed(),
        };
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            duration_ms = summary.elapsed.as_millis() as u64,
            "📊 Batch finished"
        );
        self.progress.report_batch_complete(&summary);

        outcome
    }

    async fn run_job(
        &self,
        index: usize,
        total: usize,
        reference: SourceReference,
        cancel: &CancellationToken,
    ) -> JobOutput {
        let source = reference.label();
        let result = self
            .process(index, total, &source, reference, cancel)
            .await;
        JobOutput {
            index,
            source,
            result,
        }
    }

    async fn process(
        &self,
        index: usize,
        total: usize,
        source: &SourceLabel,
        reference: SourceReference,
        cancel: &CancellationToken,
    ) -> std::result::Result<(String, ImageBytes), ItemError> {
        if cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }
        self.report(index, total, source, ItemStage::Resolving);
        let ResolvedImage { bytes, filename } = self.resolver.resolve(reference, index + 1).await?;

        if cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }
        self.report(index, total, source, ItemStage::Removing);
        let output = self.invoker.invoke(bytes).await?;

        Ok((filename, output))
    }

    fn commit(&self, store: &ResultStore, job: JobOutput, total: usize, outcome: &mut BatchOutcome) {
        match job.result {
            Ok((input_filename, output)) => {
                let stored = store.record(&input_filename, output.into_inner());
                info!(
                    index = job.index,
                    source = %job.source,
                    filename = %stored.filename,
                    "✅ Background removed"
                );
                self.report(
                    job.index,
                    total,
                    &job.source,
                    ItemStage::Stored {
                        filename: stored.filename.clone(),
                    },
                );
                outcome.succeeded.push(stored);
            },
            Err(error) => {
                warn!(
                    index = job.index,
                    source = %job.source,
                    kind = error.kind(),
                    reason = %error,
                    "❌ Item failed"
                );
                self.report(
                    job.index,
                    total,
                    &job.source,
                    ItemStage::Failed {
                        reason: error.to_string(),
                    },
                );
                outcome.failed.push(FailedItem {
                    index: job.index,
                    source: job.source,
                    error,
                });
            },
        }
    }

    fn report(&self, index: usize, total: usize, source: &SourceLabel, stage: ItemStage) {
        self.progress.report_item(&ItemProgress {
            index,
            total,
            source: source.clone(),
            stage,
        });
    }
}
