//! Removal invoker: the seam between the pipeline and a background-removal capability
//!
//! Capabilities are synchronous, CPU- or accelerator-bound and possibly not
//! reentrant, so every invocation runs on tokio's blocking pool behind a
//! worker-pool semaphore. Errors, panics and timeouts of the capability all
//! surface as [`ItemError::Invoke`].

use crate::{
    error::{ItemError, Result},
    types::{ImageBytes, ImageKind},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

/// A background-removal capability: image bytes in, PNG-with-alpha bytes out
///
/// Implementations must accept PNG, JPEG, WebP and BMP input. They are shared
/// across worker threads; implementations that are not safe to call
/// concurrently must serialise internally or be run with a single worker.
pub trait RemovalCapability: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Remove the background from `input`, returning PNG bytes with alpha
    ///
    /// # Errors
    /// - Undecodable or unsupported input
    /// - Inference or encoding failures
    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Runs a capability under a bounded worker pool with an optional timeout
#[derive(Clone)]
pub struct RemovalInvoker {
    capability: Arc<dyn RemovalCapability>,
    permits: Arc<Semaphore>,
    workers: usize,
    timeout: Option<Duration>,
}

impl RemovalInvoker {
    /// Create an invoker allowing `workers` concurrent invocations
    pub fn new(capability: Arc<dyn RemovalCapability>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            capability,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            timeout: None,
        }
    }

    /// Bound each invocation by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn capability_name(&self) -> &str {
        self.capability.name()
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Invoke the capability on `input`
    ///
    /// The timeout covers both the wait for a worker slot and the capability
    /// call. The slot is held by the blocking task itself, so an invocation
    /// that outlives its timeout keeps its slot until it really finishes, and
    /// callers queued behind it time out instead of waiting.
    ///
    /// # Errors
    /// - `ItemError::EmptyInput` for a zero-length payload
    /// - `ItemError::Invoke` when the capability fails, panics or times out
    #[instrument(skip(self, input), fields(capability = %self.capability.name(), bytes = input.len()))]
    pub async fn invoke(&self, input: ImageBytes) -> std::result::Result<ImageBytes, ItemError> {
        if input.is_empty() {
            return Err(ItemError::EmptyInput);
        }

        let deadline = self.timeout.map(|limit| (limit, tokio::time::Instant::now() + limit));

        let acquire = Arc::clone(&self.permits).acquire_owned();
        let permit = match deadline {
            Some((limit, at)) => tokio::time::timeout_at(at, acquire)
                .await
                .map_err(|_| Self::timed_out(limit, "waiting for a worker"))?,
            None => acquire.await,
        }
        .map_err(|_| ItemError::invoke("worker pool closed"))?;

        let capability = Arc::clone(&self.capability);
        let data = input.into_inner();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let started = Instant::now();
            let result = capability.remove_background(&data);
            (result, started.elapsed())
        });

        let joined = match deadline {
            Some((limit, at)) => tokio::time::timeout_at(at, handle)
                .await
                .map_err(|_| Self::timed_out(limit, "running"))?,
            None => handle.await,
        };

        match joined {
            Ok((Ok(output), elapsed)) => {
                debug!(
                    duration_ms = elapsed.as_millis() as u64,
                    output_bytes = output.len(),
                    "Background removed"
                );
                Ok(ImageBytes::with_kind(output, ImageKind::Png))
            },
            Ok((Err(e), _)) => Err(ItemError::invoke(e.to_string())),
            Err(join_error) if join_error.is_panic() => {
                warn!("Background-removal capability panicked");
                Err(ItemError::invoke("capability panicked"))
            },
            Err(join_error) => Err(ItemError::invoke(join_error.to_string())),
        }
    }

    fn timed_out(limit: Duration, phase: &str) -> ItemError {
        warn!(
            timeout_ms = limit.as_millis() as u64,
            phase = phase,
            "⏱️  Background removal timed out"
        );
        ItemError::invoke(format!("timed out after {limit:?}"))
    }
}
