//! Test utilities: mock capabilities and fetchers
//!
//! These let the invoker, resolver and runner be tested without a model file
//! or network access.

use crate::{
    error::{BatchError, ItemError, Result},
    invoker::RemovalCapability,
    source::ImageFetcher,
};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Mock capability that prefixes its input instead of running a model
#[derive(Debug, Default)]
pub struct MockRemover {
    fail_on: Option<Vec<u8>>,
    should_panic: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    call_history: Mutex<Vec<Vec<u8>>>,
}

impl MockRemover {
    pub const OUTPUT_PREFIX: &'static [u8] = b"PNG:";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail whenever the input equals `payload`
    #[must_use]
    pub fn failing_on(payload: Vec<u8>) -> Self {
        Self {
            fail_on: Some(payload),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn panicking() -> Self {
        Self {
            should_panic: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// What the mock returns for `input`
    #[must_use]
    pub fn expected_output(input: &[u8]) -> Vec<u8> {
        let mut output = Self::OUTPUT_PREFIX.to_vec();
        output.extend_from_slice(input);
        output
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn call_history(&self) -> Vec<Vec<u8>> {
        self.call_history.lock().unwrap().clone()
    }
}

impl RemovalCapability for MockRemover {
    fn name(&self) -> &str {
        "mock"
    }

    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.call_history.lock().unwrap().push(input.to_vec());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.should_panic {
            panic!("mock capability panic");
        }
        if self.fail_on.as_deref() == Some(input) {
            return Err(BatchError::capability("mock failure"));
        }
        Ok(Self::expected_output(input))
    }
}

/// Mock fetcher serving canned bodies keyed by URL; unknown URLs are 404s
#[derive(Debug, Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    #[must_use]
    pub fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Vec<u8>, ItemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ItemError::fetch("HTTP status 404 Not Found"))
    }
}
