//! Session result store
//!
//! Owns the per-session state: the ordered list of processed results and the
//! next sequence number used to name them. Filenames stay unique for the life
//! of the session because the sequence number only ever increases until an
//! explicit [`ResultStore::clear`].

use crate::types::ProcessedResult;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Marker inserted between the input stem and the sequence number
pub const OUTPUT_MARKER: &str = "no_bg";

/// Extension of every stored result
pub const OUTPUT_EXTENSION: &str = "png";

/// Build the output filename for `input_filename` with `sequence`
///
/// The input's extension is stripped from its base name, then the marker,
/// the sequence number and `.png` are appended: `cat.png` → `catno_bg1.png`.
#[must_use]
pub fn output_filename(input_filename: &str, sequence: u64) -> String {
    let stem = Path::new(input_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}{}{}.{}", stem, OUTPUT_MARKER, sequence, OUTPUT_EXTENSION)
}

#[derive(Debug)]
struct SessionState {
    results: Vec<ProcessedResult>,
    next_sequence: u64,
}

impl SessionState {
    fn fresh() -> Self {
        Self {
            results: Vec::new(),
            next_sequence: 1,
        }
    }
}

/// Ordered, append-only (until cleared) collection of results for one session
///
/// All mutation goes through a single lock, so concurrent jobs are serialised
/// at the point where they name and append their result.
#[derive(Debug)]
pub struct ResultStore {
    state: Mutex<SessionState>,
}

impl ResultStore {
    /// Create an empty store whose first result will get sequence number 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::fresh()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name a freshly processed image and append it in one step
    ///
    /// Takes the current sequence number, derives the filename from
    /// `input_filename`, increments the counter and appends the result.
    pub fn record(&self, input_filename: &str, data: Vec<u8>) -> ProcessedResult {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence = sequence.saturating_add(1);

        let result = ProcessedResult::new(output_filename(input_filename, sequence), data, sequence);
        state.results.push(result.clone());

        debug!(
            filename = %result.filename,
            sequence = sequence,
            bytes = result.size_bytes(),
            "💾 Result stored"
        );
        result
    }

    /// Append an already-formed result to the end of the store
    ///
    /// The counter is moved past `result.sequence_number` if needed so later
    /// names never reuse it.
    pub fn append(&self, result: ProcessedResult) {
        let mut state = self.lock();
        state.next_sequence = state.next_sequence.max(result.sequence_number.saturating_add(1));
        state.results.push(result);
    }

    /// Snapshot of all results in insertion order
    #[must_use]
    pub fn list(&self) -> Vec<ProcessedResult> {
        self.lock().results.clone()
    }

    /// Look up a single result by its filename
    #[must_use]
    pub fn get(&self, filename: &str) -> Option<ProcessedResult> {
        self.lock()
            .results
            .iter()
            .find(|r| r.filename == filename)
            .cloned()
    }

    /// Empty the store and reset the sequence counter to 1
    pub fn clear(&self) {
        let mut state = self.lock();
        let removed = state.results.len();
        *state = SessionState::fresh();
        info!(removed = removed, "🧹 Result store cleared");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().results.is_empty()
    }

    /// Sequence number the next recorded result will get
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.lock().next_sequence
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}
