//! Core data types flowing through the batch pipeline

use crate::error::ItemError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A user-supplied pointer to an input image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    /// Raw bytes uploaded directly, with the name they were uploaded under
    Upload {
        bytes: Vec<u8>,
        original_filename: String,
    },
    /// An image to fetch over HTTP(S)
    RemoteUrl { url: String },
}

impl SourceReference {
    pub fn upload<S: Into<String>>(bytes: Vec<u8>, original_filename: S) -> Self {
        Self::Upload {
            bytes,
            original_filename: original_filename.into(),
        }
    }

    pub fn remote_url<S: Into<String>>(url: S) -> Self {
        Self::RemoteUrl { url: url.into() }
    }

    /// Lightweight description used when reporting this reference
    #[must_use]
    pub fn label(&self) -> SourceLabel {
        match self {
            Self::Upload {
                original_filename, ..
            } => SourceLabel::Upload {
                filename: original_filename.clone(),
            },
            Self::RemoteUrl { url } => SourceLabel::RemoteUrl { url: url.clone() },
        }
    }
}

/// Identifies a source reference without carrying its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceLabel {
    Upload { filename: String },
    RemoteUrl { url: String },
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload { filename } => write!(f, "upload '{}'", filename),
            Self::RemoteUrl { url } => write!(f, "url '{}'", url),
        }
    }
}

/// Image container formats accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageKind {
    Png,
    Jpeg,
    WebP,
    Bmp,
}

impl ImageKind {
    /// Detect the format from the payload's magic bytes
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Raw image payload plus its declared or inferred format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    data: Vec<u8>,
    kind: Option<ImageKind>,
}

impl ImageBytes {
    /// Wrap a payload, inferring its format from the content
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let kind = ImageKind::detect(&data);
        Self { data, kind }
    }

    /// Wrap a payload with a known format
    #[must_use]
    pub fn with_kind(data: Vec<u8>, kind: ImageKind) -> Self {
        Self {
            data,
            kind: Some(kind),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<ImageKind> {
        self.kind
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// A completed background-removal result held by the result store
///
/// Immutable once created; `data` is shared so snapshots are cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    pub filename: String,
    pub data: Arc<[u8]>,
    pub sequence_number: u64,
    pub created_at: DateTime<Utc>,
}

impl ProcessedResult {
    #[must_use]
    pub fn new(filename: String, data: Vec<u8>, sequence_number: u64) -> Self {
        Self {
            filename,
            data: Arc::from(data),
            sequence_number,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// One failed item of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    /// Zero-based position of the item in the submitted batch
    pub index: usize,
    pub source: SourceLabel,
    pub error: ItemError,
}

impl FailedItem {
    /// Human-readable reason for the failure
    #[must_use]
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// The outcome of one submitted batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: Vec<ProcessedResult>,
    pub failed: Vec<FailedItem>,
}

impl BatchOutcome {
    /// Number of items accounted for
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when at least one item was submitted and none succeeded
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}
