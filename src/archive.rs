//! Zip packaging of stored results

use crate::{error::Result, types::ProcessedResult};
use std::io::{Cursor, Write};
use tracing::{debug, info, instrument};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Prefix of generated archive names
pub const ARCHIVE_PREFIX: &str = "background_removed_images_";

/// Package `results` into an in-memory zip archive
///
/// Each result becomes one deflate-compressed entry named by its filename,
/// in the order given. Returns `None` for an empty slice so callers can tell
/// "nothing to package" apart from an empty archive.
///
/// # Errors
/// - Zip encoding failures
#[instrument(skip_all, fields(entries = results.len()))]
pub fn build_archive(results: &[ProcessedResult]) -> Result<Option<Vec<u8>>> {
    if results.is_empty() {
        debug!("No results to archive");
        return Ok(None);
    }

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for result in results {
        writer.start_file(result.filename.as_str(), options)?;
        writer.write_all(&result.data)?;
    }

    let bytes = writer.finish()?.into_inner();
    info!(
        entries = results.len(),
        archive_bytes = bytes.len(),
        "📦 Archive built"
    );
    Ok(Some(bytes))
}

/// Archive name for a Unix timestamp in seconds
#[must_use]
pub fn default_archive_name(timestamp: i64) -> String {
    format!("{}{}.zip", ARCHIVE_PREFIX, timestamp)
}

/// Archive name for the current time
#[must_use]
pub fn archive_name_now() -> String {
    default_archive_name(chrono::Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (entry.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn test_empty_results_yield_none() {
        assert!(build_archive(&[]).unwrap().is_none());
    }

    #[test]
    fn test_archive_preserves_names_order_and_bytes() {
        let results = vec![
            ProcessedResult::new("catno_bg1.png".to_string(), vec![1, 2, 3], 1),
            ProcessedResult::new("dogno_bg2.png".to_string(), vec![0; 4096], 2),
            ProcessedResult::new("image_3no_bg3.png".to_string(), Vec::new(), 3),
        ];

        let bytes = build_archive(&results).unwrap().unwrap();
        let entries = read_entries(bytes);

        assert_eq!(entries.len(), 3);
        for (entry, result) in entries.iter().zip(&results) {
            assert_eq!(entry.0, result.filename);
            assert_eq!(entry.1.as_slice(), &*result.data);
        }
    }

    #[test]
    fn test_entries_are_deflated() {
        let results = vec![ProcessedResult::new("ano_bg1.png".to_string(), vec![7; 10_000], 1)];
        let bytes = build_archive(&results).unwrap().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let entry = archive.by_index(0).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        assert!(entry.compressed_size() < entry.size());
    }

    #[test]
    fn test_archive_names() {
        assert_eq!(
            default_archive_name(1_700_000_000),
            "background_removed_images_1700000000.zip"
        );
        let now = archive_name_now();
        assert!(now.starts_with(ARCHIVE_PREFIX));
        assert!(now.ends_with(".zip"));
    }
}
