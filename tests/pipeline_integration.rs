//! End-to-end pipeline tests with the real HTTP fetcher and key-colour capability

mod common;

use bgremove_batch::{
    build_archive, BatchError, ItemError, JobRunner, KeyColorRemover, PipelineConfig,
    RemovalCapability, ResultStore, SourceLabel, SourceReference,
};
use common::{assert_png_with_alpha, png_fixture, square_on_white, TestServer};
use image::ImageFormat;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

fn runner(config: &PipelineConfig) -> JobRunner {
    JobRunner::from_config(config, Arc::new(KeyColorRemover::new())).unwrap()
}

#[tokio::test]
async fn test_mixed_batch_isolates_failures() {
    let server = TestServer::builder()
        .route("/photos/sky.jpg", 200, square_on_white(24, [20, 60, 200], ImageFormat::Jpeg))
        .route("/empty.png", 200, Vec::new())
        .start()
        .await;

    let runner = runner(&PipelineConfig::default());
    let store = ResultStore::new();

    let outcome = runner
        .run_batch(
            &store,
            vec![
                SourceReference::upload(png_fixture(), "cat.png"),
                SourceReference::upload(Vec::new(), "dog.png"),
                SourceReference::remote_url(server.url("/photos/sky.jpg")),
                SourceReference::remote_url(server.url("/missing.png")),
                SourceReference::remote_url("not a url"),
                SourceReference::remote_url(server.url("/empty.png")),
                SourceReference::upload(b"corrupt".to_vec(), "broken.png"),
            ],
        )
        .await;

    assert_eq!(outcome.total(), 7);
    let names: Vec<_> = outcome.succeeded.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["catno_bg1.png", "skyno_bg2.png"]);

    let failures: Vec<_> = outcome
        .failed
        .iter()
        .map(|f| (f.index, f.error.kind()))
        .collect();
    assert_eq!(
        failures,
        vec![
            (1, "EmptyInput"),
            (3, "FetchError"),
            (4, "InvalidURL"),
            (5, "EmptyInput"),
            (6, "InvokeError"),
        ]
    );

    let missing = &outcome.failed[1];
    assert_eq!(
        missing.source,
        SourceLabel::RemoteUrl {
            url: server.url("/missing.png")
        }
    );
    assert!(missing.reason().contains("404"));

    for result in store.list() {
        let decoded = assert_png_with_alpha(&result.data);
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    }
}

#[tokio::test]
async fn test_sequence_spans_batches_and_sources() {
    let server = TestServer::builder()
        .route("/a.png", 200, png_fixture())
        .route("/", 200, png_fixture())
        .start()
        .await;

    let runner = runner(&PipelineConfig::default());
    let store = ResultStore::new();

    let uploads = runner
        .run_batch(&store, vec![SourceReference::upload(png_fixture(), "a.png")])
        .await;
    let urls = runner
        .run_batch(
            &store,
            vec![
                SourceReference::remote_url(server.url("/a.png")),
                SourceReference::remote_url(server.url("/")),
            ],
        )
        .await;

    assert_eq!(uploads.succeeded[0].filename, "ano_bg1.png");
    let url_names: Vec<_> = urls.succeeded.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(url_names, vec!["ano_bg2.png", "image_2no_bg3.png"]);
    assert_eq!(store.len(), 3);

    store.clear();
    let again = runner
        .run_batch(&store, vec![SourceReference::upload(png_fixture(), "a.png")])
        .await;
    assert_eq!(again.succeeded[0].filename, "ano_bg1.png");
}

#[tokio::test]
async fn test_fetch_timeout_fails_only_that_item() {
    let server = TestServer::builder()
        .slow_route("/slow.png", Duration::from_secs(5), png_fixture())
        .route("/fast.png", 200, png_fixture())
        .start()
        .await;

    let config = PipelineConfig::builder()
        .fetch_timeout_secs(1)
        .fetch_concurrency(2)
        .build()
        .unwrap();
    let runner = runner(&config);
    let store = ResultStore::new();

    let outcome = runner
        .run_batch(
            &store,
            vec![
                SourceReference::remote_url(server.url("/slow.png")),
                SourceReference::remote_url(server.url("/fast.png")),
            ],
        )
        .await;

    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.succeeded[0].filename, "fastno_bg1.png");
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].index, 0);
    assert!(matches!(
        &outcome.failed[0].error,
        ItemError::Fetch { cause } if cause.contains("timed out")
    ));
}

#[tokio::test]
async fn test_archive_of_session_results() {
    let runner = runner(&PipelineConfig::default());
    let store = ResultStore::new();

    runner
        .run_batch(
            &store,
            vec![
                SourceReference::upload(png_fixture(), "one.png"),
                SourceReference::upload(
                    square_on_white(16, [0, 0, 0], ImageFormat::Bmp),
                    "two.bmp",
                ),
            ],
        )
        .await;

    let results = store.list();
    let bytes = build_archive(&results).unwrap().unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);

    for (i, result) in results.iter().enumerate() {
        let mut entry = archive.by_index(i).unwrap();
        assert_eq!(entry.name(), result.filename);
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        assert_eq!(data.as_slice(), &*result.data);
    }

    store.clear();
    assert!(build_archive(&store.list()).unwrap().is_none());
}

/// Capability that rejects everything, used to check embedder-provided capabilities
struct RejectingCapability;

impl RemovalCapability for RejectingCapability {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn remove_background(&self, _input: &[u8]) -> bgremove_batch::Result<Vec<u8>> {
        Err(BatchError::capability("model unavailable"))
    }
}

#[tokio::test]
async fn test_custom_capability_failures_are_reported() {
    let runner = JobRunner::from_config(&PipelineConfig::default(), Arc::new(RejectingCapability))
        .unwrap();
    let store = ResultStore::new();

    let outcome = runner
        .run_batch(&store, vec![SourceReference::upload(png_fixture(), "a.png")])
        .await;

    assert!(outcome.all_failed());
    assert!(store.is_empty());
    assert_eq!(
        outcome.failed[0].error,
        ItemError::Invoke {
            cause: "Capability error: model unavailable".to_string()
        }
    );
}
