use super::*;
use crate::config::FileCollisionAction;
use crate::metadata::{IllustDetail, NoEmbeddedData, UgoiraMeta, UrlSet};
use crate::prompt::{AcceptAll, FixedSelection};
use crate::sink::{CommitRequest, FsDownloadSink, SinkError};
use crate::types::AssetVariant;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> Config {
    let mut config = Config::default();
    config.retry.delay_step = Duration::from_millis(1);
    config
}

fn orchestrator(config: Config, sink: Arc<dyn DownloadSink>) -> DownloadOrchestrator {
    DownloadOrchestrator::new(reqwest::Client::new(), sink, Arc::new(config))
}

fn metadata(assets: Vec<ImageAsset>) -> IllustrationMetadata {
    IllustrationMetadata {
        id: "100".to_string(),
        title: "Title".to_string(),
        author: "Artist".to_string(),
        assets,
    }
}

async fn mount_image(server: &MockServer, route: &str, body: &'static [u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "image/png"))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, route: &str, status: u16, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Sink recording every request; rejects the first `reject_paths` paths as too long
#[derive(Default)]
struct RecordingSink {
    reject_paths: usize,
    fail_other: bool,
    calls: AtomicUsize,
    committed: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl DownloadSink for RecordingSink {
    async fn commit(&self, request: CommitRequest) -> std::result::Result<PathBuf, SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_other {
            return Err(SinkError::Other("permission denied".to_string()));
        }
        if call < self.reject_paths {
            return Err(SinkError::Other("File name too long".to_string()));
        }
        self.committed.lock().unwrap().push(request.path.clone());
        Ok(request.path)
    }
}

#[tokio::test]
async fn failed_asset_does_not_abort_batch() {
    let server = MockServer::start().await;
    mount_image(&server, "/img/100_p0.png", b"page-0").await;
    mount_status(&server, "/img/100_p1.png", 404, 4).await;
    mount_status(&server, "/img/100_p1_alt.jpg", 500, 4).await;
    mount_image(&server, "/img/100_p2.png", b"page-2").await;

    let dir = tempdir().unwrap();
    let sink = Arc::new(FsDownloadSink::new(dir.path()));
    let downloader = orchestrator(fast_config(), sink);
    let mut rx = downloader.subscribe();

    let assets = vec![
        ImageAsset::new(format!("{}/img/100_p0.png", server.uri()), 0, AssetVariant::Page),
        ImageAsset::new(format!("{}/img/100_p1.png", server.uri()), 1, AssetVariant::Page)
            .with_fallbacks([format!("{}/img/100_p1_alt.jpg", server.uri())]),
        ImageAsset::new(format!("{}/img/100_p2.png", server.uri()), 2, AssetVariant::Page),
    ];
    let meta = metadata(assets.clone());

    let outcomes = downloader.download_batch(&meta, &assets).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].success);
    assert!(!outcomes[1].success);
    assert!(outcomes[2].success);
    assert!(
        outcomes[1].error.as_deref().unwrap().contains("HTTP 500"),
        "last error is reported: {:?}",
        outcomes[1].error
    );
    assert_eq!(
        BatchSummary::from_outcomes(&outcomes),
        BatchSummary::Partial {
            succeeded: 2,
            total: 3
        }
    );

    let saved = dir.path().join("illust-dl/Artist/100_Title/002.png");
    assert_eq!(std::fs::read(saved).unwrap(), b"page-2");

    let events = drain(&mut rx);
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { completed, total } => Some((*completed, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);

    let attempts = events
        .iter()
        .filter(|e| matches!(e, Event::AttemptFailed { .. }))
        .count();
    assert_eq!(attempts, 8, "four tries on each of two candidates");

    assert!(matches!(
        events.last(),
        Some(Event::BatchFinished {
            summary: BatchSummary::Partial { .. }
        })
    ));
}

#[tokio::test]
async fn fallback_candidate_is_used_after_primary_exhausts() {
    let server = MockServer::start().await;
    mount_status(&server, "/img-original/100_p0.png", 404, 4).await;
    mount_image(&server, "/img-master/100_p0_master1200.jpg", b"medium").await;

    let sink = Arc::new(RecordingSink::default());
    let downloader = orchestrator(fast_config(), sink.clone());

    let asset = ImageAsset::new(
        format!("{}/img-original/100_p0.png", server.uri()),
        0,
        AssetVariant::Original,
    )
    .with_fallbacks([format!("{}/img-master/100_p0_master1200.jpg", server.uri())]);
    let meta = metadata(vec![asset.clone()]);

    let outcomes = downloader.download_batch(&meta, &[asset]).await;

    assert!(outcomes[0].success);
    let committed = sink.committed.lock().unwrap().clone();
    assert_eq!(
        committed,
        vec![PathBuf::from("illust-dl/Artist/100_Title/000.jpg")],
        "extension follows the URL that succeeded"
    );
}

#[tokio::test]
async fn disabled_retries_try_each_candidate_once() {
    let server = MockServer::start().await;
    mount_status(&server, "/a.png", 503, 1).await;
    mount_status(&server, "/b.png", 503, 1).await;

    let mut config = fast_config();
    config.retry_enabled = false;
    let downloader = orchestrator(config, Arc::new(RecordingSink::default()));

    let asset = ImageAsset::new(format!("{}/a.png", server.uri()), 0, AssetVariant::Original)
        .with_fallbacks([format!("{}/b.png", server.uri())]);
    let meta = metadata(vec![asset.clone()]);

    let outcomes = downloader.download_batch(&meta, &[asset]).await;
    assert!(!outcomes[0].success);
    assert_eq!(
        BatchSummary::from_outcomes(&outcomes),
        BatchSummary::AllFailed { total: 1 }
    );
}

#[tokio::test]
async fn non_image_content_type_is_a_failed_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = fast_config();
    config.retry_enabled = false;
    let sink = Arc::new(RecordingSink::default());
    let downloader = orchestrator(config, sink.clone());

    let asset = ImageAsset::new(format!("{}/login.png", server.uri()), 0, AssetVariant::Original);
    let meta = metadata(vec![asset.clone()]);

    let outcomes = downloader.download_batch(&meta, &[asset]).await;
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("content type"));
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0, "nothing reaches the sink");
}

#[tokio::test]
async fn rejected_paths_fall_back_to_flatter_layouts() {
    let server = MockServer::start().await;
    mount_image(&server, "/100_p0.png", b"img").await;

    let sink = Arc::new(RecordingSink {
        reject_paths: 2,
        ..RecordingSink::default()
    });
    let downloader = orchestrator(fast_config(), sink.clone());
    let mut rx = downloader.subscribe();

    let asset = ImageAsset::new(format!("{}/100_p0.png", server.uri()), 0, AssetVariant::Original);
    let meta = metadata(vec![asset.clone()]);

    let outcomes = downloader.download_batch(&meta, &[asset]).await;

    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].saved_path.as_deref(), Some("illust-dl/100/000.png"));
    assert_eq!(sink.calls.load(Ordering::SeqCst), 3);

    let rejected = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, Event::PathRejected { .. }))
        .count();
    assert_eq!(rejected, 2);
}

#[tokio::test]
async fn other_sink_failures_abort_the_url_candidate() {
    let server = MockServer::start().await;
    mount_image(&server, "/first.png", b"one").await;
    mount_image(&server, "/second.png", b"two").await;

    let sink = Arc::new(RecordingSink {
        fail_other: true,
        ..RecordingSink::default()
    });
    let downloader = orchestrator(fast_config(), sink.clone());

    let asset = ImageAsset::new(format!("{}/first.png", server.uri()), 0, AssetVariant::Original)
        .with_fallbacks([format!("{}/second.png", server.uri())]);
    let meta = metadata(vec![asset.clone()]);

    let outcomes = downloader.download_batch(&meta, &[asset]).await;

    assert!(!outcomes[0].success);
    assert_eq!(
        sink.calls.load(Ordering::SeqCst),
        2,
        "one path per URL candidate, no further paths after a non-path failure"
    );
    assert!(outcomes[0].error.as_deref().unwrap().contains("permission denied"));
}

#[tokio::test]
async fn empty_batch_reports_all_succeeded() {
    let downloader = orchestrator(fast_config(), Arc::new(RecordingSink::default()));
    let mut rx = downloader.subscribe();

    let outcomes = downloader.download_batch(&metadata(Vec::new()), &[]).await;

    assert!(outcomes.is_empty());
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [Event::BatchFinished {
            summary: BatchSummary::AllSucceeded { total: 0 }
        }]
    ));
}

/// Metadata API serving fixed records from a mock image host
struct StaticApi {
    image_base: String,
    page_count: u32,
    detail_calls: AtomicUsize,
}

#[async_trait]
impl MetadataApi for StaticApi {
    async fn illust_detail(
        &self,
        _id: &str,
    ) -> std::result::Result<IllustDetail, crate::error::ResolveError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IllustDetail {
            illust_title: Some("Title".into()),
            user_name: Some("Artist".into()),
            page_count: Some(self.page_count),
            urls: UrlSet {
                original: Some(format!("{}/img-original/img/100_p0.png", self.image_base)),
                ..UrlSet::default()
            },
            ..IllustDetail::default()
        })
    }

    async fn ugoira_meta(&self, id: &str) -> std::result::Result<UgoiraMeta, crate::error::ResolveError> {
        Err(crate::error::ResolveError::MetadataUnavailable { id: id.to_string() })
    }
}

fn facade(server: &MockServer, page_count: u32, sink: Arc<dyn DownloadSink>) -> (IllustDownloader, Arc<StaticApi>) {
    let api = Arc::new(StaticApi {
        image_base: server.uri(),
        page_count,
        detail_calls: AtomicUsize::new(0),
    });
    let downloader =
        IllustDownloader::with_api(fast_config(), Arc::new(NoEmbeddedData), api.clone(), sink).unwrap();
    (downloader, api)
}

#[tokio::test]
async fn cancelled_prompt_skips_download_phase() {
    let server = MockServer::start().await;
    let sink = Arc::new(RecordingSink::default());
    let (downloader, _api) = facade(&server, 3, sink.clone());

    let result = downloader
        .download_subject("100", &FixedSelection::cancel())
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn selected_range_is_downloaded_in_order() {
    let server = MockServer::start().await;
    mount_image(&server, "/img-original/img/100_p1.png", b"p1").await;
    mount_image(&server, "/img-original/img/100_p2.png", b"p2").await;

    let sink = Arc::new(RecordingSink::default());
    let (downloader, api) = facade(&server, 4, sink.clone());

    let outcomes = downloader
        .download_subject("100", &FixedSelection::new(Selection::Range { start: 2, end: 3 }))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.success));
    assert_eq!(
        *sink.committed.lock().unwrap(),
        vec![
            PathBuf::from("illust-dl/Artist/100_Title/001.png"),
            PathBuf::from("illust-dl/Artist/100_Title/002.png"),
        ]
    );

    // Metadata stays cached for the same subject
    downloader.resolve("100").await.unwrap();
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 1);

    downloader.reset_context().await;
    downloader.resolve("100").await.unwrap();
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn single_asset_skips_prompt() {
    let server = MockServer::start().await;
    mount_image(&server, "/img-original/img/100_p0.png", b"p0").await;

    let dir = tempdir().unwrap();
    let mut config = fast_config();
    config.conflict_policy = FileCollisionAction::Overwrite;
    let api = Arc::new(StaticApi {
        image_base: server.uri(),
        page_count: 1,
        detail_calls: AtomicUsize::new(0),
    });
    let downloader = IllustDownloader::with_api(
        config,
        Arc::new(NoEmbeddedData),
        api,
        Arc::new(FsDownloadSink::new(dir.path())),
    )
    .unwrap();

    // A cancelling prompt is never consulted for a single asset
    let outcomes = downloader
        .download_subject("100", &FixedSelection::cancel())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);

    let again = downloader.download_subject("100", &AcceptAll).await.unwrap().unwrap();
    assert_eq!(again[0].saved_path, outcomes[0].saved_path, "overwrite keeps the same path");
}

#[tokio::test]
async fn resolution_failure_is_returned_as_error() {
    struct FailingApi;

    #[async_trait]
    impl MetadataApi for FailingApi {
        async fn illust_detail(
            &self,
            id: &str,
        ) -> std::result::Result<IllustDetail, crate::error::ResolveError> {
            Err(crate::error::ResolveError::RemoteRequestFailed {
                id: id.to_string(),
                status: Some(404),
                message: "HTTP 404".to_string(),
            })
        }

        async fn ugoira_meta(
            &self,
            id: &str,
        ) -> std::result::Result<UgoiraMeta, crate::error::ResolveError> {
            Err(crate::error::ResolveError::MetadataUnavailable { id: id.to_string() })
        }
    }

    let downloader = IllustDownloader::with_api(
        fast_config(),
        Arc::new(NoEmbeddedData),
        Arc::new(FailingApi),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    match downloader.download_subject("404", &AcceptAll).await {
        Err(Error::Resolve(e)) => assert_eq!(e.code(), "remote_request_failed"),
        other => panic!("expected resolution error, got {other:?}"),
    }
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut config = Config::default();
    config.root_folder_name = "  ".to_string();

    let result = IllustDownloader::new(
        config,
        Arc::new(NoEmbeddedData),
        Arc::new(RecordingSink::default()),
    );
    assert!(matches!(result, Err(Error::Config { .. })));
}
