/*!
 * End-to-end tests: identity observations through to rendered artifacts
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use bilisub::file_utils::FileManager;
use bilisub::providers::mock::MockFetcher;
use bilisub::{ExportError, ExportFormat};

use crate::common::{create_temp_dir, exporter, init_test_logging, VIDEO_A, VIDEO_B};

const SETTLED: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_export_beforeAnyVideo_shouldBeNoActiveVideo() {
    let exporter = exporter(MockFetcher::working());
    let err = exporter.request_export(ExportFormat::Srt, None).await.unwrap_err();
    assert_eq!(err, ExportError::NoActiveVideo);
}

#[tokio::test]
async fn test_export_afterSettledNavigation_shouldRenderEveryFormat() {
    init_test_logging();
    let fetcher = MockFetcher::working();
    let exporter = exporter(fetcher.clone());
    let start = Instant::now();

    exporter.notify_video_identity_at(Some(VIDEO_A), start);
    exporter.notify_video_identity_at(Some(VIDEO_A), start + SETTLED);
    assert_eq!(exporter.current_video().as_deref(), Some(VIDEO_A));

    for format in ExportFormat::ALL {
        let artifact = exporter.request_export(format, Some("en")).await.unwrap();
        assert_eq!(artifact.filename, format!("{}.en-US.{}", VIDEO_A, format.extension()));
        assert_eq!(artifact.mime_type, format.mime_type());
        assert!(!artifact.content.is_empty());
    }

    // Every format was served from one acquisition
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test]
async fn test_concurrentExports_forJustChangedVideo_shouldAcquireOnce() {
    let fetcher = MockFetcher::slow(100);
    let exporter = Arc::new(exporter(fetcher.clone()));
    exporter.open_video(VIDEO_A);

    let first = {
        let exporter = Arc::clone(&exporter);
        tokio::spawn(async move { exporter.request_export(ExportFormat::Srt, None).await })
    };
    let second = {
        let exporter = Arc::clone(&exporter);
        tokio::spawn(async move { exporter.request_export(ExportFormat::Vtt, None).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(first.content.starts_with("1\n"));
    assert!(second.content.starts_with("WEBVTT\n\n"));
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrentExports_inDifferentLanguages_shouldFetchOnce() {
    let fetcher = MockFetcher::slow(500);
    let exporter = exporter(fetcher.clone());
    exporter.open_video(VIDEO_A);

    let (english, chinese) = tokio::join!(
        exporter.request_export(ExportFormat::PlainText, Some("en")),
        exporter.request_export(ExportFormat::PlainText, Some("zh")),
    );

    assert!(english.unwrap().content.starts_with("Hello everyone"));
    assert!(chinese.unwrap().content.starts_with("大家好"));
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test]
async fn test_differentLanguages_shouldBeCachedSeparately() {
    let fetcher = MockFetcher::working();
    let exporter = exporter(fetcher.clone());
    exporter.open_video(VIDEO_A);

    let english = exporter.request_export(ExportFormat::PlainText, Some("en")).await.unwrap();
    let chinese = exporter.request_export(ExportFormat::PlainText, Some("zh")).await.unwrap();
    exporter.request_export(ExportFormat::Srt, Some("en")).await.unwrap();

    assert!(english.content.starts_with("Hello everyone"));
    assert!(chinese.content.starts_with("大家好"));
    assert_eq!(fetcher.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_videoChange_duringAcquisition_shouldNotCacheStaleTrack() {
    init_test_logging();
    let fetcher = MockFetcher::slow(1_000);
    let exporter = Arc::new(exporter(fetcher.clone()));
    exporter.open_video(VIDEO_A);

    let stale = {
        let exporter = Arc::clone(&exporter);
        tokio::spawn(async move { exporter.request_export(ExportFormat::Srt, None).await })
    };

    // Let the acquisition for VIDEO_A start, then navigate away
    tokio::time::sleep(Duration::from_millis(10)).await;
    exporter.open_video(VIDEO_B);

    let stale = stale.await.unwrap().unwrap();
    assert!(stale.filename.starts_with(VIDEO_A));
    assert!(exporter.orchestrator().cache().is_empty());

    let fresh = exporter.request_export(ExportFormat::Srt, None).await.unwrap();
    assert!(fresh.filename.starts_with(VIDEO_B));
    assert_eq!(fetcher.request_count(), 2);
    assert_eq!(exporter.orchestrator().cache().len(), 1);
}

#[tokio::test]
async fn test_pendingNavigation_shouldBeAppliedBeforeExport() {
    let fetcher = MockFetcher::working();
    let exporter = exporter(fetcher.clone());
    exporter.open_video(VIDEO_A);
    exporter.request_export(ExportFormat::Srt, None).await.unwrap();

    // Observed long enough ago to have settled by the time of the export
    let observed = Instant::now() - SETTLED;
    assert!(exporter.notify_video_identity_at(Some(VIDEO_B), observed).is_none());

    let artifact = exporter.request_export(ExportFormat::Srt, None).await.unwrap();
    assert!(artifact.filename.starts_with(VIDEO_B));
}

#[tokio::test]
async fn test_noCaptions_shouldPropagateUnchanged() {
    let exporter = exporter(MockFetcher::without_tracks());
    exporter.open_video(VIDEO_A);

    let err = exporter.request_export(ExportFormat::Vtt, None).await.unwrap_err();
    assert!(err.is_expected_absence());
}

#[tokio::test(start_paused = true)]
async fn test_failedAcquisition_shouldNotPoisonLaterRequests() {
    let fetcher = MockFetcher::intermittent(1);
    let exporter = exporter(fetcher.clone());
    exporter.open_video(VIDEO_A);

    let err = exporter.request_export(ExportFormat::Srt, None).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(fetcher.request_count(), 3);

    // A new request starts a new acquisition rather than reusing the failure
    let _ = exporter.request_export(ExportFormat::Srt, None).await;
    assert_eq!(fetcher.request_count(), 6);
}

#[tokio::test]
async fn test_reset_shouldForgetVideoAndCache() {
    let exporter = exporter(MockFetcher::working());
    exporter.open_video(VIDEO_A);
    exporter.request_export(ExportFormat::Srt, None).await.unwrap();

    exporter.reset();
    assert!(exporter.current_video().is_none());
    assert!(exporter.orchestrator().cache().is_empty());
}

#[tokio::test]
async fn test_artifact_writtenToDisk_shouldMatchContent() -> Result<()> {
    let dir = create_temp_dir()?;
    let exporter = exporter(MockFetcher::working());
    exporter.open_video(&format!("{}-p2", VIDEO_A));

    let artifact = exporter.request_export(ExportFormat::TimedText, None).await?;
    assert_eq!(artifact.filename, format!("{}-p2.en-US.timed.txt", VIDEO_A));

    let path = FileManager::generate_output_path(dir.path(), &artifact.filename);
    FileManager::write_new_file(&path, &artifact.content, false)?;
    assert_eq!(FileManager::read_to_string(&path)?, artifact.content);
    assert!(FileManager::write_new_file(&path, &artifact.content, false).is_err());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_watch_withPageFlickeringBetweenVideos_shouldFollowThePage() {
    init_test_logging();
    let fetcher = MockFetcher::working();
    let exporter = exporter(fetcher.clone());
    let start = Instant::now();

    // A until 300 ms, then a blank identity mid-transition, then B from 400 ms
    let page_identity = move || {
        let elapsed = start.elapsed();
        if elapsed < Duration::from_millis(300) {
            Some(VIDEO_A.to_string())
        } else if elapsed < Duration::from_millis(400) {
            Some(String::new())
        } else {
            Some(VIDEO_B.to_string())
        }
    };

    let _ = tokio::time::timeout(Duration::from_millis(325), exporter.watch(page_identity)).await;
    assert_eq!(exporter.current_video().as_deref(), Some(VIDEO_A));

    let _ = tokio::time::timeout(Duration::from_millis(500), exporter.watch(page_identity)).await;
    assert_eq!(exporter.current_video().as_deref(), Some(VIDEO_B));

    let artifact = exporter.request_export(ExportFormat::Srt, None).await.unwrap();
    assert!(artifact.filename.starts_with(VIDEO_B));
    assert_eq!(fetcher.request_count(), 1);
}
