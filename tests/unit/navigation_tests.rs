/*!
 * Tests for the navigation watcher and video identity helpers
 */

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use bilisub::navigation::{resolve_video_reference, video_id_from_url, NavigationWatcher, VideoChanged, WatcherState};

use crate::common::{VIDEO_A, VIDEO_B};

const DEBOUNCE: Duration = Duration::from_millis(200);

fn changed(id: &str) -> Option<VideoChanged> {
    Some(VideoChanged(id.to_string()))
}

#[test]
fn test_watcher_shouldStartIdle() {
    let watcher = NavigationWatcher::new(DEBOUNCE);
    assert_eq!(watcher.state(), &WatcherState::Idle);
    assert!(watcher.current().is_none());
}

#[test]
fn test_watcher_withRepeatedIdentity_shouldEmitOnce() {
    let mut watcher = NavigationWatcher::new(DEBOUNCE);
    let start = Instant::now();

    let mut events = Vec::new();
    for step in 0..10u64 {
        events.extend(watcher.observe(Some(VIDEO_A), start + Duration::from_millis(step * 50)));
    }

    assert_eq!(events, vec![VideoChanged(VIDEO_A.to_string())]);
}

#[test]
fn test_watcher_withRapidSwitching_shouldOnlyReportSettledIdentity() {
    let mut watcher = NavigationWatcher::new(DEBOUNCE);
    let start = Instant::now();

    assert!(watcher.observe(Some(VIDEO_A), start).is_none());
    assert!(watcher.observe(Some(VIDEO_B), start + Duration::from_millis(100)).is_none());
    // VIDEO_A never stayed stable long enough
    assert!(watcher.poll(start + Duration::from_millis(250)).is_none());
    assert_eq!(watcher.poll(start + Duration::from_millis(300)), changed(VIDEO_B));
}

#[test]
fn test_watcher_withInvalidIdentity_shouldIgnoreIt() {
    let mut watcher = NavigationWatcher::new(DEBOUNCE);
    let start = Instant::now();

    assert!(watcher.observe(Some("loading..."), start).is_none());
    assert!(watcher.poll(start + Duration::from_secs(1)).is_none());
    assert!(!watcher.has_pending());
}

#[test]
fn test_watcher_reset_shouldReturnToIdle() {
    let mut watcher = NavigationWatcher::new(DEBOUNCE);
    watcher.attach(VIDEO_A);
    watcher.reset();

    assert_eq!(watcher.state(), &WatcherState::Idle);
    // The same video is reported again after a teardown
    assert_eq!(watcher.attach(VIDEO_A), changed(VIDEO_A));
}

#[tokio::test(start_paused = true)]
async fn test_run_withChangingProbe_shouldForwardEachTransition() {
    let started = Instant::now();
    let probe = move || {
        let elapsed = started.elapsed();
        if elapsed < Duration::from_millis(500) {
            Some(VIDEO_A.to_string())
        } else if elapsed < Duration::from_millis(600) {
            None
        } else {
            Some(VIDEO_B.to_string())
        }
    };

    let (tx, mut rx) = mpsc::channel(8);
    let handle = tokio::spawn(NavigationWatcher::new(DEBOUNCE).run(probe, Duration::from_millis(50), tx));

    assert_eq!(rx.recv().await, changed(VIDEO_A));
    assert_eq!(rx.recv().await, changed(VIDEO_B));

    drop(rx);
    handle.await.unwrap();
}

#[test]
fn test_videoIdFromUrl_withMobileHost_shouldMatch() {
    assert_eq!(
        video_id_from_url("https://m.bilibili.com/video/BV1xx411c7mD"),
        Some(VIDEO_A.to_string())
    );
}

#[test]
fn test_videoIdFromUrl_withWatchLaterList_shouldReadBvidQuery() {
    assert_eq!(
        video_id_from_url("https://www.bilibili.com/list/watchlater?bvid=BV1GJ411x7h7&p=2"),
        Some(format!("{}-p2", VIDEO_B))
    );
    assert_eq!(video_id_from_url("https://www.bilibili.com/list/watchlater"), None);
}

#[test]
fn test_resolveVideoReference_shouldAcceptIdsAndUrls() {
    assert_eq!(resolve_video_reference(" BV1xx411c7mD "), Some(VIDEO_A.to_string()));
    assert_eq!(resolve_video_reference("av170001-p4"), Some("av170001-p4".to_string()));
    assert_eq!(
        resolve_video_reference("https://www.bilibili.com/video/av170001/"),
        Some("av170001".to_string())
    );
    assert_eq!(resolve_video_reference("https://youtu.be/abc"), None);
}
