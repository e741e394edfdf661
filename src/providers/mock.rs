/*!
 * Mock caption fetcher for testing.
 *
 * This module provides a fetcher that simulates different behaviors:
 * - `MockFetcher::working()` - Always returns a two-track payload
 * - `MockFetcher::intermittent(n)` - Fails every Nth request
 * - `MockFetcher::failing()` - Always fails with a server error
 * - `MockFetcher::without_tracks()` - Returns a payload with no tracks
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{CaptionFetcher, CaptionPayload, PayloadCue, PayloadTrack};

/// Behavior mode for the mock fetcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with the sample payload
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Always fails with a client error that must not be retried
    NotFound,
    /// Returns bytes that are not a payload
    Malformed,
    /// Returns a payload listing no tracks
    NoTracks,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// Mock fetcher for testing acquisition behavior
#[derive(Debug)]
pub struct MockFetcher {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom payload generator (optional)
    custom_payload: Option<fn(&str) -> CaptionPayload>,
}

impl MockFetcher {
    /// Create a new mock fetcher with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_payload: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn not_found() -> Self {
        Self::new(MockBehavior::NotFound)
    }

    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    pub fn without_tracks() -> Self {
        Self::new(MockBehavior::NoTracks)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom payload generator used instead of the sample payload
    pub fn with_custom_payload(mut self, generator: fn(&str) -> CaptionPayload) -> Self {
        self.custom_payload = Some(generator);
        self
    }

    /// Number of fetches made so far, across clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Sample payload: a machine-generated Chinese track listed before a
    /// native English one, times in seconds
    pub fn sample_payload(video_id: &str) -> CaptionPayload {
        CaptionPayload {
            video_id: video_id.to_string(),
            tracks: vec![
                PayloadTrack {
                    lan: "ai-zh".to_string(),
                    lan_doc: "中文（自动生成）".to_string(),
                    ai: true,
                    unit: None,
                    fps: None,
                    body: vec![
                        cue(0.0, 1.5, "大家好"),
                        cue(1.5, 3.25, "欢迎回来"),
                    ],
                },
                PayloadTrack {
                    lan: "en-US".to_string(),
                    lan_doc: "English".to_string(),
                    ai: false,
                    unit: None,
                    fps: None,
                    body: vec![
                        cue(0.0, 1.5, "Hello everyone"),
                        cue(1.5, 3.25, "Welcome back"),
                        cue(4.0, 6.0, "Let's begin"),
                    ],
                },
            ],
        }
    }

    fn payload_bytes(&self, video_id: &str) -> Result<Bytes, ProviderError> {
        let payload = match self.custom_payload {
            Some(generator) => generator(video_id),
            None => Self::sample_payload(video_id),
        };
        Ok(Bytes::from(serde_json::to_vec(&payload)?))
    }
}

impl Clone for MockFetcher {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_payload: self.custom_payload,
        }
    }
}

/// Build a payload cue
pub fn cue(from: f64, to: f64, content: &str) -> PayloadCue {
    PayloadCue {
        from,
        to,
        content: content.to_string(),
    }
}

#[async_trait]
impl CaptionFetcher for MockFetcher {
    async fn fetch_caption_payload(&self, video_id: &str) -> Result<Bytes, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => self.payload_bytes(video_id),

            MockBehavior::Intermittent { fail_every } => {
                let fail_every = fail_every.max(1);
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    self.payload_bytes(video_id)
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated caption source failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::NotFound => Err(ProviderError::ApiError {
                message: "Simulated missing video".to_string(),
                status_code: 404,
            }),

            MockBehavior::Malformed => Ok(Bytes::from_static(b"<html>not json</html>")),

            MockBehavior::NoTracks => {
                let payload = CaptionPayload {
                    video_id: video_id.to_string(),
                    tracks: Vec::new(),
                };
                Ok(Bytes::from(serde_json::to_vec(&payload)?))
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.payload_bytes(video_id)
            }
        }
    }
}
