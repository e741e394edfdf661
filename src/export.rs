/*!
 * Export orchestration.
 *
 * Ties the session cache, the acquisition adapter and the encoders
 * together. Payload fetches are single-flight per video: concurrent
 * requests for the same video, whatever language they ask for, await one
 * shared fetch and select their track from its result.
 */

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::acquisition::{AcquisitionAdapter, TrackInfo};
use crate::cache::{language_key, SessionCache};
use crate::errors::ExportError;
use crate::file_utils::FileManager;
use crate::formats::{self, ExportFormat};
use crate::navigation::VideoChanged;
use crate::providers::{CaptionFetcher, CaptionPayload};
use crate::track::Track;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<CaptionPayload>, ExportError>>>;

/// One export: a track and the format to render it in
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub track: Arc<Track>,
    pub format: ExportFormat,
}

impl ExportRequest {
    /// Render the track
    pub fn render(&self) -> Result<ExportArtifact, ExportError> {
        let content = formats::encode(&self.track, self.format)?;
        Ok(ExportArtifact::new(&self.track, self.format, content))
    }
}

/// Rendered captions, ready to be saved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportArtifact {
    /// `<video_id>.<language>.<ext>`
    pub filename: String,
    pub mime_type: String,
    pub content: String,
}

impl ExportArtifact {
    pub fn new(track: &Track, format: ExportFormat, content: String) -> Self {
        let filename = format!("{}.{}.{}", track.video_id(), track.language_code(), format.extension());
        Self {
            filename: FileManager::sanitize_file_name(&filename),
            mime_type: format.mime_type().to_string(),
            content,
        }
    }
}

/// Serves export requests for the attached video
pub struct ExportOrchestrator<F: CaptionFetcher + 'static> {
    adapter: Arc<AcquisitionAdapter<F>>,
    cache: SessionCache,
    // In-flight payload fetches per video, with the cache generation they started in
    inflight: Mutex<HashMap<String, (u64, SharedFetch)>>,
}

impl<F: CaptionFetcher + 'static> ExportOrchestrator<F> {
    pub fn new(adapter: AcquisitionAdapter<F>) -> Self {
        Self {
            adapter: Arc::new(adapter),
            cache: SessionCache::new(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn adapter(&self) -> &AcquisitionAdapter<F> {
        &self.adapter
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Video exports are currently served for
    pub fn current_video(&self) -> Option<String> {
        self.cache.video_id()
    }

    /// Switch to another video, dropping cached tracks and forgetting
    /// acquisitions still running for the previous one
    pub fn handle_video_changed(&self, change: &VideoChanged) {
        if self.cache.attach(&change.0) {
            let dropped = {
                let mut inflight = self.inflight.lock();
                let count = inflight.len();
                inflight.clear();
                count
            };
            info!("Now exporting captions for {}", change.0);
            if dropped > 0 {
                debug!("Forgot {} in-flight acquisition(s)", dropped);
            }
        }
    }

    /// Full teardown: no video, nothing cached, nothing in flight
    pub fn reset(&self) {
        self.cache.reset();
        self.inflight.lock().clear();
        debug!("Export session reset");
    }

    /// Render the current video's captions in `format`
    pub async fn request_export(
        &self,
        format: ExportFormat,
        preferred_language: Option<&str>,
    ) -> Result<ExportArtifact, ExportError> {
        let track = self.current_track(preferred_language).await?;
        let request = ExportRequest { track, format };

        let artifact = request.render()?;
        info!(
            "Exported {} cues of {} as {}",
            request.track.len(),
            request.track.video_id(),
            format
        );
        Ok(artifact)
    }

    /// Tracks the current video offers
    pub async fn list_tracks(&self) -> Result<Vec<TrackInfo>, ExportError> {
        let video_id = self.current_video().ok_or(ExportError::NoActiveVideo)?;
        self.adapter.list_tracks(&video_id).await
    }

    /// Track for the current video, from the cache or a (shared) acquisition
    pub async fn current_track(&self, preferred_language: Option<&str>) -> Result<Arc<Track>, ExportError> {
        let video_id = self.current_video().ok_or(ExportError::NoActiveVideo)?;
        let key = language_key(preferred_language);

        if let Some(track) = self.cache.get(&key) {
            debug!("Using cached track for {} ({:?})", video_id, key);
            return Ok(track);
        }

        let generation = self.cache.generation();
        let fetch = self.join_or_start(&video_id, generation);

        let result = fetch.await;

        {
            let mut inflight = self.inflight.lock();
            if matches!(inflight.get(&video_id), Some((started, _)) if *started == generation) {
                inflight.remove(&video_id);
            }
        }

        let payload = result?;
        let track = Arc::new(self.adapter.track_from_payload(&video_id, &payload, preferred_language)?);
        self.cache.store(generation, key, Arc::clone(&track));
        Ok(track)
    }

    fn join_or_start(&self, video_id: &str, generation: u64) -> SharedFetch {
        let mut inflight = self.inflight.lock();

        if let Some((started, shared)) = inflight.get(video_id) {
            if *started == generation {
                debug!("Joining in-flight caption fetch for {}", video_id);
                return shared.clone();
            }
        }

        let adapter = Arc::clone(&self.adapter);
        let owned_id = video_id.to_string();
        let shared = async move { adapter.fetch_payload(&owned_id).await.map(Arc::new) }
            .boxed()
            .shared();

        inflight.insert(video_id.to_string(), (generation, shared.clone()));
        shared
    }
}
