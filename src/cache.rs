/*!
 * Per-session track cache.
 *
 * Holds the tracks acquired for the video currently attached, keyed by
 * the requested language. Switching to another video clears it; every
 * switch also bumps a generation counter so results of acquisitions that
 * started for an earlier video can be recognised and dropped.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::track::Track;

/// Cache key: requested language, `None` for "whatever is preferred"
pub type LanguageKey = Option<String>;

#[derive(Debug, Default)]
struct CacheState {
    video_id: Option<String>,
    generation: u64,
    tracks: HashMap<LanguageKey, Arc<Track>>,
    hits: usize,
    misses: usize,
}

/// Session cache of acquired tracks
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    state: Arc<RwLock<CacheState>>,
}

/// Normalize a requested language into a cache key
pub fn language_key(language: Option<&str>) -> LanguageKey {
    language
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Video the cache currently belongs to
    pub fn video_id(&self) -> Option<String> {
        self.state.read().video_id.clone()
    }

    /// Current generation; changes on every video switch or reset
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Attach the cache to `video_id`.
    ///
    /// Returns `false` (and keeps the cache) when it already belongs to
    /// that video.
    pub fn attach(&self, video_id: &str) -> bool {
        let mut state = self.state.write();
        if state.video_id.as_deref() == Some(video_id) {
            return false;
        }

        debug!(
            "Session cache moves from {:?} to {} ({} tracks dropped)",
            state.video_id,
            video_id,
            state.tracks.len()
        );
        state.video_id = Some(video_id.to_string());
        state.generation += 1;
        state.tracks.clear();
        true
    }

    /// Forget the video and every cached track
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.video_id = None;
        state.generation += 1;
        state.tracks.clear();
    }

    /// Cached track for the current video
    pub fn get(&self, key: &LanguageKey) -> Option<Arc<Track>> {
        let mut state = self.state.write();
        match state.tracks.get(key).cloned() {
            Some(track) => {
                state.hits += 1;
                Some(track)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store a track acquired during `generation`.
    ///
    /// Returns `false` and stores nothing if the session moved on since.
    pub fn store(&self, generation: u64, key: LanguageKey, track: Arc<Track>) -> bool {
        let mut state = self.state.write();
        if state.generation != generation || state.video_id.as_deref() != Some(track.video_id()) {
            debug!("Discarding stale track for {}", track.video_id());
            return false;
        }
        state.tracks.insert(key, track);
        true
    }

    /// Number of cached tracks
    pub fn len(&self) -> usize {
        self.state.read().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit count, miss count and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let state = self.state.read();
        let total = state.hits + state.misses;
        let rate = if total > 0 {
            state.hits as f64 / total as f64
        } else {
            0.0
        };
        (state.hits, state.misses, rate)
    }
}
