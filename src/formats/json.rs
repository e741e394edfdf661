//! Structured dump of a track for debugging and programmatic reuse.

use serde::{Deserialize, Serialize};

use crate::errors::ExportError;
use crate::track::{Cue, Track, TrackSource};

/// Serialized shape of a track
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackDocument {
    pub video_id: String,
    pub language: String,
    pub source: TrackSource,
    pub cues: Vec<Cue>,
}

impl From<&Track> for TrackDocument {
    fn from(track: &Track) -> Self {
        Self {
            video_id: track.video_id().to_string(),
            language: track.language_code().to_string(),
            source: track.source(),
            cues: track.cues().to_vec(),
        }
    }
}

/// Render a track as pretty-printed JSON.
///
/// An empty track still yields a well-formed document with `"cues": []`.
pub fn encode(track: &Track) -> Result<String, ExportError> {
    let document = TrackDocument::from(track);
    let mut json = serde_json::to_string_pretty(&document)
        .map_err(|e| ExportError::Serialization(e.to_string()))?;
    json.push('\n');
    Ok(json)
}

/// Rebuild a track from a document produced by [`encode`]
pub fn decode(json: &str) -> Result<Track, ExportError> {
    let document: TrackDocument = serde_json::from_str(json).map_err(|e| ExportError::InvalidCue {
        index: 0,
        reason: format!("malformed track document: {}", e),
    })?;

    Track::from_raw(
        document.video_id,
        document.language,
        document.source,
        document
            .cues
            .into_iter()
            .map(|cue| (cue.start_ms, cue.end_ms, cue.text))
            .collect(),
    )
}
