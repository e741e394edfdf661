/*!
 * Caption acquisition.
 *
 * Turns a video identity into a [`Track`]: fetch the payload through the
 * injected [`CaptionFetcher`] (retrying transient failures with a linear
 * backoff), pick the track to use, convert its times to milliseconds and
 * repair the cue list so the result is sorted and non-overlapping.
 */

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{AcquisitionConfig, TimingConfig};
use crate::errors::{ExportError, ProviderError};
use crate::language_utils;
use crate::providers::{CaptionFetcher, CaptionPayload, PayloadTrack};
use crate::timestamp::TimingUnit;
use crate::track::{self, RawCue, Track, TrackSource};

/// Summary of an available caption track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub language_code: String,
    pub language_name: String,
    pub source: TrackSource,
    pub cue_count: usize,
}

/// Acquires caption tracks through an injected fetcher
#[derive(Debug)]
pub struct AcquisitionAdapter<F: CaptionFetcher> {
    fetcher: Arc<F>,
    retry_count: u32,
    retry_backoff: Duration,
    timing: TimingConfig,
}

impl<F: CaptionFetcher> AcquisitionAdapter<F> {
    /// Create an adapter with the given retry and timing settings
    pub fn new(fetcher: F, acquisition: &AcquisitionConfig, timing: TimingConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            retry_count: acquisition.retry_count,
            retry_backoff: Duration::from_millis(acquisition.retry_backoff_ms),
            timing,
        }
    }

    /// The injected fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Acquire the track for `video_id`.
    ///
    /// Uses the track matching `preferred_language` if there is one, else
    /// the first native track, else the first track. Zero tracks is
    /// `NoCaptionsAvailable`, not a failure.
    pub async fn acquire(&self, video_id: &str, preferred_language: Option<&str>) -> Result<Track, ExportError> {
        let payload = self.fetch_payload(video_id).await?;
        self.track_from_payload(video_id, &payload, preferred_language)
    }

    /// Select and normalize a track of an already fetched payload
    pub fn track_from_payload(
        &self,
        video_id: &str,
        payload: &CaptionPayload,
        preferred_language: Option<&str>,
    ) -> Result<Track, ExportError> {
        let selected = select_track(&payload.tracks, preferred_language).ok_or_else(|| {
            info!("Video {} has no captions", video_id);
            ExportError::NoCaptionsAvailable {
                video_id: video_id.to_string(),
            }
        })?;

        if let Some(preferred) = preferred_language {
            if !language_utils::language_codes_match(preferred, &selected.lan) {
                info!(
                    "No {} captions for {}, falling back to {}",
                    preferred, video_id, selected.lan
                );
            }
        }

        let track = normalize_track(video_id, selected, &self.timing)?;
        debug!("Acquired {}", track);
        Ok(track)
    }

    /// List the tracks a video offers without normalizing them
    pub async fn list_tracks(&self, video_id: &str) -> Result<Vec<TrackInfo>, ExportError> {
        let payload = self.fetch_payload(video_id).await?;

        Ok(payload
            .tracks
            .iter()
            .map(|track| TrackInfo {
                language_code: track.lan.clone(),
                language_name: if track.lan_doc.is_empty() {
                    language_utils::get_language_name(&track.lan).unwrap_or_else(|_| track.lan.clone())
                } else {
                    track.lan_doc.clone()
                },
                source: source_of(track),
                cue_count: track.body.len(),
            })
            .collect())
    }

    /// Fetch and parse the payload, retrying transient failures.
    ///
    /// Attempt `n` (1-based) that fails is followed by a wait of
    /// `n * retry_backoff`.
    pub async fn fetch_payload(&self, video_id: &str) -> Result<CaptionPayload, ExportError> {
        let max_attempts = self.retry_count + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match self.fetcher.fetch_caption_payload(video_id).await {
                Ok(bytes) => parse_payload(&bytes),
                Err(e) => Err(e),
            };

            match result {
                Ok(payload) => {
                    if payload.video_id != video_id {
                        warn!("Payload for {} is labelled {}", video_id, payload.video_id);
                    }
                    return Ok(payload);
                }
                Err(cause) if cause.is_transient() && attempt < max_attempts => {
                    warn!(
                        "Caption fetch for {} failed: {} - attempt {}/{}",
                        video_id, cause, attempt, max_attempts
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(cause) => {
                    error!(
                        "Caption fetch for {} failed after {} attempt(s): {}",
                        video_id, attempt, cause
                    );
                    return Err(ExportError::Acquisition { cause });
                }
            }
        }
    }
}

/// Parse payload bytes
pub fn parse_payload(bytes: &[u8]) -> Result<CaptionPayload, ProviderError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Choose the track to export.
///
/// Preference order: an exact (case-insensitive) match of the requested
/// language, a track of the same primary language, the first native
/// track, the first track.
pub fn select_track<'a>(tracks: &'a [PayloadTrack], preferred_language: Option<&str>) -> Option<&'a PayloadTrack> {
    if let Some(preferred) = preferred_language {
        let exact = tracks.iter().find(|t| t.lan.eq_ignore_ascii_case(preferred.trim()));
        let same_language = || {
            tracks
                .iter()
                .filter(|t| language_utils::language_codes_match(preferred, &t.lan))
                .min_by_key(|t| t.is_machine_generated())
        };
        if let Some(track) = exact.or_else(same_language) {
            return Some(track);
        }
    }

    tracks
        .iter()
        .find(|t| !t.is_machine_generated())
        .or_else(|| tracks.first())
}

fn source_of(track: &PayloadTrack) -> TrackSource {
    if track.is_machine_generated() {
        TrackSource::MachineGenerated
    } else {
        TrackSource::Native
    }
}

/// Unit the track's times are expressed in: declared by the track, or
/// configured for its source hint
fn timing_unit(track: &PayloadTrack, timing: &TimingConfig) -> Result<TimingUnit, ProviderError> {
    let configured = timing.unit_for(source_of(track));

    let Some(unit) = track.unit.as_deref() else {
        return Ok(configured);
    };

    match unit.to_lowercase().as_str() {
        "seconds" | "second" | "s" => Ok(TimingUnit::Seconds),
        "milliseconds" | "millisecond" | "ms" => Ok(TimingUnit::Milliseconds),
        "frames" | "frame" => match (track.fps, configured) {
            (Some(fps), _) => Ok(TimingUnit::Frames { fps }),
            (None, TimingUnit::Frames { fps }) => Ok(TimingUnit::Frames { fps }),
            (None, _) => Err(ProviderError::ParseError(format!(
                "Track {} declares frame timing without a frame rate",
                track.lan
            ))),
        },
        other => Err(ProviderError::ParseError(format!(
            "Track {} declares unknown timing unit '{}'",
            track.lan, other
        ))),
    }
}

/// Convert a payload track into a validated, repaired [`Track`]
pub fn normalize_track(video_id: &str, track: &PayloadTrack, timing: &TimingConfig) -> Result<Track, ExportError> {
    let unit = timing_unit(track, timing)?;

    let mut raw: Vec<RawCue> = Vec::with_capacity(track.body.len());
    for (index, cue) in track.body.iter().enumerate() {
        let convert = |value: f64| {
            unit.to_millis(value)
                .map_err(|e| ProviderError::ParseError(format!("Cue {} of {}: {}", index, track.lan, e)))
        };
        raw.push((convert(cue.from)?, convert(cue.to)?, crate::track::canonical_text(&cue.content)));
    }

    if let Some(index) = raw.iter().position(|(start, end, _)| end < start) {
        let (start, end, _) = &raw[index];
        return Err(ExportError::InvalidCue {
            index,
            reason: format!("end {} precedes start {}", end, start),
        });
    }

    let before = raw.len();
    let repaired = repair_cues(raw);
    if repaired.len() != before {
        debug!("Repaired {} track of {}: {} -> {} cues", track.lan, video_id, before, repaired.len());
    }

    Track::from_raw(video_id, track.lan.clone(), source_of(track), repaired)
}

/// Bring a cue list into track shape.
///
/// Blank and zero-duration cues are dropped, the rest stably sorted by
/// start. Cues sharing a start time are merged (identical texts collapse,
/// different texts are joined by a newline; the later end wins) and a cue
/// running into the next one is cut at the next start.
pub fn repair_cues(raw: Vec<RawCue>) -> Vec<RawCue> {
    let mut cues: Vec<RawCue> = raw
        .into_iter()
        .filter(|(start, end, text)| end > start && !text.trim().is_empty())
        .map(|(start, end, text)| (start, end, track::canonical_text(&text)))
        .collect();
    cues.sort_by_key(|(start, _, _)| *start);

    track::coalesce(cues)
}
