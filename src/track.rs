use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ExportError;
use crate::timestamp;

// @module: Cue model - immutable, validated caption tracks

// @struct: Single timed caption line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    // @field: Start offset in ms
    pub start_ms: u64,

    // @field: End offset in ms, never before start
    pub end_ms: u64,

    // @field: Caption text, may span several lines
    pub text: String,
}

impl Cue {
    /// Length of the cue in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} --> {} {}",
            timestamp::format_srt(self.start_ms),
            timestamp::format_srt(self.end_ms),
            self.text
        )
    }
}

/// Unvalidated `(start, end, text)` triple as handed to [`Track::from_raw`]
pub type RawCue = (u64, u64, String);

/// Cue text as stored in a track: every line trimmed, blank lines removed.
///
/// SRT and WebVTT end a cue at the first blank line, so only text in this
/// form survives an export and re-import unchanged.
pub fn canonical_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Merge cues sharing a start time and cut each cue at the next start.
///
/// Expects cues sorted by start. Identical texts on the same start collapse,
/// different ones are joined by a newline in input order; the later end wins.
pub(crate) fn coalesce(cues: Vec<RawCue>) -> Vec<RawCue> {
    let mut merged: Vec<RawCue> = Vec::with_capacity(cues.len());
    for (start, end, text) in cues {
        match merged.last_mut() {
            Some((last_start, last_end, last_text)) if *last_start == start => {
                *last_end = (*last_end).max(end);
                if *last_text != text {
                    last_text.push('\n');
                    last_text.push_str(&text);
                }
            }
            _ => merged.push((start, end, text)),
        }
    }

    for i in 1..merged.len() {
        let next_start = merged[i].0;
        let previous = &mut merged[i - 1];
        if previous.1 > next_start {
            previous.1 = next_start;
        }
    }

    merged
}

/// Where a caption track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Uploaded by the author or the community
    #[default]
    Native,
    /// Produced by the site's speech recognition
    MachineGenerated,
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.pad("native"),
            Self::MachineGenerated => f.pad("machine-generated"),
        }
    }
}

/// An ordered, validated sequence of cues for one video and language.
///
/// A track never changes after construction; every transform returns a new
/// one. Cues are sorted by start time, ties keep the order they arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    video_id: String,
    language_code: String,
    source: TrackSource,
    cues: Vec<Cue>,
}

impl Track {
    /// Build a track from raw triples.
    ///
    /// Fails with `InvalidCue` carrying the input position of the first
    /// triple whose end precedes its start or whose text is blank. Text is
    /// stored in [`canonical_text`] form.
    pub fn from_raw(
        video_id: impl Into<String>,
        language_code: impl Into<String>,
        source: TrackSource,
        raw: Vec<RawCue>,
    ) -> Result<Self, ExportError> {
        let mut cues = Vec::with_capacity(raw.len());

        for (index, (start_ms, end_ms, text)) in raw.into_iter().enumerate() {
            if end_ms < start_ms {
                return Err(ExportError::InvalidCue {
                    index,
                    reason: format!("end {} precedes start {}", end_ms, start_ms),
                });
            }
            let text = canonical_text(&text);
            if text.is_empty() {
                return Err(ExportError::InvalidCue {
                    index,
                    reason: "empty text".to_string(),
                });
            }
            cues.push(Cue { start_ms, end_ms, text });
        }

        // Vec::sort_by_key is stable
        cues.sort_by_key(|cue| cue.start_ms);

        Ok(Self {
            video_id: video_id.into(),
            language_code: language_code.into(),
            source,
            cues,
        })
    }

    /// A track with no cues
    pub fn empty(video_id: impl Into<String>, language_code: impl Into<String>, source: TrackSource) -> Self {
        Self {
            video_id: video_id.into(),
            language_code: language_code.into(),
            source,
            cues: Vec::new(),
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// End of the last cue, or 0 for an empty track
    pub fn duration_ms(&self) -> u64 {
        self.cues.iter().map(|cue| cue.end_ms).max().unwrap_or(0)
    }

    /// Move every cue by `offset_ms`.
    ///
    /// Cues that end at or before zero are dropped, cues straddling zero
    /// start at zero (and are coalesced if that makes them share a start).
    pub fn shifted(&self, offset_ms: i64) -> Self {
        let shift = |ms: u64| -> u64 {
            let moved = ms as i128 + offset_ms as i128;
            moved.clamp(0, u64::MAX as i128) as u64
        };

        let moved: Vec<RawCue> = self
            .cues
            .iter()
            .filter_map(|cue| {
                let end_ms = shift(cue.end_ms);
                if end_ms == 0 {
                    return None;
                }
                Some((shift(cue.start_ms), end_ms, cue.text.clone()))
            })
            .collect();

        let clamped_to_zero = moved.iter().filter(|(start, _, _)| *start == 0).count();
        let cues = if clamped_to_zero > 1 { coalesce(moved) } else { moved };

        Self {
            cues: into_cues(cues),
            ..self.clone_metadata()
        }
    }

    /// Combine the cues of two tracks of the same video.
    ///
    /// The result stays non-overlapping: cues sharing a start are joined
    /// (text of `self` first) and a cue running into the next one is cut at
    /// the next start. The merged track keeps the metadata of `self`.
    pub fn merged(&self, other: &Track) -> Result<Self, ExportError> {
        if self.video_id != other.video_id {
            return Err(ExportError::InvalidCue {
                index: 0,
                reason: format!(
                    "cannot merge tracks of different videos ({} and {})",
                    self.video_id, other.video_id
                ),
            });
        }

        let mut cues: Vec<RawCue> = self
            .cues
            .iter()
            .chain(other.cues.iter())
            .map(|cue| (cue.start_ms, cue.end_ms, cue.text.clone()))
            .collect();
        cues.sort_by_key(|(start, _, _)| *start);

        Ok(Self {
            cues: into_cues(coalesce(cues)),
            ..self.clone_metadata()
        })
    }

    fn clone_metadata(&self) -> Self {
        Self::empty(self.video_id.clone(), self.language_code.clone(), self.source)
    }
}

fn into_cues(raw: Vec<RawCue>) -> Vec<Cue> {
    raw.into_iter()
        .map(|(start_ms, end_ms, text)| Cue { start_ms, end_ms, text })
        .collect()
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}] {} cues",
            self.video_id,
            self.language_code,
            self.source,
            self.cues.len()
        )
    }
}
