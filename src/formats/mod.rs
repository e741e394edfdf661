/*!
 * Format encoders.
 *
 * Every encoder is a pure function from a [`Track`] to text: the same track
 * always renders to byte-identical output. All encoders except RawJSON refuse
 * an empty track with `EmptyTrack`, since a human-readable file without cues
 * has no meaningful rendering while JSON consumers still expect structure.
 *
 * - `srt`: sequence-numbered, comma-millisecond timestamps
 * - `vtt`: `WEBVTT` header, period-millisecond timestamps
 * - `text`: plain and timestamped transcripts
 * - `json`: structured dump of the track
 */

use anyhow::{anyhow, Result};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ExportError;
use crate::timestamp;
use crate::track::{Cue, Track};

pub mod json;
pub mod srt;
pub mod text;
pub mod vtt;

/// Target format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Srt,
    Vtt,
    #[serde(rename = "txt")]
    PlainText,
    #[serde(rename = "timed")]
    TimedText,
    #[serde(rename = "json")]
    RawJson,
}

impl ExportFormat {
    /// All formats in menu order
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Srt,
        ExportFormat::Vtt,
        ExportFormat::PlainText,
        ExportFormat::TimedText,
        ExportFormat::RawJson,
    ];

    // @returns: File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::PlainText => "txt",
            Self::TimedText => "timed.txt",
            Self::RawJson => "json",
        }
    }

    // @returns: MIME type handed to the download collaborator
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Srt => "application/x-subrip",
            Self::Vtt => "text/vtt",
            Self::PlainText | Self::TimedText => "text/plain",
            Self::RawJson => "application/json",
        }
    }

    // @returns: Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Srt => "SRT",
            Self::Vtt => "WebVTT",
            Self::PlainText => "Plain text",
            Self::TimedText => "Text with timestamps",
            Self::RawJson => "Raw JSON",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            "txt" | "text" | "plain" => Ok(Self::PlainText),
            "timed" | "timed.txt" | "timedtext" => Ok(Self::TimedText),
            "json" | "raw" => Ok(Self::RawJson),
            _ => Err(anyhow!("Invalid export format: {}", s)),
        }
    }
}

/// Render `track` in `format`
pub fn encode(track: &Track, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Srt => srt::encode(track),
        ExportFormat::Vtt => vtt::encode(track),
        ExportFormat::PlainText => text::encode_plain(track),
        ExportFormat::TimedText => text::encode_timed(track),
        ExportFormat::RawJson => json::encode(track),
    }
}

pub(crate) fn ensure_not_empty(track: &Track, format: ExportFormat) -> Result<(), ExportError> {
    if track.is_empty() {
        return Err(ExportError::EmptyTrack { format });
    }
    Ok(())
}

/// Lines of a cue's text as written by the timed formats.
///
/// Track text is already canonical (see [`crate::track::canonical_text`]);
/// the filter only guards cues built by hand.
pub(crate) fn cue_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

// @const: Cue timing line shared by SRT and WebVTT; trailing cue settings allowed
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\d+:)?\d{2}:\d{2}[,.]\d{3})\s+-->\s+((?:\d+:)?\d{2}:\d{2}[,.]\d{3})(?:\s.*)?$")
        .expect("timing regex is valid")
});

/// Parse blank-line separated cue blocks of the form
/// `[identifier]`, `start --> end`, `text...`.
///
/// `accept_identifier` decides whether a line before the timing line is
/// acceptable. Malformed blocks are skipped with a warning.
pub(crate) fn parse_cue_blocks<'a, I>(blocks: I, accept_identifier: fn(&str) -> bool) -> Result<Vec<Cue>>
where
    I: Iterator<Item = &'a str>,
{
    let mut cues = Vec::new();

    for (block_index, block) in blocks.enumerate() {
        let lines: Vec<&str> = block.lines().map(str::trim_end).collect();

        let timing_at = match lines.iter().position(|line| line.contains("-->")) {
            Some(0) => 0,
            Some(1) if accept_identifier(lines[0].trim()) => 1,
            _ => {
                warn!("Skipping cue block {} without a timing line", block_index + 1);
                continue;
            }
        };

        let Some(caps) = TIMING_REGEX.captures(lines[timing_at].trim()) else {
            warn!("Skipping cue block {} with malformed timing: {}", block_index + 1, lines[timing_at]);
            continue;
        };
        let start_ms = timestamp::parse(&caps[1])?;
        let end_ms = timestamp::parse(&caps[2])?;
        if end_ms < start_ms {
            warn!("Skipping cue block {} ending before it starts: {}", block_index + 1, lines[timing_at]);
            continue;
        }

        let text = lines[timing_at + 1..]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            warn!("Skipping cue block {} without text", block_index + 1);
            continue;
        }

        cues.push(Cue { start_ms, end_ms, text });
    }

    Ok(cues)
}

/// Split content into cue blocks on blank lines, normalizing line endings
pub(crate) fn split_blocks(content: &str) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}
