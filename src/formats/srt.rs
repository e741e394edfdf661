//! SRT: numbered cues, `HH:MM:SS,mmm --> HH:MM:SS,mmm`, blank line between cues.

use std::fmt::Write;

use anyhow::Result;

use super::{cue_lines, ensure_not_empty, parse_cue_blocks, split_blocks, ExportFormat};
use crate::errors::ExportError;
use crate::timestamp;
use crate::track::{Cue, Track};

/// Render a track as SRT. Indices run from 1 without gaps.
pub fn encode(track: &Track) -> Result<String, ExportError> {
    ensure_not_empty(track, ExportFormat::Srt)?;

    let mut out = String::new();
    for (i, cue) in track.cues().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        // Writing into a String cannot fail
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            timestamp::format_srt(cue.start_ms),
            timestamp::format_srt(cue.end_ms)
        );
        for line in cue_lines(&cue.text) {
            out.push_str(line);
            out.push('\n');
        }
    }

    Ok(out)
}

/// Parse SRT content into cues, in file order
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let content = content.trim_start_matches('\u{feff}');
    let blocks = split_blocks(content);
    parse_cue_blocks(blocks.iter().map(String::as_str), |id| id.parse::<usize>().is_ok())
}
