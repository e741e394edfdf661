//! WebVTT: `WEBVTT` header, period-millisecond timestamps, no cue numbers.

use anyhow::{anyhow, Result};

use super::{cue_lines, ensure_not_empty, parse_cue_blocks, split_blocks, ExportFormat};
use crate::errors::ExportError;
use crate::timestamp;
use crate::track::{Cue, Track};

const HEADER: &str = "WEBVTT";

/// Render a track as WebVTT
pub fn encode(track: &Track) -> Result<String, ExportError> {
    ensure_not_empty(track, ExportFormat::Vtt)?;

    let mut out = String::from(HEADER);
    out.push_str("\n\n");

    for (i, cue) in track.cues().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&timestamp::format_vtt(cue.start_ms));
        out.push_str(" --> ");
        out.push_str(&timestamp::format_vtt(cue.end_ms));
        out.push('\n');
        for line in cue_lines(&cue.text) {
            out.push_str(&escape(line));
            out.push('\n');
        }
    }

    Ok(out)
}

/// Parse WebVTT content into cues.
///
/// `NOTE`, `STYLE` and `REGION` blocks are skipped, cue identifiers and cue
/// settings are accepted and ignored.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let content = content.trim_start_matches('\u{feff}');
    let blocks = split_blocks(content);

    let header = blocks.first().ok_or_else(|| anyhow!("Empty WebVTT document"))?;
    let signature = header.lines().next().unwrap_or_default();
    if signature != HEADER && !signature.starts_with("WEBVTT ") && !signature.starts_with("WEBVTT\t") {
        return Err(anyhow!("Missing WEBVTT signature"));
    }

    let cue_blocks = blocks[1..].iter().map(String::as_str).filter(|block| {
        !(block.starts_with("NOTE") || block.starts_with("STYLE") || block.starts_with("REGION"))
    });

    let mut cues = parse_cue_blocks(cue_blocks, |id| !id.is_empty())?;
    for cue in &mut cues {
        cue.text = unescape(&cue.text);
    }
    Ok(cues)
}

fn escape(line: &str) -> String {
    line.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
