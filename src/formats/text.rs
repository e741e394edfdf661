//! Transcript renderings. Both are lossy: there is no way back to cues.

use super::{ensure_not_empty, ExportFormat};
use crate::errors::ExportError;
use crate::timestamp;
use crate::track::{Cue, Track};

/// One cue per line, no timing, no numbering
pub fn encode_plain(track: &Track) -> Result<String, ExportError> {
    ensure_not_empty(track, ExportFormat::PlainText)?;

    Ok(render(track, |_, line| line))
}

/// Like [`encode_plain`] with each line prefixed by `[HH:MM:SS]` of the cue start
pub fn encode_timed(track: &Track) -> Result<String, ExportError> {
    ensure_not_empty(track, ExportFormat::TimedText)?;

    Ok(render(track, |cue, line| {
        format!("[{}] {}", timestamp::format_clock(cue.start_ms), line)
    }))
}

fn render<F, S>(track: &Track, decorate: F) -> String
where
    F: Fn(&Cue, String) -> S,
    S: AsRef<str>,
{
    let mut out = String::new();
    for cue in track.cues() {
        let line = decorate(cue, single_line(&cue.text));
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

// Multi-line cues are folded so the transcript keeps one line per cue
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
