/*!
 * Millisecond timestamp arithmetic shared by every encoder and parser.
 *
 * All formats render times through [`decompose`] so that SRT, WebVTT and the
 * timed transcript can never drift apart.
 */

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// A millisecond offset split into clock components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub millis: u64,
}

/// Split a millisecond offset into hours, minutes, seconds and milliseconds.
///
/// Hours are not wrapped at 24.
pub fn decompose(ms: u64) -> Clock {
    Clock {
        hours: ms / MS_PER_HOUR,
        minutes: (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        seconds: (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        millis: ms % MS_PER_SECOND,
    }
}

/// Format as `HH:MM:SS,mmm` (SRT)
pub fn format_srt(ms: u64) -> String {
    format_with_separator(ms, ',')
}

/// Format as `HH:MM:SS.mmm` (WebVTT)
pub fn format_vtt(ms: u64) -> String {
    format_with_separator(ms, '.')
}

/// Format as `HH:MM:SS`, dropping the millisecond part
pub fn format_clock(ms: u64) -> String {
    let c = decompose(ms);
    format!("{:02}:{:02}:{:02}", c.hours, c.minutes, c.seconds)
}

fn format_with_separator(ms: u64, separator: char) -> String {
    let c = decompose(ms);
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        c.hours, c.minutes, c.seconds, separator, c.millis
    )
}

/// Parse `HH:MM:SS,mmm`, `HH:MM:SS.mmm` or `MM:SS.mmm` back into milliseconds
pub fn parse(timestamp: &str) -> Result<u64> {
    let timestamp = timestamp.trim();
    let (clock, millis) = timestamp
        .rsplit_once([',', '.'])
        .ok_or_else(|| anyhow!("Missing millisecond separator in timestamp: {}", timestamp))?;

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return Err(anyhow!("Invalid timestamp format: {}", timestamp)),
    };

    let hours: u64 = hours.parse().context("Failed to parse hours")?;
    let minutes: u64 = minutes.parse().context("Failed to parse minutes")?;
    let seconds: u64 = seconds.parse().context("Failed to parse seconds")?;
    if millis.len() != 3 {
        return Err(anyhow!("Milliseconds must have three digits: {}", timestamp));
    }
    let millis: u64 = millis.parse().context("Failed to parse milliseconds")?;

    if minutes >= 60 || seconds >= 60 {
        return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
    }

    hours
        .checked_mul(MS_PER_HOUR)
        .and_then(|ms| ms.checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis))
        .ok_or_else(|| anyhow!("Timestamp out of range: {}", timestamp))
}

/// Unit in which a caption source expresses cue times
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "unit")]
pub enum TimingUnit {
    /// Fractional seconds, e.g. `12.345`
    #[default]
    Seconds,
    /// Milliseconds, usually integral
    Milliseconds,
    /// Frame counts at a fixed frame rate
    Frames { fps: f64 },
}

impl TimingUnit {
    /// Convert a raw value to whole milliseconds.
    ///
    /// Rounds to the nearest millisecond with ties going to the even
    /// neighbour, so converting the same value twice is stable.
    pub fn to_millis(&self, value: f64) -> Result<u64> {
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow!("Invalid cue time {}", value));
        }

        let ms = match self {
            Self::Seconds => value * 1_000.0,
            Self::Milliseconds => value,
            Self::Frames { fps } => {
                if !fps.is_finite() || *fps <= 0.0 {
                    return Err(anyhow!("Invalid frame rate {}", fps));
                }
                value * 1_000.0 / fps
            }
        };

        let rounded = ms.round_ties_even();
        if rounded > u64::MAX as f64 {
            return Err(anyhow!("Cue time {} out of range", value));
        }
        Ok(rounded as u64)
    }
}
