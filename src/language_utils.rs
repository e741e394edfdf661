//! Language utilities for caption track language tags
//!
//! Caption sources label tracks with tags like `zh-CN`, `en-US`, `ai-zh`
//! or plain ISO 639 codes. These helpers reduce a tag to its primary
//! language so that a caller asking for `zh` finds a `zh-Hans` track.

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Primary language subtag of a tag, lowercased.
///
/// The machine-generated prefix `ai-` is skipped: `ai-zh` → `zh`,
/// `zh-CN` → `zh`, `en_US` → `en`.
pub fn primary_subtag(tag: &str) -> String {
    let lowered = tag.trim().to_lowercase();
    let without_ai = lowered.strip_prefix("ai-").unwrap_or(&lowered);
    without_ai
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Normalize a language tag to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let primary = primary_subtag(code);

    if primary.len() == 2 {
        if let Some(lang) = Language::from_639_1(&primary) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if primary.len() == 3 {
        if Language::from_639_3(&primary).is_some() {
            return Ok(primary);
        }
        if let Some((_, part2t)) = PART2B_TO_PART2T.iter().find(|(part2b, _)| *part2b == primary) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language tags name the same language.
///
/// Exact (case-insensitive) matches always match; otherwise the primary
/// languages are compared after ISO 639 normalization, so `zh`, `zho`,
/// `chi` and `zh-CN` are all equivalent.
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    if code1.trim().eq_ignore_ascii_case(code2.trim()) {
        return true;
    }

    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => primary_subtag(code1) == primary_subtag(code2) && !primary_subtag(code1).is_empty(),
    }
}

/// Get the English language name from a tag
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
