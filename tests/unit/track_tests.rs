/*!
 * Tests for the cue and track model
 */

use bilisub::{ExportError, Track, TrackSource};

use crate::common::{track_of, VIDEO_A, VIDEO_B};

fn raw(cues: &[(u64, u64, &str)]) -> Vec<(u64, u64, String)> {
    cues.iter().map(|(s, e, t)| (*s, *e, t.to_string())).collect()
}

#[test]
fn test_fromRaw_withReversedCue_shouldReportInputIndex() {
    let result = Track::from_raw(
        VIDEO_A,
        "en",
        TrackSource::Native,
        raw(&[(0, 1_000, "ok"), (500, 900, "ok"), (2_000, 1_000, "reversed")]),
    );

    match result {
        Err(ExportError::InvalidCue { index, .. }) => assert_eq!(index, 2),
        other => panic!("expected InvalidCue, got {:?}", other),
    }
}

#[test]
fn test_fromRaw_withBlankText_shouldBeInvalidCue() {
    let result = Track::from_raw(VIDEO_A, "en", TrackSource::Native, raw(&[(0, 1_000, " \n ")]));
    assert!(matches!(result, Err(ExportError::InvalidCue { index: 0, .. })));
}

#[test]
fn test_fromRaw_withTiedStarts_shouldKeepInputOrder() {
    let track = track_of(&[(1_000, 2_000, "later"), (0, 500, "b"), (0, 900, "a")]);
    let texts: Vec<&str> = track.cues().iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["b", "a", "later"]);
}

#[test]
fn test_accessors_shouldExposeMetadata() {
    let track = track_of(&[(0, 1_000, "a"), (500, 4_000, "b"), (1_000, 2_000, "c")]);

    assert_eq!(track.video_id(), VIDEO_A);
    assert_eq!(track.language_code(), "en-US");
    assert_eq!(track.source(), TrackSource::Native);
    assert_eq!(track.len(), 3);
    assert!(!track.is_empty());
    assert_eq!(track.duration_ms(), 4_000);
}

#[test]
fn test_shifted_withNegativeOffset_shouldDropAndClamp() {
    let track = track_of(&[(0, 1_000, "gone"), (500, 2_000, "clamped"), (3_000, 4_000, "moved")]);
    let shifted = track.shifted(-1_000);

    assert_eq!(shifted.len(), 2);
    assert_eq!((shifted.cues()[0].start_ms, shifted.cues()[0].end_ms), (0, 1_000));
    assert_eq!((shifted.cues()[1].start_ms, shifted.cues()[1].end_ms), (2_000, 3_000));
    // The original is untouched
    assert_eq!(track.len(), 3);
}

#[test]
fn test_merged_withSameVideo_shouldInterleaveStably() {
    let first = track_of(&[(0, 1_000, "first-a"), (2_000, 3_000, "first-b")]);
    let second = track_of(&[(0, 800, "second-a"), (1_000, 1_500, "second-b")]);

    let merged = first.merged(&second).unwrap();
    let texts: Vec<&str> = merged.cues().iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first-a\nsecond-a", "second-b", "first-b"]);
}

#[test]
fn test_merged_withOverlappingCues_shouldStayNonOverlapping() {
    let first = track_of(&[(0, 3_000, "long"), (5_000, 6_000, "tail")]);
    let second = track_of(&[(1_000, 2_000, "inside"), (5_500, 7_000, "late")]);

    let merged = first.merged(&second).unwrap();
    let spans: Vec<(u64, u64)> = merged.cues().iter().map(|c| (c.start_ms, c.end_ms)).collect();
    assert_eq!(spans, vec![(0, 1_000), (1_000, 2_000), (5_000, 5_500), (5_500, 7_000)]);
    assert!(merged.cues().windows(2).all(|pair| pair[0].end_ms <= pair[1].start_ms));
}

#[test]
fn test_fromRaw_withIndentedAndBlankLines_shouldStoreCanonicalText() {
    let track = track_of(&[(0, 1_000, "  - speaker A\n\nsecond para  ")]);
    assert_eq!(track.cues()[0].text, "- speaker A\nsecond para");
}

#[test]
fn test_shifted_withCuesClampedToZero_shouldCoalesce() {
    let track = track_of(&[(100, 2_000, "a"), (400, 3_000, "b"), (5_000, 6_000, "c")]);
    let shifted = track.shifted(-500);

    let cues: Vec<(u64, u64, &str)> = shifted
        .cues()
        .iter()
        .map(|c| (c.start_ms, c.end_ms, c.text.as_str()))
        .collect();
    assert_eq!(cues, vec![(0, 2_500, "a\nb"), (4_500, 5_500, "c")]);
}

#[test]
fn test_merged_withDifferentVideos_shouldFail() {
    let first = track_of(&[(0, 1_000, "a")]);
    let second = Track::from_raw(VIDEO_B, "en", TrackSource::Native, raw(&[(0, 1_000, "b")])).unwrap();

    assert!(matches!(first.merged(&second), Err(ExportError::InvalidCue { .. })));
}

#[test]
fn test_empty_shouldHaveNoCues() {
    let track = Track::empty(VIDEO_A, "en", TrackSource::MachineGenerated);
    assert!(track.is_empty());
    assert_eq!(track.duration_ms(), 0);
}
