/*!
 * Tests for the export encoders and the SRT/WebVTT parsers
 */

use bilisub::formats::{self, json, srt, text, vtt, ExportFormat};
use bilisub::{ExportError, Track, TrackSource};

use crate::common::{rich_track, track_of, VIDEO_A};

#[test]
fn test_srt_shouldNumberCuesFromOne() {
    let output = srt::encode(&rich_track()).unwrap();
    let expected = "1\n00:00:00,000 --> 00:00:01,500\nHello everyone\n\n\
                    2\n00:00:01,500 --> 00:00:03,250\nTwo lines\nof text\n\n\
                    3\n00:01:01,234 --> 00:01:02,000\nFish & chips <cheap>\n\n\
                    4\n01:00:00,000 --> 01:00:01,001\nAn hour in\n";
    assert_eq!(output, expected);
}

#[test]
fn test_vtt_shouldStartWithHeaderAndEscapeMarkup() {
    let output = vtt::encode(&rich_track()).unwrap();

    assert!(output.starts_with("WEBVTT\n\n00:00:00.000 --> 00:00:01.500\nHello everyone\n"));
    assert!(output.contains("Fish &amp; chips &lt;cheap&gt;"));
    assert!(!output.lines().any(|line| line == "1"));
}

#[test]
fn test_vtt_withArrowInText_shouldNotProduceTimingLine() {
    let track = track_of(&[(0, 1_000, "a --> b")]);
    let output = vtt::encode(&track).unwrap();

    assert!(output.contains("a --&gt; b"));
    let cues = vtt::parse(&output).unwrap();
    assert_eq!(cues[0].text, "a --> b");
}

#[test]
fn test_plainText_shouldFoldLinesAndDropTiming() {
    let output = text::encode_plain(&rich_track()).unwrap();
    assert_eq!(
        output,
        "Hello everyone\nTwo lines of text\nFish & chips <cheap>\nAn hour in\n"
    );
}

#[test]
fn test_timedText_shouldPrefixCueStart() {
    let output = text::encode_timed(&rich_track()).unwrap();
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines[0], "[00:00:00] Hello everyone");
    assert_eq!(lines[2], "[00:01:01] Fish & chips <cheap>");
    assert_eq!(lines[3], "[01:00:00] An hour in");
}

#[test]
fn test_json_shouldMirrorTheModel() {
    let output = json::encode(&rich_track()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(value["video_id"], VIDEO_A);
    assert_eq!(value["language"], "en-US");
    assert_eq!(value["source"], "native");
    assert_eq!(value["cues"][2]["start_ms"], 61_234);
    assert_eq!(value["cues"][1]["text"], "Two lines\nof text");
}

#[test]
fn test_emptyTrack_shouldOnlyRenderAsJson() {
    let empty = Track::empty(VIDEO_A, "en", TrackSource::Native);

    for format in ExportFormat::ALL {
        let result = formats::encode(&empty, format);
        if format == ExportFormat::RawJson {
            let value: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
            assert_eq!(value["cues"], serde_json::json!([]));
        } else {
            assert_eq!(result, Err(ExportError::EmptyTrack { format }));
        }
    }
}

#[test]
fn test_encoders_shouldBeDeterministic() {
    let track = rich_track();
    for format in ExportFormat::ALL {
        assert_eq!(formats::encode(&track, format), formats::encode(&track, format));
    }
}

#[test]
fn test_srtParse_shouldSkipMalformedBlocks() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nGood\n\n\
                   2\nnot a timing line\nBad\n\n\
                   3\n00:00:03,000 --> 00:00:04,000\nAlso good\n";
    let cues = srt::parse(content).unwrap();

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[1].text, "Also good");
}

#[test]
fn test_srtParse_withHugeTimestamp_shouldFail() {
    let content = "1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nToo late\n";
    assert!(srt::parse(content).is_err());
}

#[test]
fn test_srtParse_withEndBeforeStart_shouldSkipBlock() {
    let content = "1\n00:00:05,000 --> 00:00:02,000\nBackwards\n\n\
                   2\n00:00:06,000 --> 00:00:07,000\nForwards\n";
    let cues = srt::parse(content).unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "Forwards");
    assert_eq!(cues[0].duration_ms(), 1_000);
}

#[test]
fn test_vttParse_withoutSignature_shouldFail() {
    assert!(vtt::parse("00:00:01.000 --> 00:00:02.000\nHi\n").is_err());
}

#[test]
fn test_vttParse_shouldSkipNotesAndSettings() {
    let content = "WEBVTT - captions\n\nNOTE exported\n\nintro\n00:01.000 --> 00:02.000 align:start\nHi\n";
    let cues = vtt::parse(content).unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!((cues[0].start_ms, cues[0].end_ms), (1_000, 2_000));
}

#[test]
fn test_exportFormat_shouldExposeFileMetadata() {
    assert_eq!(ExportFormat::Srt.extension(), "srt");
    assert_eq!(ExportFormat::Srt.mime_type(), "application/x-subrip");
    assert_eq!(ExportFormat::Vtt.mime_type(), "text/vtt");
    assert_eq!(ExportFormat::PlainText.extension(), "txt");
    assert_eq!(ExportFormat::TimedText.extension(), "timed.txt");
    assert_eq!(ExportFormat::TimedText.mime_type(), "text/plain");
    assert_eq!(ExportFormat::RawJson.mime_type(), "application/json");
    assert_eq!("vtt".parse::<ExportFormat>().unwrap(), ExportFormat::Vtt);
    assert!("docx".parse::<ExportFormat>().is_err());
}
