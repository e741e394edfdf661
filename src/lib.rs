/*!
 * # bilisub - Bilibili caption exporter
 *
 * A Rust library for acquiring the caption tracks of Bilibili videos and
 * exporting them in common subtitle formats.
 *
 * ## Features
 *
 * - Acquire caption tracks from the Bilibili web API, with bounded retries
 * - Normalize cue timing (seconds, milliseconds or frames) to milliseconds
 * - Export as SRT, WebVTT, plain transcript, timed transcript or JSON
 * - Follow client-side navigation between videos with a debounced watcher
 * - Share one acquisition between concurrent export requests
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `track`: Cue and track model
 * - `timestamp`: Timestamp decomposition, formatting and timing units
 * - `formats`: Encoders (and SRT/WebVTT parsers):
 *   - `formats::srt`, `formats::vtt`, `formats::text`, `formats::json`
 * - `providers`: Caption fetchers:
 *   - `providers::bilibili`: Bilibili web API client
 *   - `providers::mock`: Scriptable fetcher for tests
 * - `acquisition`: Track selection, timing normalization and cue repair
 * - `navigation`: Debounced video identity watcher and URL helpers
 * - `cache`: Per-session track cache
 * - `export`: Export orchestration
 * - `app_controller`: Host-facing facade
 * - `app_config`: Configuration management
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod acquisition;
pub mod app_config;
pub mod app_controller;
pub mod cache;
pub mod errors;
pub mod export;
pub mod file_utils;
pub mod formats;
pub mod language_utils;
pub mod navigation;
pub mod providers;
pub mod timestamp;
pub mod track;

// Re-export main types for easier usage
pub use acquisition::{AcquisitionAdapter, TrackInfo};
pub use app_config::Config;
pub use app_controller::CaptionExporter;
pub use errors::{ExportError, ProviderError};
pub use export::{ExportArtifact, ExportOrchestrator, ExportRequest};
pub use formats::ExportFormat;
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use navigation::{video_id_from_url, IdentityProbe, NavigationWatcher, VideoChanged};
pub use providers::CaptionFetcher;
pub use track::{Cue, RawCue, Track, TrackSource};
