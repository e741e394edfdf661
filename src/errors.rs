/*!
 * Error types for the bilisub library.
 *
 * `ProviderError` describes what went wrong while talking to the caption
 * source, `ExportError` is the signal taxonomy every public operation of the
 * core surfaces to its caller. Both are `Clone` so that a single acquisition
 * result can be handed to every request waiting on it.
 */

use thiserror::Error;

use crate::formats::ExportFormat;

/// Errors that can occur when fetching caption payloads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The video identity cannot be resolved by this source
    #[error("Invalid video id: {0}")]
    InvalidVideoId(String),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport hiccups, server errors, rate limiting and malformed
    /// (often truncated) payloads are transient. Client errors and
    /// unresolvable identities will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_)
            | Self::ParseError(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::InvalidVideoId(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::ApiError {
                status_code: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::ParseError(error.to_string())
    }
}

/// Signals surfaced by the export core.
///
/// Nothing in the core catches and hides one of these; the UI layer decides
/// how each is presented.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    /// A raw cue could not be turned into a valid cue
    #[error("Invalid cue at index {index}: {reason}")]
    InvalidCue {
        /// Position of the offending cue in the input list
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// The video exposes no caption tracks at all
    #[error("No captions available for video {video_id}")]
    NoCaptionsAvailable {
        /// Site identifier of the video
        video_id: String,
    },

    /// Transport or payload failure while acquiring captions
    #[error("Caption acquisition failed: {cause}")]
    Acquisition {
        /// The last failure reported by the caption source
        cause: ProviderError,
    },

    /// The chosen format has no rendering for a track without cues
    #[error("Track has no cues to render as {format}")]
    EmptyTrack {
        /// Format that was requested
        format: ExportFormat,
    },

    /// The track could not be serialized
    #[error("Failed to serialize track: {0}")]
    Serialization(String),

    /// An export was requested before any video was detected
    #[error("No active video on the page")]
    NoActiveVideo,
}

impl ExportError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Acquisition { cause } if cause.is_transient())
    }

    /// Whether this is the normal "this video has no captions" outcome.
    pub fn is_expected_absence(&self) -> bool {
        matches!(self, Self::NoCaptionsAvailable { .. })
    }
}

impl From<ProviderError> for ExportError {
    fn from(cause: ProviderError) -> Self {
        Self::Acquisition { cause }
    }
}
