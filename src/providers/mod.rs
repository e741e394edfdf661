/*!
 * Caption sources.
 *
 * The core never talks to the network itself. It is handed a
 * [`CaptionFetcher`] and only relies on the payload schema below:
 * - `bilibili`: reqwest client for the public Bilibili web API
 * - `mock`: scripted fetcher for tests and offline use
 */

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Capability to retrieve the raw caption payload of a video
///
/// Implementations return the serialized [`CaptionPayload`] for `video_id`.
/// They are injected into the acquisition adapter and must not cache.
#[async_trait]
pub trait CaptionFetcher: Send + Sync + Debug {
    /// Fetch the caption payload for a video
    ///
    /// # Arguments
    /// * `video_id` - Opaque site identifier of the video
    ///
    /// # Returns
    /// * `Result<Bytes, ProviderError>` - JSON payload bytes or a transport error
    async fn fetch_caption_payload(&self, video_id: &str) -> Result<Bytes, ProviderError>;
}

/// Caption payload listing every track of a video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionPayload {
    /// Identifier the payload was produced for
    pub video_id: String,

    /// Available tracks, in the order the site lists them
    #[serde(default)]
    pub tracks: Vec<PayloadTrack>,
}

/// One caption track as delivered by the source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadTrack {
    /// Language tag, e.g. `zh-CN` or `ai-zh`
    pub lan: String,

    /// Display name of the language
    #[serde(default)]
    pub lan_doc: String,

    /// Whether the track was produced by speech recognition
    #[serde(default)]
    pub ai: bool,

    /// Declared timing unit (`seconds`, `milliseconds` or `frames`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Frame rate, required when `unit` is `frames`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,

    /// Cue list
    #[serde(default)]
    pub body: Vec<PayloadCue>,
}

impl PayloadTrack {
    /// Machine-generated either by flag or by the `ai-` language prefix
    pub fn is_machine_generated(&self) -> bool {
        self.ai || self.lan.to_lowercase().starts_with("ai-")
    }
}

/// One raw cue; times are in the track's timing unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadCue {
    pub from: f64,
    pub to: f64,
    pub content: String,
}

pub mod bilibili;
pub mod mock;
