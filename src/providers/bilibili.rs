use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use reqwest::header::{COOKIE, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::app_config::AcquisitionConfig;
use crate::errors::ProviderError;
use crate::providers::{CaptionFetcher, CaptionPayload, PayloadCue, PayloadTrack};

// Business code the API uses when a client is being throttled
const CODE_RATE_LIMITED: i64 = -412;

/// Bilibili web API client
///
/// Resolves a video identity (`BV…` or `av…`, optionally suffixed `-pN`
/// for multi-part videos) to its caption payload in three steps: the view
/// endpoint gives the part's `cid`, the player endpoint lists subtitle
/// tracks, and each track's body is downloaded from its subtitle URL.
#[derive(Debug, Clone)]
pub struct BilibiliFetcher {
    /// Base URL of the API, e.g. `https://api.bilibili.com`
    api_base: String,
    /// HTTP client for making requests
    client: Client,
    /// Value of the `User-Agent` header
    user_agent: String,
    /// Optional `Cookie` header; subtitle lists require a logged-in session
    session_cookie: Option<String>,
}

/// Standard response envelope of the web API
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ViewData {
    bvid: String,
    #[serde(default)]
    pages: Vec<ViewPage>,
}

#[derive(Debug, Deserialize)]
struct ViewPage {
    cid: u64,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct PlayerData {
    #[serde(default)]
    subtitle: Option<PlayerSubtitles>,
}

#[derive(Debug, Deserialize)]
struct PlayerSubtitles {
    #[serde(default)]
    subtitles: Vec<SubtitleEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    lan: String,
    #[serde(default)]
    lan_doc: String,
    #[serde(default)]
    subtitle_url: String,
    #[serde(default)]
    ai_type: i64,
}

#[derive(Debug, Deserialize)]
struct SubtitleBody {
    #[serde(default)]
    body: Vec<PayloadCue>,
}

/// Parsed form of a video identity
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VideoRef {
    /// Query parameter for the view endpoint, `bvid=…` or `aid=…`
    pub query: (String, String),
    /// 1-based part number
    pub page: u32,
}

impl VideoRef {
    pub(crate) fn parse(video_id: &str) -> Result<Self, ProviderError> {
        let (base, page) = match video_id.rsplit_once("-p") {
            Some((base, page)) => {
                let page = page
                    .parse::<u32>()
                    .map_err(|_| ProviderError::InvalidVideoId(video_id.to_string()))?;
                (base, page.max(1))
            }
            None => (video_id, 1),
        };

        let prefix = base.get(..2).unwrap_or_default();
        let rest = base.get(2..).unwrap_or_default();

        if prefix.eq_ignore_ascii_case("bv") && !rest.is_empty() {
            Ok(Self { query: ("bvid".to_string(), base.to_string()), page })
        } else if prefix.eq_ignore_ascii_case("av") && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self { query: ("aid".to_string(), rest.to_string()), page })
        } else {
            Err(ProviderError::InvalidVideoId(video_id.to_string()))
        }
    }
}

impl BilibiliFetcher {
    /// Create a client from the acquisition settings
    pub fn new(config: &AcquisitionConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_base: config.api_endpoint.trim_end_matches('/').to_string(),
            client,
            user_agent: config.user_agent.clone(),
            session_cookie: config.session_cookie.clone().filter(|c| !c.is_empty()),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, ProviderError> {
        let mut request = self
            .client
            .get(url)
            .query(query)
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, "https://www.bilibili.com/");
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded(format!("HTTP 429 from {}", url)));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_api<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.api_base, path);
        let envelope: Envelope<T> = self.get_json(&url, query).await?;

        match envelope.code {
            0 => envelope
                .data
                .ok_or_else(|| ProviderError::ParseError(format!("Missing data in response from {}", path))),
            CODE_RATE_LIMITED => Err(ProviderError::RateLimitExceeded(envelope.message)),
            code => Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("code {}: {}", code, envelope.message),
            }),
        }
    }

    async fn resolve(&self, video: &VideoRef) -> Result<(String, u64), ProviderError> {
        let (key, value) = &video.query;
        let view: ViewData = self
            .get_api("/x/web-interface/view", &[(key.as_str(), value.as_str())])
            .await?;

        let cid = view
            .pages
            .iter()
            .find(|page| page.page == video.page)
            .map(|page| page.cid)
            .ok_or_else(|| ProviderError::InvalidVideoId(format!("{} has no part {}", view.bvid, video.page)))?;

        Ok((view.bvid, cid))
    }

    async fn fetch_track(&self, entry: SubtitleEntry) -> Result<PayloadTrack, ProviderError> {
        let url = if entry.subtitle_url.starts_with("//") {
            format!("https:{}", entry.subtitle_url)
        } else {
            entry.subtitle_url.clone()
        };
        let body: SubtitleBody = self.get_json(&url, &[]).await?;

        Ok(PayloadTrack {
            ai: entry.ai_type != 0,
            lan: entry.lan,
            lan_doc: entry.lan_doc,
            unit: Some("seconds".to_string()),
            fps: None,
            body: body.body,
        })
    }
}

#[async_trait]
impl CaptionFetcher for BilibiliFetcher {
    async fn fetch_caption_payload(&self, video_id: &str) -> Result<Bytes, ProviderError> {
        let video = VideoRef::parse(video_id)?;
        let (bvid, cid) = self.resolve(&video).await?;
        let cid = cid.to_string();

        debug!("Resolved {} to bvid {} cid {}", video_id, bvid, cid);

        let player: PlayerData = self
            .get_api("/x/player/v2", &[("bvid", bvid.as_str()), ("cid", cid.as_str())])
            .await?;
        let entries = player.subtitle.map(|s| s.subtitles).unwrap_or_default();

        let mut tracks = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.subtitle_url.is_empty() {
                warn!("Skipping {} track of {} without subtitle URL", entry.lan, video_id);
                continue;
            }
            tracks.push(self.fetch_track(entry).await?);
        }

        let payload = CaptionPayload {
            video_id: video_id.to_string(),
            tracks,
        };
        Ok(Bytes::from(serde_json::to_vec(&payload)?))
    }
}
