/*!
 * Navigation watching.
 *
 * The host site is a single-page application: moving to another video
 * swaps the page content without a reload, and the identity read from
 * the page flickers through empty or partial values while it does. The
 * watcher turns those raw observations into one `VideoChanged` per real
 * transition by requiring a new identity to stay stable for a debounce
 * window before it is reported.
 */

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

static BV_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i:bv)[0-9A-Za-z]{10}$").expect("BV regex is valid"));

static AV_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i:av)\d+$").expect("av regex is valid"));

static PART_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)-p(\d+)$").expect("part regex is valid"));

/// The active video identity changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoChanged(pub String);

/// Source of the raw video identity of the page
pub trait IdentityProbe: Send + Sync {
    /// Identity of the video currently shown, if one can be read
    fn detect_video_identity(&self) -> Option<String>;
}

impl<F> IdentityProbe for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn detect_video_identity(&self) -> Option<String> {
        self()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatcherState {
    /// No video detected yet
    #[default]
    Idle,
    /// A video identity has been reported
    Attached(String),
}

/// Debouncing state machine over identity observations
#[derive(Debug, Clone)]
pub struct NavigationWatcher {
    state: WatcherState,
    debounce: Duration,
    // Identity waiting out the debounce window, with the time it was first seen
    pending: Option<(String, Instant)>,
}

impl NavigationWatcher {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: WatcherState::Idle,
            debounce,
            pending: None,
        }
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    /// The attached identity, if any
    pub fn current(&self) -> Option<&str> {
        match &self.state {
            WatcherState::Idle => None,
            WatcherState::Attached(id) => Some(id),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed one observation taken at `now`.
    ///
    /// An empty or invalid identity cancels the pending candidate. Seeing
    /// the attached identity again also cancels it, so `a, b, a` inside one
    /// window reports nothing.
    pub fn observe(&mut self, identity: Option<&str>, now: Instant) -> Option<VideoChanged> {
        let identity = match identity.map(str::trim).filter(|id| is_video_id(id)) {
            Some(id) => id,
            None => {
                if let Some((candidate, _)) = self.pending.take() {
                    trace!("Transient identity cancels candidate {}", candidate);
                }
                return None;
            }
        };

        if self.current() == Some(identity) {
            self.pending = None;
            return None;
        }

        match &self.pending {
            Some((candidate, _)) if candidate == identity => {}
            _ => {
                trace!("New candidate identity {}", identity);
                self.pending = Some((identity.to_string(), now));
            }
        }

        self.poll(now)
    }

    /// Report the pending candidate once it has been stable for the
    /// debounce window
    pub fn poll(&mut self, now: Instant) -> Option<VideoChanged> {
        let stable = match &self.pending {
            Some((_, since)) => now.saturating_duration_since(*since) >= self.debounce,
            None => false,
        };
        if !stable {
            return None;
        }

        let (identity, _) = self.pending.take()?;
        debug!("Video changed: {:?} -> {}", self.current(), identity);
        self.state = WatcherState::Attached(identity.clone());
        Some(VideoChanged(identity))
    }

    /// Attach to `identity` without waiting out the debounce window, for
    /// hosts that learn the identity from a full page load
    pub fn attach(&mut self, identity: &str) -> Option<VideoChanged> {
        self.pending = None;
        let identity = identity.trim();
        if !is_video_id(identity) || self.current() == Some(identity) {
            return None;
        }
        self.state = WatcherState::Attached(identity.to_string());
        Some(VideoChanged(identity.to_string()))
    }

    /// Back to `Idle`, forgetting any candidate
    pub fn reset(&mut self) {
        self.state = WatcherState::Idle;
        self.pending = None;
    }

    /// Poll `probe` every `interval`, forwarding changes to `events`.
    ///
    /// Returns when the receiving side of `events` is dropped.
    pub async fn run<P: IdentityProbe>(mut self, probe: P, interval: Duration, events: mpsc::Sender<VideoChanged>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = events.closed() => break,
                _ = ticker.tick() => {}
            }

            let identity = probe.detect_video_identity();
            if let Some(change) = self.observe(identity.as_deref(), Instant::now()) {
                if events.send(change).await.is_err() {
                    break;
                }
            }
        }

        debug!("Navigation watcher stopped");
    }
}

/// Whether `value` is a video identity: `BV…` or `av…`, optionally with a
/// `-pN` part suffix
pub fn is_video_id(value: &str) -> bool {
    let base = match PART_REGEX.captures(value) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => value,
    };
    BV_REGEX.is_match(base) || AV_REGEX.is_match(base)
}

/// Extract the video identity from a Bilibili page URL.
///
/// Video pages carry the id in the path (`/video/BV…/`), playlist pages
/// in the `bvid` query parameter. Part `N > 1` of a multi-part video
/// (`?p=N`) yields `<id>-pN`.
pub fn video_id_from_url(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if host != "bilibili.com" && !host.ends_with(".bilibili.com") {
        return None;
    }

    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let query = |name: &str| {
        parsed
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let base = match segments.as_slice() {
        ["video", id, ..] => id.to_string(),
        ["list", ..] | ["medialist", "play", ..] | ["festival", ..] => query("bvid")?,
        _ => return None,
    };
    if !BV_REGEX.is_match(&base) && !AV_REGEX.is_match(&base) {
        return None;
    }

    match query("p").and_then(|p| p.parse::<u32>().ok()) {
        Some(part) if part > 1 => Some(format!("{}-p{}", base, part)),
        _ => Some(base),
    }
}

/// Accept either a bare video identity or a page URL
pub fn resolve_video_reference(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        Some(input.to_string())
    } else {
        video_id_from_url(input)
    }
}
