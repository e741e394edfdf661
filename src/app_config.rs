use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::formats::ExportFormat;
use crate::timestamp::TimingUnit;
use crate::track::TrackSource;

/// Application configuration module
/// This module handles the configuration of the export core and the command
/// line host: which language to prefer, how to talk to the caption source,
/// how to interpret cue times and how the navigation watcher debounces.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Preferred caption language (language tag), if any
    #[serde(default)]
    pub default_language: Option<String>,

    /// Format used when none is requested explicitly
    #[serde(default)]
    pub default_format: ExportFormat,

    /// Caption source settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Timing unit per source format hint
    #[serde(default)]
    pub timing: TimingConfig,

    /// Navigation watcher settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Caption source settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AcquisitionConfig {
    // @field: Web API base URL
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    // @field: User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // @field: Optional Cookie header (logged-in session)
    #[serde(default)]
    pub session_cookie: Option<String>,

    // @field: Timeout seconds per request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retries after the first failed attempt
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Linear backoff step in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            user_agent: default_user_agent(),
            session_cookie: None,
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Unit of raw cue times, per source format hint.
///
/// The caption source may express times as fractional seconds,
/// milliseconds or frame counts depending on how the track was produced,
/// so the unit is configured rather than assumed. A unit declared by the
/// payload track itself takes precedence.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimingConfig {
    /// Unit for author-provided tracks
    #[serde(default)]
    pub native: TimingUnit,

    /// Unit for speech-recognition tracks
    #[serde(default)]
    pub machine_generated: TimingUnit,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            native: TimingUnit::Seconds,
            machine_generated: TimingUnit::Seconds,
        }
    }
}

impl TimingConfig {
    // @returns: Configured unit for a source hint
    pub fn unit_for(&self, source: TrackSource) -> TimingUnit {
        match source {
            TrackSource::Native => self.native,
            TrackSource::MachineGenerated => self.machine_generated,
        }
    }
}

/// Navigation watcher settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatcherConfig {
    /// How long a new identity must stay stable before it is reported
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Interval at which the identity probe is polled
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_api_endpoint() -> String {
    "https://api.bilibili.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_retry_count() -> u32 {
    2 // The endpoint is occasionally rate-limited
}

fn default_retry_backoff_ms() -> u64 {
    500 // Attempt n waits n * 500ms
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if let Some(language) = &self.default_language {
            crate::language_utils::get_language_name(language)?;
        }

        if self.acquisition.api_endpoint.trim().is_empty() {
            return Err(anyhow!("API endpoint must not be empty"));
        }
        url::Url::parse(&self.acquisition.api_endpoint)
            .with_context(|| format!("Invalid API endpoint: {}", self.acquisition.api_endpoint))?;

        if self.acquisition.timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be at least one second"));
        }
        if self.acquisition.retry_count > 10 {
            return Err(anyhow!("Retry count {} is too large (max 10)", self.acquisition.retry_count));
        }

        for unit in [self.timing.native, self.timing.machine_generated] {
            if let TimingUnit::Frames { fps } = unit {
                if !fps.is_finite() || fps <= 0.0 {
                    return Err(anyhow!("Frame rate must be positive, got {}", fps));
                }
            }
        }

        if self.watcher.debounce_ms == 0 || self.watcher.debounce_ms > 5_000 {
            return Err(anyhow!("Debounce window must be between 1 and 5000 ms"));
        }
        if self.watcher.poll_interval_ms == 0 {
            return Err(anyhow!("Poll interval must be positive"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_language: None,
            default_format: ExportFormat::default(),
            acquisition: AcquisitionConfig::default(),
            timing: TimingConfig::default(),
            watcher: WatcherConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
