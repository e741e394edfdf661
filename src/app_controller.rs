use anyhow::Result;
use log::{debug, info};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::acquisition::{AcquisitionAdapter, TrackInfo};
use crate::app_config::Config;
use crate::errors::ExportError;
use crate::export::{ExportArtifact, ExportOrchestrator};
use crate::formats::ExportFormat;
use crate::navigation::{IdentityProbe, NavigationWatcher, VideoChanged};
use crate::providers::bilibili::BilibiliFetcher;
use crate::providers::CaptionFetcher;

// @module: Host-facing facade over the export core

/// Entry point for a host page (or the command line).
///
/// Identity observations go through the navigation watcher; changes it
/// reports are applied to the orchestrator before any export is served.
pub struct CaptionExporter<F: CaptionFetcher + 'static> {
    // @field: App configuration
    config: Config,
    // @field: Debouncing identity state machine
    watcher: Mutex<NavigationWatcher>,
    // @field: Cache, acquisition and encoding
    orchestrator: ExportOrchestrator<F>,
}

impl CaptionExporter<BilibiliFetcher> {
    // @method: Create an exporter talking to the Bilibili web API
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = BilibiliFetcher::new(&config.acquisition)?;
        Ok(Self::with_fetcher(fetcher, config))
    }
}

impl<F: CaptionFetcher + 'static> CaptionExporter<F> {
    // @method: Create an exporter around an injected fetcher
    pub fn with_fetcher(fetcher: F, config: Config) -> Self {
        let adapter = AcquisitionAdapter::new(fetcher, &config.acquisition, config.timing.clone());
        let watcher = NavigationWatcher::new(Duration::from_millis(config.watcher.debounce_ms));

        Self {
            config,
            watcher: Mutex::new(watcher),
            orchestrator: ExportOrchestrator::new(adapter),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &ExportOrchestrator<F> {
        &self.orchestrator
    }

    /// Video exports are currently served for
    pub fn current_video(&self) -> Option<String> {
        self.orchestrator.current_video()
    }

    /// Report the identity currently read from the page
    pub fn notify_video_identity(&self, identity: Option<&str>) -> Option<VideoChanged> {
        self.notify_video_identity_at(identity, Instant::now())
    }

    /// Report an identity observed at `now`
    pub fn notify_video_identity_at(&self, identity: Option<&str>, now: Instant) -> Option<VideoChanged> {
        let change = self.watcher.lock().observe(identity, now);
        self.apply(change)
    }

    /// Attach to a known video right away, skipping the debounce window
    pub fn open_video(&self, video_id: &str) -> Option<VideoChanged> {
        let change = self.watcher.lock().attach(video_id);
        self.apply(change)
    }

    /// Apply a change reported by the watcher settling, if any
    pub fn settle(&self, now: Instant) -> Option<VideoChanged> {
        let change = self.watcher.lock().poll(now);
        self.apply(change)
    }

    fn apply(&self, change: Option<VideoChanged>) -> Option<VideoChanged> {
        if let Some(change) = &change {
            self.orchestrator.handle_video_changed(change);
        }
        change
    }

    /// Export the current video's captions.
    ///
    /// Falls back to the configured default language when none is given.
    pub async fn request_export(
        &self,
        format: ExportFormat,
        language: Option<&str>,
    ) -> Result<ExportArtifact, ExportError> {
        self.settle(Instant::now());

        let language = language.or(self.config.default_language.as_deref());
        debug!("Export requested: {} ({:?})", format, language);
        self.orchestrator.request_export(format, language).await
    }

    /// Tracks offered by the current video
    pub async fn list_tracks(&self) -> Result<Vec<TrackInfo>, ExportError> {
        self.settle(Instant::now());
        self.orchestrator.list_tracks().await
    }

    /// Full page teardown
    pub fn reset(&self) {
        self.watcher.lock().reset();
        self.orchestrator.reset();
        info!("Exporter reset");
    }

    /// Follow `probe` for as long as the returned future is driven.
    ///
    /// Runs a copy of the watcher through [`NavigationWatcher::run`] at the
    /// configured poll interval and applies each change it reports, so the
    /// attached video and the session cache follow the page.
    pub async fn watch<P: IdentityProbe>(&self, probe: P) {
        let interval = Duration::from_millis(self.config.watcher.poll_interval_ms);
        let watcher = self.watcher.lock().clone();
        let (events, mut changes) = mpsc::channel::<VideoChanged>(8);

        let apply = async {
            while let Some(change) = changes.recv().await {
                self.open_video(&change.0);
            }
        };

        tokio::join!(watcher.run(probe, interval, events), apply);
    }
}
