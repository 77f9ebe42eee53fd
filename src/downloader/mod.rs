//! Download orchestration and the crate facade.
//!
//! [`DownloadOrchestrator`] walks a selection strictly in order. Its work is split by stage:
//! - [`fetch`] - fetching one URL candidate and checking the response
//! - [`commit`] - handing the bytes to the sink, one candidate path at a time
//!
//! [`IllustDownloader`] wires resolver, prompt, selection, and orchestrator together.

mod commit;
mod fetch;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{DownloadError, Error, Result};
use crate::metadata::{EmbeddedSource, HttpMetadataApi, MetadataApi, MetadataResolver};
use crate::metadata::api::build_http_client;
use crate::prompt::RangePrompt;
use crate::retry::{RetryPolicy, download_with_retry};
use crate::selection;
use crate::sink::DownloadSink;
use crate::types::{
    BatchSummary, DownloadOutcome, Event, IllustrationMetadata, ImageAsset, Selection,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Sequential downloader for the assets of one subject
#[derive(Clone)]
pub struct DownloadOrchestrator {
    /// HTTP client carrying Referer and cookie headers
    pub(crate) client: reqwest::Client,
    /// Destination for committed assets
    pub(crate) sink: Arc<dyn DownloadSink>,
    /// Configuration (wrapped in Arc for sharing with the facade)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl DownloadOrchestrator {
    /// Create an orchestrator
    pub fn new(client: reqwest::Client, sink: Arc<dyn DownloadSink>, config: Arc<Config>) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            client,
            sink,
            config,
            event_tx,
        }
    }

    /// Subscribe to download events
    ///
    /// Each subscriber receives every event sent after it subscribed. Slow subscribers may
    /// observe `RecvError::Lagged` when more than 1000 events are buffered.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// With no subscribers the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Download `assets` of `metadata` in order
    ///
    /// Returns one outcome per asset, in the same order. A failed asset never stops the
    /// batch. A `Progress` event follows every asset and `BatchFinished` ends the batch.
    pub async fn download_batch(
        &self,
        metadata: &IllustrationMetadata,
        assets: &[ImageAsset],
    ) -> Vec<DownloadOutcome> {
        let total = assets.len();
        let mut outcomes = Vec::with_capacity(total);

        tracing::info!(subject_id = %metadata.id, total, "Starting download batch");

        for (position, asset) in assets.iter().enumerate() {
            let index = position + 1;
            self.emit_event(Event::AssetStarted {
                index,
                total,
                url: asset.url().to_string(),
            });

            let outcome = match self.download_asset(metadata, asset).await {
                Ok(saved) => {
                    let path = saved.display().to_string();
                    tracing::info!(
                        subject_id = %metadata.id,
                        index,
                        total,
                        path = %path,
                        "Saved asset"
                    );
                    self.emit_event(Event::AssetSaved {
                        index,
                        total,
                        url: asset.url().to_string(),
                        path: path.clone(),
                    });
                    DownloadOutcome::succeeded(asset.url(), path)
                }
                Err(e) => {
                    tracing::error!(
                        subject_id = %metadata.id,
                        index,
                        total,
                        url = asset.url(),
                        error = %e,
                        code = e.code(),
                        "Asset failed on every candidate"
                    );
                    let message = match e {
                        DownloadError::Exhausted { last_error, .. } => last_error,
                        other => other.to_string(),
                    };
                    self.emit_event(Event::AssetFailed {
                        index,
                        total,
                        url: asset.url().to_string(),
                        error: message.clone(),
                    });
                    DownloadOutcome::failed(asset.url(), message)
                }
            };
            outcomes.push(outcome);

            self.emit_event(Event::Progress {
                completed: index,
                total,
            });
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(subject_id = %metadata.id, ?summary, "Download batch finished");
        self.emit_event(Event::BatchFinished { summary });

        outcomes
    }

    /// Try every URL candidate of one asset until a commit succeeds
    async fn download_asset(
        &self,
        metadata: &IllustrationMetadata,
        asset: &ImageAsset,
    ) -> std::result::Result<PathBuf, DownloadError> {
        let policy = RetryPolicy::from_config(&self.config);
        let mut seen = HashSet::new();
        let mut last_error: Option<DownloadError> = None;

        for url in asset.candidate_urls() {
            if !seen.insert(url) {
                continue;
            }

            let fetched = download_with_retry(&policy, move |attempt| async move {
                let result = self.fetch_candidate(url).await;
                if let Err(e) = &result {
                    self.emit_event(Event::AttemptFailed {
                        url: url.to_string(),
                        attempt,
                        max_attempts: policy.max_attempts,
                        error: e.to_string(),
                    });
                }
                result
            })
            .await;

            let fetched = match fetched {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::warn!(url, error = %e, "URL candidate failed, trying next");
                    last_error = Some(e);
                    continue;
                }
            };

            match self.commit_to_first_path(metadata, asset, url, fetched).await {
                Ok(saved) => return Ok(saved),
                Err(e) => {
                    tracing::warn!(url, error = %e, "Commit failed for URL candidate, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(DownloadError::Exhausted {
            url: asset.url().to_string(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no URL candidates".to_string()),
        })
    }
}

/// Entry point: resolve a subject, let the caller pick assets, download them
///
/// Cloneable; clones share the resolver cache and the event channel.
#[derive(Clone)]
pub struct IllustDownloader {
    resolver: MetadataResolver,
    orchestrator: DownloadOrchestrator,
    config: Arc<Config>,
}

impl IllustDownloader {
    /// Create a downloader talking to the configured remote API
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration is invalid or its headers
    /// cannot be sent.
    pub fn new(
        config: Config,
        embedded: Arc<dyn EmbeddedSource>,
        sink: Arc<dyn DownloadSink>,
    ) -> Result<Self> {
        config.validate()?;
        let client = build_http_client(&config.api)?;
        let api = Arc::new(HttpMetadataApi::with_client(client.clone(), &config.api.base_url));
        Ok(Self::assemble(config, client, embedded, api, sink))
    }

    /// Create a downloader with a custom metadata API
    pub fn with_api(
        config: Config,
        embedded: Arc<dyn EmbeddedSource>,
        api: Arc<dyn MetadataApi>,
        sink: Arc<dyn DownloadSink>,
    ) -> Result<Self> {
        config.validate()?;
        let client = build_http_client(&config.api)?;
        Ok(Self::assemble(config, client, embedded, api, sink))
    }

    fn assemble(
        config: Config,
        client: reqwest::Client,
        embedded: Arc<dyn EmbeddedSource>,
        api: Arc<dyn MetadataApi>,
        sink: Arc<dyn DownloadSink>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            resolver: MetadataResolver::new(embedded, api, config.locale),
            orchestrator: DownloadOrchestrator::new(client, sink, config.clone()),
            config,
        }
    }

    /// Resolve metadata for a subject
    pub async fn resolve(&self, id: &str) -> Result<Arc<IllustrationMetadata>> {
        Ok(self.resolver.resolve(id).await?)
    }

    /// Resolve, prompt, and download
    ///
    /// The prompt is consulted only when the subject has more than one asset.
    /// Returns `Ok(None)` when the prompt cancels; nothing is downloaded then.
    ///
    /// # Errors
    ///
    /// Resolution failures are returned as [`Error::Resolve`]. Per-asset download failures
    /// are reported in the outcome list instead.
    pub async fn download_subject(
        &self,
        id: &str,
        prompt: &dyn RangePrompt,
    ) -> Result<Option<Vec<DownloadOutcome>>> {
        let metadata = self.resolver.resolve(id).await.map_err(Error::Resolve)?;
        let total = metadata.assets.len();

        let selection = if total > 1 {
            match prompt.choose(total, Selection::All).await {
                Some(selection) => selection,
                None => {
                    tracing::info!(subject_id = id, "Range selection cancelled, skipping download");
                    return Ok(None);
                }
            }
        } else {
            Selection::All
        };

        let assets = selection::apply(&metadata.assets, &selection);
        tracing::debug!(subject_id = id, ?selection, selected = assets.len(), total, "Applied selection");

        Ok(Some(self.orchestrator.download_batch(&metadata, &assets).await))
    }

    /// Subscribe to download events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.orchestrator.subscribe()
    }

    /// Forget cached metadata after the caller's page context changed
    pub async fn reset_context(&self) {
        self.resolver.reset().await;
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}
