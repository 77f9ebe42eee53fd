//! # illust-dl
//!
//! Backend library that resolves an illustration's media assets and downloads them.
//!
//! ## Pipeline
//!
//! 1. **Resolve** - [`MetadataResolver`] reads the page's embedded preload data, falling back
//!    to the remote ajax API, and normalizes either into [`IllustrationMetadata`]
//! 2. **Select** - a [`RangePrompt`] picks which assets to fetch; [`selection::apply`] clamps it
//! 3. **Download** - [`DownloadOrchestrator`] walks each asset's fallback chain with retries,
//!    committing through a [`DownloadSink`] under sanitized candidate paths
//!
//! Everything runs sequentially; only resolution is shared between concurrent callers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use illust_dl::{AcceptAll, Config, FsDownloadSink, IllustDownloader, NoEmbeddedData};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         api: illust_dl::config::ApiConfig {
//!             cookie: Some("PHPSESSID=...".to_string()),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let downloader = IllustDownloader::new(
//!         config,
//!         Arc::new(NoEmbeddedData),
//!         Arc::new(FsDownloadSink::new("downloads")),
//!     )?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     if let Some(outcomes) = downloader.download_subject("12345678", &AcceptAll).await? {
//!         let saved = outcomes.iter().filter(|o| o.success).count();
//!         println!("{saved} of {} downloaded", outcomes.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Asset deduplication
pub mod dedup;
/// Download orchestration and the crate facade
pub mod downloader;
/// Error types
pub mod error;
/// Fallback URL chains
pub mod fallback;
/// Metadata sources, normalization, and resolution
pub mod metadata;
/// Path sanitization and candidate paths
pub mod paths;
/// Range-selection prompt
pub mod prompt;
/// Retry logic with linear backoff
pub mod retry;
/// Range selection over resolved assets
pub mod selection;
/// Download sink
pub mod sink;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, FileCollisionAction, Locale};
pub use downloader::{DownloadOrchestrator, IllustDownloader};
pub use error::{DownloadError, Error, ResolveError, Result};
pub use metadata::{
    EmbeddedSource, HttpMetadataApi, MetadataApi, MetadataResolver, NoEmbeddedData, PageDocument,
};
pub use prompt::{AcceptAll, FixedSelection, RangePrompt};
pub use sink::{CommitRequest, DownloadSink, FsDownloadSink, SinkError};
pub use types::{
    AssetVariant, BatchSummary, DownloadOutcome, Event, IllustrationMetadata, ImageAsset,
    Selection,
};
