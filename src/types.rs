//! Core types for illust-dl

use serde::{Deserialize, Serialize};

/// Provenance of an asset URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetVariant {
    /// Full-resolution URL of a single illustration
    Original,
    /// Declared URL of one page of a multi-page set
    Page,
    /// Page URL synthesized from a sibling page; failures are expected
    Guessed,
    /// Packaged animation archive
    Ugoira,
}

impl AssetVariant {
    /// Extension used when neither the URL nor the response reveals one
    pub fn default_extension(&self) -> &'static str {
        match self {
            AssetVariant::Ugoira => "zip",
            _ => "jpg",
        }
    }
}

impl std::fmt::Display for AssetVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetVariant::Original => "original",
            AssetVariant::Page => "page",
            AssetVariant::Guessed => "guessed",
            AssetVariant::Ugoira => "ugoira",
        };
        f.write_str(name)
    }
}

/// One downloadable media unit with its ordered fallback chain
///
/// The primary `url` never appears in `fallbacks`, and `fallbacks` holds no duplicates.
/// Both properties are enforced on every insertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageAsset {
    url: String,
    page_index: usize,
    variant: AssetVariant,
    fallbacks: Vec<String>,
}

impl ImageAsset {
    /// Create an asset with an empty fallback chain
    pub fn new(url: impl Into<String>, page_index: usize, variant: AssetVariant) -> Self {
        Self {
            url: url.into(),
            page_index,
            variant,
            fallbacks: Vec::new(),
        }
    }

    /// Builder-style variant of [`ImageAsset::extend_fallbacks`]
    pub fn with_fallbacks<I, S>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extend_fallbacks(fallbacks);
        self
    }

    /// Append fallbacks in order, skipping the primary URL and anything already present
    pub fn extend_fallbacks<I, S>(&mut self, fallbacks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for candidate in fallbacks {
            self.push_fallback(candidate);
        }
    }

    /// Append one fallback; returns false when it was skipped
    pub fn push_fallback(&mut self, candidate: impl Into<String>) -> bool {
        let candidate = candidate.into();
        if candidate.is_empty() || candidate == self.url || self.fallbacks.contains(&candidate) {
            return false;
        }
        self.fallbacks.push(candidate);
        true
    }

    /// Primary URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Zero-based page index within the subject
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Provenance tag
    pub fn variant(&self) -> AssetVariant {
        self.variant
    }

    /// Alternate URLs in priority order
    pub fn fallbacks(&self) -> &[String] {
        &self.fallbacks
    }

    /// Primary URL followed by every fallback
    pub fn candidate_urls(&self) -> Vec<&str> {
        std::iter::once(self.url.as_str())
            .chain(self.fallbacks.iter().map(String::as_str))
            .collect()
    }
}

/// Canonical metadata for one subject
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IllustrationMetadata {
    /// Subject id
    pub id: String,
    /// Title, or a locale placeholder
    pub title: String,
    /// Author display name, or a locale placeholder
    pub author: String,
    /// Assets in page order; never empty for a successful resolution
    pub assets: Vec<ImageAsset>,
}

/// Which assets of a subject to download
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Selection {
    /// Every asset
    #[default]
    All,
    /// 1-indexed inclusive range; clamped to the asset count when applied
    Range {
        /// First asset (1-based)
        start: usize,
        /// Last asset (1-based, inclusive)
        end: usize,
    },
}

/// Result for one selected asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Primary URL of the asset
    pub asset_url: String,
    /// Whether any candidate was committed
    pub success: bool,
    /// Path accepted by the sink
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<String>,
    /// Last error when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadOutcome {
    /// Outcome for a committed asset
    pub fn succeeded(asset_url: impl Into<String>, saved_path: impl Into<String>) -> Self {
        Self {
            asset_url: asset_url.into(),
            success: true,
            saved_path: Some(saved_path.into()),
            error: None,
        }
    }

    /// Outcome for an asset whose candidates were exhausted
    pub fn failed(asset_url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            asset_url: asset_url.into(),
            success: false,
            saved_path: None,
            error: Some(error.into()),
        }
    }
}

/// Coarse result of a whole batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchSummary {
    /// Every asset was saved (also used for an empty batch)
    AllSucceeded {
        /// Number of assets
        total: usize,
    },
    /// Some assets were saved
    Partial {
        /// Number of saved assets
        succeeded: usize,
        /// Number of assets
        total: usize,
    },
    /// No asset was saved
    AllFailed {
        /// Number of assets
        total: usize,
    },
}

impl BatchSummary {
    /// Derive the summary from per-asset outcomes
    pub fn from_outcomes(outcomes: &[DownloadOutcome]) -> Self {
        let total = outcomes.len();
        let succeeded = outcomes.iter().filter(|o| o.success).count();

        if succeeded == total {
            BatchSummary::AllSucceeded { total }
        } else if succeeded == 0 {
            BatchSummary::AllFailed { total }
        } else {
            BatchSummary::Partial { succeeded, total }
        }
    }
}

/// Event emitted by the download orchestrator
///
/// Indexes are 1-based so they can be shown as "index/total" directly.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Work on an asset started
    AssetStarted {
        /// Position in the selection (1-based)
        index: usize,
        /// Size of the selection
        total: usize,
        /// Primary URL
        url: String,
    },

    /// One fetch attempt against a URL candidate failed
    AttemptFailed {
        /// Candidate URL
        url: String,
        /// Attempt number (1-based)
        attempt: u32,
        /// Attempts allowed for this candidate
        max_attempts: u32,
        /// Error message
        error: String,
    },

    /// The sink refused a path candidate; the next one will be tried
    PathRejected {
        /// Rejected path
        path: String,
        /// Sink message
        reason: String,
    },

    /// Asset committed
    AssetSaved {
        /// Position in the selection (1-based)
        index: usize,
        /// Size of the selection
        total: usize,
        /// URL that was committed
        url: String,
        /// Path accepted by the sink
        path: String,
    },

    /// Every candidate of an asset failed
    AssetFailed {
        /// Position in the selection (1-based)
        index: usize,
        /// Size of the selection
        total: usize,
        /// Primary URL
        url: String,
        /// Last error
        error: String,
    },

    /// Coarse progress, emitted after each asset
    Progress {
        /// Assets processed so far
        completed: usize,
        /// Size of the selection
        total: usize,
    },

    /// The batch finished
    BatchFinished {
        /// Tri-state summary
        summary: BatchSummary,
    },
}
