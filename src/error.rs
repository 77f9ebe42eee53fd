//! Error types for illust-dl
//!
//! Errors are split by pipeline stage:
//! - [`ResolveError`] covers metadata resolution and is `Clone` so a single in-flight
//!   resolution can hand the same failure to every waiting caller
//! - [`DownloadError`] covers fetching assets and committing them to the sink
//! - [`Error`] is the crate-wide wrapper used by the facade and configuration code

use thiserror::Error;

/// Result type alias for illust-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for illust-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "root_folder_name")
        key: Option<String>,
    },

    /// Metadata resolution failed
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Download-related error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors produced while turning a subject id into [`crate::types::IllustrationMetadata`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Neither the embedded page data nor the remote API produced a record for the id
    #[error("no metadata available for subject {id}")]
    MetadataUnavailable {
        /// Subject id that was requested
        id: String,
    },

    /// Embedded page data could not be parsed (recoverable, resolution falls through)
    #[error("malformed embedded metadata for subject {id}: {reason}")]
    MetadataMalformed {
        /// Subject id that was requested
        id: String,
        /// Parser message
        reason: String,
    },

    /// A record was found but produced no downloadable assets
    #[error("subject {id} has no downloadable assets")]
    NoDownloadableAssets {
        /// Subject id that was requested
        id: String,
    },

    /// The remote API returned a non-2xx status, an error envelope, or an unreadable body
    #[error("remote request for subject {id} failed: {message}")]
    RemoteRequestFailed {
        /// Subject id that was requested
        id: String,
        /// HTTP status when the failure came from a response
        status: Option<u16>,
        /// Transport or API error message
        message: String,
    },
}

/// Errors produced while downloading a single asset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// One URL candidate failed the network or content-type check
    #[error("fetch failed for {url}: {reason}")]
    AssetFetchFailed {
        /// Candidate URL
        url: String,
        /// Why the attempt failed
        reason: String,
    },

    /// The sink refused a path as an invalid filename or too long
    #[error("path rejected {path}: {reason}")]
    PathRejected {
        /// Rejected path
        path: String,
        /// Sink message
        reason: String,
    },

    /// The sink failed for a reason unrelated to the path shape
    #[error("commit failed for {path}: {reason}")]
    CommitFailed {
        /// Path that was being written
        path: String,
        /// Sink message
        reason: String,
    },

    /// Every URL candidate of an asset was tried without a successful commit
    #[error("all candidates exhausted for {url}: {last_error}")]
    Exhausted {
        /// Primary URL of the asset
        url: String,
        /// Message of the final failure
        last_error: String,
    },
}

impl ResolveError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::MetadataUnavailable { .. } => "metadata_unavailable",
            ResolveError::MetadataMalformed { .. } => "metadata_malformed",
            ResolveError::NoDownloadableAssets { .. } => "no_downloadable_assets",
            ResolveError::RemoteRequestFailed { .. } => "remote_request_failed",
        }
    }

    /// Subject id the error refers to
    pub fn subject_id(&self) -> &str {
        match self {
            ResolveError::MetadataUnavailable { id }
            | ResolveError::MetadataMalformed { id, .. }
            | ResolveError::NoDownloadableAssets { id }
            | ResolveError::RemoteRequestFailed { id, .. } => id,
        }
    }
}

impl DownloadError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            DownloadError::AssetFetchFailed { .. } => "asset_fetch_failed",
            DownloadError::PathRejected { .. } => "path_rejected",
            DownloadError::CommitFailed { .. } => "commit_failed",
            DownloadError::Exhausted { .. } => "candidates_exhausted",
        }
    }
}

impl Error {
    /// Machine-readable error code
    ///
    /// Stable across releases so callers can map codes to their own UI strings.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Resolve(e) => e.code(),
            Error::Download(e) => e.code(),
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::Other(_) => "internal_error",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_errors_carry_stable_codes() {
        let cases = vec![
            (
                ResolveError::MetadataUnavailable { id: "1".into() },
                "metadata_unavailable",
            ),
            (
                ResolveError::MetadataMalformed {
                    id: "1".into(),
                    reason: "eof".into(),
                },
                "metadata_malformed",
            ),
            (
                ResolveError::NoDownloadableAssets { id: "1".into() },
                "no_downloadable_assets",
            ),
            (
                ResolveError::RemoteRequestFailed {
                    id: "1".into(),
                    status: Some(404),
                    message: "not found".into(),
                },
                "remote_request_failed",
            ),
        ];

        for (err, code) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.subject_id(), "1");
            assert_eq!(Error::from(err).code(), code, "wrapper must forward code");
        }
    }

    #[test]
    fn download_error_codes_forward_through_wrapper() {
        let err = Error::from(DownloadError::PathRejected {
            path: "a/b.png".into(),
            reason: "invalid filename".into(),
        });
        assert_eq!(err.code(), "path_rejected");
        assert!(err.to_string().contains("a/b.png"));
    }

    #[test]
    fn config_error_message_includes_detail() {
        let err = Error::Config {
            message: "root folder name must not be empty".into(),
            key: Some("root_folder_name".into()),
        };
        assert_eq!(err.code(), "config_error");
        assert_eq!(
            err.to_string(),
            "configuration error: root folder name must not be empty"
        );
    }
}
