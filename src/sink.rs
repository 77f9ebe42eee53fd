//! Download sink
//!
//! The sink owns the final write. Its errors distinguish path-shape rejections, which
//! make the downloader try the next candidate path, from every other failure.

use crate::config::FileCollisionAction;
use crate::error::{DownloadError, Error};
use crate::paths::{PathDecision, resolve_collision};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Message fragments that identify a path-shape rejection
const PATH_REJECTION_MARKERS: &[&str] = &[
    "invalid filename",
    "invalid file name",
    "name too long",
    "path too long",
    "filename too long",
];

/// A write request for one asset
#[derive(Clone, Debug)]
pub struct CommitRequest {
    /// Asset bytes
    pub data: Vec<u8>,
    /// Target path relative to the sink's root
    pub path: PathBuf,
    /// What to do when the target exists
    pub conflict: FileCollisionAction,
}

/// Failure reported by a sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The path is not acceptable as a filename, or is too long
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// Rejected path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

impl SinkError {
    /// Whether the next candidate path should be tried
    ///
    /// Sinks that only report text are classified by message.
    pub fn is_path_rejection(&self) -> bool {
        match self {
            SinkError::InvalidPath { .. } => true,
            SinkError::Other(message) => {
                let message = message.to_ascii_lowercase();
                PATH_REJECTION_MARKERS.iter().any(|m| message.contains(m))
            }
        }
    }

    /// Convert into the downloader's error for `path`
    pub fn into_download_error(self, path: &Path) -> DownloadError {
        let path = path.display().to_string();
        if self.is_path_rejection() {
            let reason = match self {
                SinkError::InvalidPath { reason, .. } => reason,
                SinkError::Other(message) => message,
            };
            DownloadError::PathRejected { path, reason }
        } else {
            DownloadError::CommitFailed {
                path,
                reason: self.to_string(),
            }
        }
    }
}

/// Destination for downloaded assets
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Write the request's data; returns the path actually used
    async fn commit(&self, request: CommitRequest) -> Result<PathBuf, SinkError>;
}

/// Sink writing below a base directory on the local filesystem
#[derive(Clone, Debug)]
pub struct FsDownloadSink {
    base_dir: PathBuf,
}

impl FsDownloadSink {
    /// Create a sink rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory all writes go below
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn io_error(path: &Path, e: std::io::Error) -> SinkError {
        match e.kind() {
            std::io::ErrorKind::InvalidFilename => SinkError::InvalidPath {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
            _ => SinkError::Other(format!("{}: {}", path.display(), e)),
        }
    }
}

#[async_trait]
impl DownloadSink for FsDownloadSink {
    async fn commit(&self, request: CommitRequest) -> Result<PathBuf, SinkError> {
        let escapes_base = request.path.as_os_str().is_empty()
            || request
                .path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes_base {
            return Err(SinkError::InvalidPath {
                path: request.path.display().to_string(),
                reason: "path must be relative and stay below the sink root".to_string(),
            });
        }

        let target = self.base_dir.join(&request.path);

        let decision = resolve_collision(&target, request.conflict)
            .await
            .map_err(|e| match e {
                Error::Download(DownloadError::PathRejected { path, reason }) => {
                    SinkError::InvalidPath { path, reason }
                }
                other => SinkError::Other(other.to_string()),
            })?;
        let final_path = match decision {
            PathDecision::KeepExisting(existing) => {
                tracing::info!(path = %existing.display(), "Keeping existing file");
                return Ok(existing);
            }
            PathDecision::Write(path) => path,
        };

        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(parent, e))?;
        }

        tokio::fs::write(&final_path, &request.data)
            .await
            .map_err(|e| Self::io_error(&final_path, e))?;

        tracing::debug!(
            path = %final_path.display(),
            bytes = request.data.len(),
            "Committed asset"
        );

        Ok(final_path)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(path: &str, conflict: FileCollisionAction) -> CommitRequest {
        CommitRequest {
            data: b"image-bytes".to_vec(),
            path: PathBuf::from(path),
            conflict,
        }
    }

    #[tokio::test]
    async fn writes_below_base_creating_parents() {
        let dir = tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path());

        let saved = sink
            .commit(request("root/artist/1/000.png", FileCollisionAction::Rename))
            .await
            .unwrap();

        assert_eq!(saved, dir.path().join("root/artist/1/000.png"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"image-bytes");
    }

    #[tokio::test]
    async fn collision_policies() {
        let dir = tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path());
        sink.commit(request("a/000.png", FileCollisionAction::Rename))
            .await
            .unwrap();

        let renamed = sink
            .commit(request("a/000.png", FileCollisionAction::Rename))
            .await
            .unwrap();
        assert_eq!(renamed, dir.path().join("a/000 (1).png"));

        let mut skip = request("a/000.png", FileCollisionAction::Skip);
        skip.data = b"new".to_vec();
        let kept = sink.commit(skip).await.unwrap();
        assert_eq!(std::fs::read(kept).unwrap(), b"image-bytes");

        let mut overwrite = request("a/000.png", FileCollisionAction::Overwrite);
        overwrite.data = b"new".to_vec();
        let replaced = sink.commit(overwrite).await.unwrap();
        assert_eq!(std::fs::read(replaced).unwrap(), b"new");
    }

    #[tokio::test]
    async fn escaping_paths_are_rejected() {
        let dir = tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path());

        for path in ["../outside.png", "/abs/000.png", ""] {
            let err = sink
                .commit(request(path, FileCollisionAction::Rename))
                .await
                .unwrap_err();
            assert!(err.is_path_rejection(), "{path:?} gave {err:?}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn overlong_filename_is_path_rejection() {
        let dir = tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path());
        let name = format!("{}.png", "x".repeat(300));

        let err = sink
            .commit(request(&name, FileCollisionAction::Rename))
            .await
            .unwrap_err();
        assert!(err.is_path_rejection(), "got {err:?}");
    }

    #[test]
    fn text_only_errors_are_classified_by_message() {
        assert!(SinkError::Other("Invalid filename".into()).is_path_rejection());
        assert!(SinkError::Other("File name too long (os error 36)".into()).is_path_rejection());
        assert!(!SinkError::Other("disk full".into()).is_path_rejection());
    }

    #[test]
    fn conversion_keeps_rejection_kind() {
        let path = Path::new("a/000.png");
        assert_eq!(
            SinkError::Other("path too long".into())
                .into_download_error(path)
                .to_string(),
            "path rejected a/000.png: path too long"
        );
        match SinkError::Other("permission denied".into()).into_download_error(path) {
            DownloadError::CommitFailed { reason, .. } => assert_eq!(reason, "permission denied"),
            other => panic!("expected commit failure, got {other:?}"),
        }
    }
}
