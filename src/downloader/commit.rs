//! Committing fetched bytes through the sink

use super::DownloadOrchestrator;
use super::fetch::FetchedAsset;
use crate::error::DownloadError;
use crate::paths::{ExtensionSource, PathRequest, build_candidate_paths};
use crate::sink::CommitRequest;
use crate::types::{Event, IllustrationMetadata, ImageAsset};
use std::path::PathBuf;

impl DownloadOrchestrator {
    /// Commit to the first candidate path the sink accepts
    ///
    /// Path rejections advance to the next candidate path; any other sink failure ends
    /// the attempt for this URL.
    pub(crate) async fn commit_to_first_path(
        &self,
        metadata: &IllustrationMetadata,
        asset: &ImageAsset,
        url: &str,
        fetched: FetchedAsset,
    ) -> Result<PathBuf, DownloadError> {
        let request = PathRequest {
            root: &self.config.root_folder_name,
            author: &metadata.author,
            subject_id: &metadata.id,
            title: &metadata.title,
            page_index: asset.page_index(),
            variant: asset.variant(),
            extension_source: ExtensionSource {
                url,
                content_type: fetched.content_type.as_deref(),
            },
            anti_theft_suffix: self.config.anti_theft_suffix_enabled,
        };

        let mut last_rejection = None;
        for path in build_candidate_paths(&request) {
            let commit = CommitRequest {
                data: fetched.data.clone(),
                path: path.clone(),
                conflict: self.config.conflict_policy,
            };

            match self.sink.commit(commit).await {
                Ok(saved) => return Ok(saved),
                Err(e) if e.is_path_rejection() => {
                    tracing::warn!(path = %path.display(), error = %e, "Sink rejected path, trying next");
                    self.emit_event(Event::PathRejected {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    });
                    last_rejection = Some(e.into_download_error(&path));
                }
                Err(e) => return Err(e.into_download_error(&path)),
            }
        }

        Err(last_rejection.unwrap_or_else(|| DownloadError::PathRejected {
            path: String::new(),
            reason: "no candidate paths".to_string(),
        }))
    }
}
