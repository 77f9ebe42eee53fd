//! Fetching a single URL candidate

use super::DownloadOrchestrator;
use crate::error::DownloadError;
use reqwest::header::CONTENT_TYPE;

/// Response body of a successful fetch
#[derive(Debug, Clone)]
pub(crate) struct FetchedAsset {
    pub(crate) data: Vec<u8>,
    pub(crate) content_type: Option<String>,
}

/// Whether a response content type is an image or a frame archive
pub(crate) fn is_acceptable_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("image/")
        || matches!(
            mime.as_str(),
            "application/zip" | "application/x-zip-compressed" | "application/x-zip"
        )
}

impl DownloadOrchestrator {
    /// One attempt against one URL candidate
    ///
    /// Non-2xx statuses, transport errors, and unexpected content types are all
    /// [`DownloadError::AssetFetchFailed`].
    pub(crate) async fn fetch_candidate(&self, url: &str) -> Result<FetchedAsset, DownloadError> {
        let failed = |reason: String| DownloadError::AssetFetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                failed("timeout".to_string())
            } else if e.is_connect() {
                failed(format!("connection failed: {}", e))
            } else {
                failed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match content_type.as_deref() {
            Some(ct) if is_acceptable_content_type(ct) => {}
            Some(ct) => return Err(failed(format!("unexpected content type '{}'", ct))),
            None => return Err(failed("missing content type".to_string())),
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| failed(format!("body read failed: {}", e)))?
            .to_vec();

        tracing::debug!(url, bytes = data.len(), content_type = ?content_type, "Fetched candidate");

        Ok(FetchedAsset { data, content_type })
    }
}
