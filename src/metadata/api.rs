//! Remote metadata API
//!
//! Two ajax endpoints are used:
//! - `GET {base}/ajax/illust/{id}` - illustration detail (title, author, urls, pages, type)
//! - `GET {base}/ajax/illust/{id}/ugoira_meta` - packaging detail for animated subjects
//!
//! Both wrap their payload in `{ "error": bool, "message": string, "body": ... }`.

use super::{IllustKind, PageEntry, UrlSet};
use crate::config::ApiConfig;
use crate::error::{Error, ResolveError, Result};
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, REFERER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Remote metadata provider
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Fetch illustration detail for a subject
    async fn illust_detail(&self, id: &str) -> std::result::Result<IllustDetail, ResolveError>;

    /// Fetch packaging detail for an animated subject
    async fn ugoira_meta(&self, id: &str) -> std::result::Result<UgoiraMeta, ResolveError>;
}

/// Illustration detail body
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllustDetail {
    /// Subject id
    #[serde(default)]
    pub illust_id: Option<String>,
    /// Title
    #[serde(default, alias = "title")]
    pub illust_title: Option<String>,
    /// Author display name
    #[serde(default)]
    pub user_name: Option<String>,
    /// Declared kind
    #[serde(default)]
    pub illust_type: IllustKind,
    /// Declared number of pages
    #[serde(default)]
    pub page_count: Option<u32>,
    /// URLs of the first page
    #[serde(default)]
    pub urls: UrlSet,
    /// Per-page URL lists
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

/// Packaging detail of an animated subject
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UgoiraMeta {
    /// Archive of medium-resolution frames
    #[serde(default)]
    pub src: Option<String>,
    /// Archive of original-resolution frames
    #[serde(default, rename = "originalSrc")]
    pub original_src: Option<String>,
    /// Frame image MIME type
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Frame list with per-frame delays
    #[serde(default)]
    pub frames: Vec<UgoiraFrame>,
}

/// One frame of an animated subject
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UgoiraFrame {
    /// File name inside the archive
    pub file: String,
    /// Display time in milliseconds
    #[serde(default)]
    pub delay: u32,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: String,
    // Error responses send `[]` here, so the typed body is decoded only after the error check
    #[serde(default)]
    body: serde_json::Value,
}

/// Build the HTTP client shared by metadata and asset requests
///
/// Sends the configured Referer, User-Agent, and session cookie with every request.
pub fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();

    let referer = HeaderValue::from_str(&config.referer).map_err(|e| Error::Config {
        message: format!("invalid referer: {}", e),
        key: Some("api.referer".to_string()),
    })?;
    headers.insert(REFERER, referer);

    if let Some(cookie) = &config.cookie {
        let mut value = HeaderValue::from_str(cookie).map_err(|e| Error::Config {
            message: format!("invalid cookie: {}", e),
            key: Some("api.cookie".to_string()),
        })?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.timeout)
        .build()
        .map_err(Error::Network)
}

/// [`MetadataApi`] over HTTPS
#[derive(Clone, Debug)]
pub struct HttpMetadataApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataApi {
    /// Create a client from API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self::with_client(build_http_client(config)?, &config.base_url))
    }

    /// Reuse an existing client
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_body<T: DeserializeOwned>(
        &self,
        id: &str,
        path: &str,
    ) -> std::result::Result<T, ResolveError> {
        let url = format!("{}{}", self.base_url, path);
        let failed = |status: Option<u16>, message: String| ResolveError::RemoteRequestFailed {
            id: id.to_string(),
            status,
            message,
        };

        tracing::debug!(subject_id = id, url = %url, "Requesting metadata");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("timeout requesting '{}'", url)
                } else if e.is_connect() {
                    format!("connection failed for '{}': {}", url, e)
                } else {
                    format!("request to '{}' failed: {}", url, e)
                };
                failed(None, message)
            })?;

        let status = response.status();
        if !status.is_success() {
            // The API reports its own message in the envelope even on 4xx
            let detail = response
                .json::<ApiEnvelope>()
                .await
                .ok()
                .map(|env| env.message)
                .filter(|m| !m.is_empty());
            return Err(failed(
                Some(status.as_u16()),
                match detail {
                    Some(message) => format!("HTTP {}: {}", status, message),
                    None => format!("HTTP {}", status),
                },
            ));
        }

        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| failed(Some(status.as_u16()), format!("unreadable body: {}", e)))?;

        if envelope.error {
            let message = if envelope.message.is_empty() {
                "API reported an error".to_string()
            } else {
                envelope.message
            };
            return Err(failed(Some(status.as_u16()), message));
        }

        if envelope.body.is_null() {
            return Err(ResolveError::MetadataUnavailable { id: id.to_string() });
        }

        serde_json::from_value(envelope.body)
            .map_err(|e| failed(Some(status.as_u16()), format!("unexpected body shape: {}", e)))
    }
}

#[async_trait]
impl MetadataApi for HttpMetadataApi {
    async fn illust_detail(&self, id: &str) -> std::result::Result<IllustDetail, ResolveError> {
        let path = format!("/ajax/illust/{}", urlencode_segment(id));
        self.get_body(id, &path).await
    }

    async fn ugoira_meta(&self, id: &str) -> std::result::Result<UgoiraMeta, ResolveError> {
        let path = format!("/ajax/illust/{}/ugoira_meta", urlencode_segment(id));
        self.get_body(id, &path).await
    }
}

/// Subject ids are numeric in practice; anything else is kept from escaping the path
fn urlencode_segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes()).collect()
}
