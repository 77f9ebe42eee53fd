//! Page-embedded preload metadata
//!
//! Subject pages carry a `<meta id="meta-preload-data" content='...'>` element whose
//! content is JSON keyed by subject id. Missing or unparsable data is not fatal:
//! resolution falls through to the remote API.

use super::{IllustKind, PageEntry, UrlSet, UgoiraMeta};
use crate::error::ResolveError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Id of the marker element holding preload JSON
pub const PRELOAD_MARKER_ID: &str = "meta-preload-data";

/// Access to the preload data of the current page
pub trait EmbeddedSource: Send + Sync {
    /// Raw JSON content of the marker element, if the page has one
    fn preload_data(&self) -> Option<String>;
}

/// No page context; every lookup misses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmbeddedData;

impl EmbeddedSource for NoEmbeddedData {
    fn preload_data(&self) -> Option<String> {
        None
    }
}

/// Embedded source backed by a page's HTML
#[derive(Debug, Clone)]
pub struct PageDocument {
    html: String,
}

impl PageDocument {
    /// Wrap fetched page HTML
    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl EmbeddedSource for PageDocument {
    fn preload_data(&self) -> Option<String> {
        extract_marker_content(&self.html, PRELOAD_MARKER_ID)
    }
}

fn meta_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)] // literal pattern
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)<meta\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("meta tag pattern must compile")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)] // literal pattern
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)\b(?P<name>[a-z][a-z0-9_-]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
            .expect("attribute pattern must compile")
    })
}

/// Find the `content` attribute of the `<meta>` element with the given id
fn extract_marker_content(html: &str, marker_id: &str) -> Option<String> {
    for tag in meta_tag_pattern().find_iter(html) {
        let mut id = None;
        let mut content = None;

        for caps in attribute_pattern().captures_iter(tag.as_str()) {
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .map(|m| m.as_str())
                .unwrap_or("");
            match caps["name"].to_ascii_lowercase().as_str() {
                "id" => id = Some(value),
                "content" => content = Some(value),
                _ => {}
            }
        }

        if id == Some(marker_id) {
            return content.map(unescape_html);
        }
    }
    None
}

fn unescape_html(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Preload JSON: per-subject maps for illustrations, declared page lists, and packaging
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EmbeddedPayload {
    /// Illustration records keyed by subject id
    #[serde(default)]
    pub illust: HashMap<String, EmbeddedIllust>,
    /// Declared page lists keyed by subject id
    #[serde(default)]
    pub pages: HashMap<String, Vec<PageEntry>>,
    /// Animated-image packaging keyed by subject id
    #[serde(default)]
    pub ugoira: HashMap<String, UgoiraMeta>,
}

impl EmbeddedPayload {
    /// Parse marker content
    ///
    /// Failures are reported as [`ResolveError::MetadataMalformed`], which the
    /// resolver treats as recoverable.
    pub fn parse(id: &str, raw: &str) -> Result<Self, ResolveError> {
        serde_json::from_str(raw).map_err(|e| ResolveError::MetadataMalformed {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }
}

/// One illustration record in the preload JSON
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedIllust {
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
}
