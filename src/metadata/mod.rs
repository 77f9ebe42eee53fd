//! Metadata sources, normalization, and resolution.
//!
//! Two heterogeneous sources describe a subject:
//! - [`embedded`] - the preload JSON embedded in the subject's page
//! - [`api`] - the remote ajax endpoints, used when the page has nothing usable
//!
//! Both are wrapped in [`RawMetadata`] and converted to one intermediate record, so
//! [`normalize`] has a single asset-extraction path. [`resolver`] orchestrates the
//! sources with single-flight and a single-slot cache.

pub mod api;
pub mod embedded;
pub mod normalize;
pub mod resolver;

pub use api::{HttpMetadataApi, IllustDetail, MetadataApi, UgoiraFrame, UgoiraMeta};
pub use embedded::{EmbeddedIllust, EmbeddedPayload, EmbeddedSource, NoEmbeddedData, PageDocument};
pub use normalize::normalize;
pub use resolver::MetadataResolver;

use serde::{Deserialize, Serialize};

/// Kind of subject as declared by either source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum IllustKind {
    /// Single or multi-page illustration
    #[default]
    Illustration,
    /// Multi-page manga
    Manga,
    /// Animated image packaged as a frame archive
    Ugoira,
}

impl From<u8> for IllustKind {
    fn from(value: u8) -> Self {
        match value {
            1 => IllustKind::Manga,
            2 => IllustKind::Ugoira,
            _ => IllustKind::Illustration,
        }
    }
}

impl From<IllustKind> for u8 {
    fn from(kind: IllustKind) -> Self {
        match kind {
            IllustKind::Illustration => 0,
            IllustKind::Manga => 1,
            IllustKind::Ugoira => 2,
        }
    }
}

/// Resolution family URLs of one image
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlSet {
    /// Full resolution
    #[serde(default)]
    pub original: Option<String>,
    /// Medium resolution
    #[serde(default)]
    pub regular: Option<String>,
    /// Small rendition
    #[serde(default)]
    pub small: Option<String>,
    /// Thumbnail
    #[serde(default)]
    pub thumb: Option<String>,
    /// Tiny thumbnail
    #[serde(default)]
    pub mini: Option<String>,
}

impl UrlSet {
    /// Best available URL, highest resolution first
    pub fn best(&self) -> Option<&str> {
        [&self.original, &self.regular, &self.small]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|u| !u.trim().is_empty())
    }

    /// Lower-resolution renditions usable as fallbacks
    pub fn alternates(&self) -> [Option<&str>; 2] {
        [self.regular.as_deref(), self.small.as_deref()]
    }
}

/// One declared page of a multi-page set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Page URLs
    #[serde(default)]
    pub urls: UrlSet,
    /// Pixel width
    #[serde(default)]
    pub width: Option<u32>,
    /// Pixel height
    #[serde(default)]
    pub height: Option<u32>,
}

/// Raw metadata from one of the two sources
#[derive(Clone, Debug)]
pub enum RawMetadata {
    /// Preload JSON embedded in the page
    Embedded(EmbeddedPayload),
    /// Ajax detail response plus, for animated subjects, the packaging response
    Remote {
        /// Illustration detail body
        detail: IllustDetail,
        /// Packaging detail body
        ugoira: Option<UgoiraMeta>,
    },
}

/// Source-independent record feeding asset extraction
#[derive(Clone, Debug, Default)]
pub(crate) struct IllustRecord {
    pub(crate) title: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) kind: IllustKind,
    pub(crate) page_count: usize,
    pub(crate) urls: UrlSet,
    pub(crate) pages: Vec<PageEntry>,
    pub(crate) ugoira: Option<UgoiraMeta>,
}

impl RawMetadata {
    /// Convert into the shared record shape; `None` when the source has no record for `id`
    pub(crate) fn into_record(self, id: &str) -> Option<IllustRecord> {
        match self {
            RawMetadata::Embedded(mut payload) => {
                let illust = payload.illust.remove(id)?;
                Some(IllustRecord {
                    title: illust.illust_title,
                    author: illust.user_name,
                    kind: illust.illust_type,
                    page_count: illust.page_count.unwrap_or(1) as usize,
                    urls: illust.urls,
                    pages: payload.pages.remove(id).unwrap_or_default(),
                    ugoira: payload.ugoira.remove(id),
                })
            }
            RawMetadata::Remote { detail, ugoira } => Some(IllustRecord {
                title: detail.illust_title,
                author: detail.user_name,
                kind: detail.illust_type,
                page_count: detail.page_count.unwrap_or(1) as usize,
                urls: detail.urls,
                pages: detail.pages,
                ugoira,
            }),
        }
    }
}
