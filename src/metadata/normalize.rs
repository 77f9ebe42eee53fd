//! Conversion of raw metadata into [`IllustrationMetadata`]

use super::{IllustKind, IllustRecord, RawMetadata};
use crate::config::Locale;
use crate::dedup::dedupe_assets;
use crate::error::ResolveError;
use crate::fallback::{build_fallback_urls, guess_page_url};
use crate::types::{AssetVariant, IllustrationMetadata, ImageAsset};

/// Upper bound on pages per subject; larger declared counts are clamped
pub const MAX_PAGE_COUNT: usize = 200;

/// Normalize either source into canonical metadata
///
/// Fails with [`ResolveError::MetadataUnavailable`] when the source has no record for
/// `id`, and with [`ResolveError::NoDownloadableAssets`] when the record yields no
/// asset after deduplication. Missing titles and authors get locale placeholders.
pub fn normalize(
    id: &str,
    raw: RawMetadata,
    locale: Locale,
) -> Result<IllustrationMetadata, ResolveError> {
    let record = raw
        .into_record(id)
        .ok_or_else(|| ResolveError::MetadataUnavailable { id: id.to_string() })?;

    let assets = dedupe_assets(extract_assets(&record));
    if assets.is_empty() {
        return Err(ResolveError::NoDownloadableAssets { id: id.to_string() });
    }

    let title = non_blank(record.title).unwrap_or_else(|| locale.untitled(id));
    let author = non_blank(record.author).unwrap_or_else(|| locale.unknown_author(id));

    Ok(IllustrationMetadata {
        id: id.to_string(),
        title,
        author,
        assets,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn asset_with_chain<'a>(
    url: &str,
    page_index: usize,
    variant: AssetVariant,
    extras: impl IntoIterator<Item = Option<&'a str>>,
) -> ImageAsset {
    ImageAsset::new(url, page_index, variant).with_fallbacks(build_fallback_urls(url, extras))
}

/// Shared extraction routine for both sources
pub(crate) fn extract_assets(record: &IllustRecord) -> Vec<ImageAsset> {
    match record.kind {
        IllustKind::Ugoira => ugoira_asset(record).into_iter().collect(),
        _ if record.page_count > 1 || record.pages.len() > 1 => page_assets(record),
        _ => original_asset(record).into_iter().collect(),
    }
}

fn original_asset(record: &IllustRecord) -> Option<ImageAsset> {
    let primary = record
        .urls
        .best()
        .or_else(|| record.pages.first().and_then(|p| p.urls.best()))?;
    Some(asset_with_chain(
        primary,
        0,
        AssetVariant::Original,
        record.urls.alternates(),
    ))
}

/// Animated subjects need packaging detail; without it the record is unusable
fn ugoira_asset(record: &IllustRecord) -> Option<ImageAsset> {
    let packaging = record.ugoira.as_ref()?;
    let primary = [&packaging.original_src, &packaging.src]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|u| !u.trim().is_empty())?;

    Some(asset_with_chain(
        primary,
        0,
        AssetVariant::Ugoira,
        [packaging.src.as_deref(), record.urls.original.as_deref()],
    ))
}

fn page_assets(record: &IllustRecord) -> Vec<ImageAsset> {
    let page_count = if record.page_count > MAX_PAGE_COUNT {
        tracing::warn!(
            declared = record.page_count,
            max = MAX_PAGE_COUNT,
            "Declared page count exceeds limit, clamping"
        );
        MAX_PAGE_COUNT
    } else {
        record.page_count
    };

    let mut assets = Vec::new();

    for (index, page) in record.pages.iter().take(MAX_PAGE_COUNT).enumerate() {
        let Some(primary) = page.urls.best() else {
            tracing::debug!(page = index, "Declared page has no usable URL");
            continue;
        };
        assets.push(asset_with_chain(
            primary,
            index,
            AssetVariant::Page,
            page.urls.alternates(),
        ));
    }

    // Page 0 of a record without a declared list is authoritative from the top-level urls
    let mut declared = record.pages.len().min(MAX_PAGE_COUNT);
    let seed_urls = match record.pages.first() {
        Some(first) => &first.urls,
        None => {
            if let Some(primary) = record.urls.best() {
                assets.push(asset_with_chain(
                    primary,
                    0,
                    AssetVariant::Page,
                    record.urls.alternates(),
                ));
            }
            declared = 1;
            &record.urls
        }
    };

    if page_count <= declared {
        return assets;
    }

    let Some(seed) = seed_urls.best() else {
        return assets;
    };
    let regular_seed = seed_urls.regular.as_deref();

    for index in declared..page_count {
        let Some(guessed) = guess_page_url(seed, index) else {
            tracing::debug!(seed, "Seed URL has no page marker; cannot guess remaining pages");
            break;
        };
        let guessed_regular = regular_seed.and_then(|r| guess_page_url(r, index));
        assets.push(asset_with_chain(
            &guessed,
            index,
            AssetVariant::Guessed,
            [guessed_regular.as_deref()],
        ));
    }

    assets
}
