//! Merging of assets that point at the same canonical URL
//!
//! The same page can be reached from more than one code path (a declared page list
//! and a guessed URL, or an embedded record and an API record). Those entries are
//! collapsed into one asset whose fallback chain is the union of all chains seen.

use crate::types::ImageAsset;
use std::collections::HashMap;

/// Collapse assets sharing a primary URL
///
/// The first record for a URL keeps its position, page index, and variant. Fallbacks
/// from later records are appended in the order first observed, skipping the
/// canonical URL and entries already present. Running this on its own output
/// returns the same list.
pub fn dedupe_assets(assets: Vec<ImageAsset>) -> Vec<ImageAsset> {
    let mut merged: Vec<ImageAsset> = Vec::with_capacity(assets.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(assets.len());

    for asset in assets {
        match positions.get(asset.url()) {
            Some(&pos) => {
                let added = asset.fallbacks().len();
                merged[pos].extend_fallbacks(asset.fallbacks().iter().cloned());
                tracing::trace!(
                    url = asset.url(),
                    candidates = added,
                    "Merged duplicate asset fallbacks"
                );
            }
            None => {
                positions.insert(asset.url().to_string(), merged.len());
                merged.push(asset);
            }
        }
    }

    merged
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetVariant;

    fn sample() -> Vec<ImageAsset> {
        vec![
            ImageAsset::new("u0", 0, AssetVariant::Page).with_fallbacks(["a", "b"]),
            ImageAsset::new("u1", 1, AssetVariant::Guessed).with_fallbacks(["c"]),
            ImageAsset::new("u0", 5, AssetVariant::Guessed).with_fallbacks(["b", "u0", "d"]),
            ImageAsset::new("u1", 1, AssetVariant::Page).with_fallbacks(["e", "c"]),
        ]
    }

    #[test]
    fn first_record_wins_and_fallbacks_union() {
        let result = dedupe_assets(sample());

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].url(), "u0");
        assert_eq!(result[0].page_index(), 0, "first record's fields are kept");
        assert_eq!(result[0].variant(), AssetVariant::Page);
        assert_eq!(result[0].fallbacks(), ["a", "b", "d"]);

        assert_eq!(result[1].variant(), AssetVariant::Guessed);
        assert_eq!(result[1].fallbacks(), ["c", "e"]);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let once = dedupe_assets(sample());
        let twice = dedupe_assets(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn unique_input_is_untouched() {
        let input = vec![
            ImageAsset::new("x", 0, AssetVariant::Original).with_fallbacks(["y"]),
            ImageAsset::new("z", 1, AssetVariant::Page),
        ];
        assert_eq!(dedupe_assets(input.clone()), input);
        assert!(dedupe_assets(Vec::new()).is_empty());
    }
}
