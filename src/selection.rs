//! Range selection over resolved assets

use crate::types::{ImageAsset, Selection};

/// Apply a selection to an asset list
///
/// `All` returns a copy of every asset. `Range` is 1-indexed and inclusive; out-of-range
/// bounds are clamped rather than rejected:
/// - `start` is clamped into `[1, len]`
/// - `end` is clamped into `[start, len]`, so an inverted range yields the single asset at `start`
///
/// An empty input always yields an empty output.
pub fn apply(assets: &[ImageAsset], selection: &Selection) -> Vec<ImageAsset> {
    match *selection {
        Selection::All => assets.to_vec(),
        Selection::Range { start, end } => {
            let (first, last) = match clamp_range(assets.len(), start, end) {
                Some(bounds) => bounds,
                None => return Vec::new(),
            };
            assets[first - 1..last].to_vec()
        }
    }
}

/// Clamped 1-based inclusive bounds, or `None` for an empty list
fn clamp_range(len: usize, start: usize, end: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let start = start.clamp(1, len);
    let end = end.clamp(start, len);
    Some((start, end))
}
