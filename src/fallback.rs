//! Fallback URL chains
//!
//! The image host serves each page in several resolution families. When the
//! full-resolution file is missing or renamed, the medium-resolution copy under
//! `img-master` usually still exists, so it is appended as a derived candidate.

use regex::Regex;
use std::sync::OnceLock;

/// Filename suffix the host appends to medium-resolution files
const MASTER_SUFFIX: &str = "_master1200";

fn original_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)] // literal pattern
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<prefix>.+?)/img-original/(?P<dirs>(?:[^/?#]+/)*)(?P<stem>[^/?#]+?_p\d+)\.(?P<ext>[A-Za-z0-9]+)(?:[?#].*)?$",
        )
        .expect("original-resolution pattern must compile")
    })
}

fn page_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)] // literal pattern
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<head>.*_p)\d+(?P<tail>(?:_[A-Za-z]+\d*)?\.[A-Za-z0-9]+(?:[?#].*)?)$")
            .expect("page-index pattern must compile")
    })
}

/// Build the ordered fallback chain for one asset
///
/// Extras come first in their given order, followed by candidates derived from the
/// primary URL's resolution family. `None` and empty extras are ignored. The primary
/// URL and repeated candidates are dropped; the first occurrence wins.
///
/// # Examples
///
/// ```
/// use illust_dl::fallback::build_fallback_urls;
///
/// let primary = "https://i.example.net/img-original/img/2024/01/02/03/04/05/123_p0.png";
/// let chain = build_fallback_urls(primary, [None::<&str>]);
/// assert_eq!(
///     chain,
///     vec![
///         "https://i.example.net/img-master/img/2024/01/02/03/04/05/123_p0_master1200.jpg",
///         "https://i.example.net/img-master/img/2024/01/02/03/04/05/123_p0_master1200.png",
///     ]
/// );
/// ```
pub fn build_fallback_urls<I, S>(primary: &str, extras: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut chain: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        if candidate.is_empty() || candidate == primary || chain.iter().any(|c| c == candidate) {
            return;
        }
        chain.push(candidate.to_string());
    };

    for extra in extras.into_iter().flatten() {
        push(extra.as_ref().trim());
    }

    for derived in derive_resolution_family(primary) {
        push(&derived);
    }

    chain
}

/// Medium-resolution candidates for an original-resolution URL
///
/// Returns the `.jpg` rendition first and, when the original extension is not
/// `jpg`, the rendition keeping the original extension. URLs outside the
/// original-resolution layout yield nothing.
pub fn derive_resolution_family(primary: &str) -> Vec<String> {
    let Some(caps) = original_pattern().captures(primary) else {
        return Vec::new();
    };

    let prefix = &caps["prefix"];
    let dirs = &caps["dirs"];
    let stem = &caps["stem"];
    let ext = &caps["ext"];

    let mut derived = vec![format!(
        "{prefix}/img-master/{dirs}{stem}{MASTER_SUFFIX}.jpg"
    )];
    if !ext.eq_ignore_ascii_case("jpg") {
        derived.push(format!(
            "{prefix}/img-master/{dirs}{stem}{MASTER_SUFFIX}.{ext}"
        ));
    }
    derived
}

/// Substitute a page index into a sibling page's URL
///
/// Best effort: the host names pages `<id>_p<N>`, so the last `_p<digits>` before
/// the extension is rewritten. Returns `None` when the URL has no page marker.
pub fn guess_page_url(sibling: &str, page_index: usize) -> Option<String> {
    let caps = page_pattern().captures(sibling)?;
    Some(format!("{}{}{}", &caps["head"], page_index, &caps["tail"]))
}
