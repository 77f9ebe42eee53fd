//! Path sanitization and candidate path construction
//!
//! Every saved file gets several candidate paths, most descriptive first. The sink may
//! reject a path as an invalid filename or as too long; the downloader then moves on to
//! the next, flatter candidate.

use crate::config::FileCollisionAction;
use crate::error::{DownloadError, Error, Result};
use crate::types::AssetVariant;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Maximum characters kept in one path segment
pub const SEGMENT_MAX_CHARS: usize = 80;

/// Maximum characters in a full candidate path
pub const PATH_MAX_CHARS: usize = 180;

/// Smallest accepted path ceiling; the timestamped fallback always fits it
pub const MIN_PATH_CHARS: usize = 32;

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize one path segment
///
/// The value is NFC-normalized, illegal and control characters become spaces, whitespace
/// runs collapse to one space, and trailing dots and spaces are trimmed. The result is cut
/// to [`SEGMENT_MAX_CHARS`]. An empty result is replaced by the sanitized `fallback`.
/// Reserved device names get a `_` appended to their stem.
///
/// # Examples
///
/// ```
/// use illust_dl::paths::sanitize_segment;
///
/// assert_eq!(sanitize_segment("a/b:c?", "x"), "a b c");
/// assert_eq!(sanitize_segment("CON", "x"), "CON_");
/// assert_eq!(sanitize_segment(" .. ", "fallback"), "fallback");
/// ```
pub fn sanitize_segment(value: &str, fallback: &str) -> String {
    let cleaned = clean(value);
    let cleaned = if cleaned.is_empty() {
        clean(fallback)
    } else {
        cleaned
    };
    if cleaned.is_empty() {
        return "_".to_string();
    }
    disambiguate_reserved(cleaned)
}

fn clean(value: &str) -> String {
    let replaced: String = value
        .nfc()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = trim_trailing(&collapsed).chars().take(SEGMENT_MAX_CHARS).collect();
    trim_trailing(&truncated).to_string()
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches(['.', ' '])
}

fn disambiguate_reserved(mut segment: String) -> String {
    let stem_len = segment.find('.').unwrap_or(segment.len());
    let stem = segment[..stem_len].to_ascii_uppercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        segment.insert(stem_len, '_');
    }
    segment
}

/// Where the file extension may come from
#[derive(Clone, Copy, Debug)]
pub struct ExtensionSource<'a> {
    /// URL the bytes were fetched from
    pub url: &'a str,
    /// Response content type, when known
    pub content_type: Option<&'a str>,
}

impl ExtensionSource<'_> {
    /// Extension from the URL path, then the content type, then the variant default
    pub fn resolve(&self, variant: AssetVariant) -> String {
        extension_from_url(self.url)
            .or_else(|| self.content_type.and_then(extension_from_content_type))
            .unwrap_or_else(|| variant.default_extension().to_string())
    }
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    let (_, ext) = name.rsplit_once('.')?;
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

fn extension_from_content_type(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/zip" | "application/x-zip-compressed" => "zip",
        _ => return None,
    };
    Some(ext.to_string())
}

/// Inputs for [`build_candidate_paths`]
#[derive(Clone, Copy, Debug)]
pub struct PathRequest<'a> {
    /// Top-level folder name
    pub root: &'a str,
    /// Author display name
    pub author: &'a str,
    /// Subject id
    pub subject_id: &'a str,
    /// Subject title
    pub title: &'a str,
    /// Zero-based page index
    pub page_index: usize,
    /// Provenance of the fetched URL
    pub variant: AssetVariant,
    /// Source of the file extension
    pub extension_source: ExtensionSource<'a>,
    /// Append the subject id marker to the filename
    pub anti_theft_suffix: bool,
}

/// Build candidate paths in priority order
///
/// Layouts, most descriptive first:
/// 1. `root/author/id_title/NNN.ext`
/// 2. `root/author/id/NNN.ext`
/// 3. `root/id/NNN.ext`
/// 4. `id_NNN.ext`
///
/// `NNN` is the zero-padded page index, so pages of one subject never collide.
/// Candidates longer than [`PATH_MAX_CHARS`] are dropped; if none remain, a single
/// `id_NNN_timestamp.ext` path is returned.
pub fn build_candidate_paths(request: &PathRequest<'_>) -> Vec<PathBuf> {
    build_candidate_paths_within(request, PATH_MAX_CHARS)
}

/// [`build_candidate_paths`] with an explicit length ceiling
///
/// Ceilings below [`MIN_PATH_CHARS`] are raised to it.
pub fn build_candidate_paths_within(request: &PathRequest<'_>, max_chars: usize) -> Vec<PathBuf> {
    let max_chars = max_chars.max(MIN_PATH_CHARS);
    let id = sanitize_segment(request.subject_id, "unknown");
    let root = sanitize_segment(request.root, "illust-dl");
    let author = sanitize_segment(request.author, &id);
    let title = sanitize_segment(request.title, &id);
    let ext = request.extension_source.resolve(request.variant);
    let suffix = if request.anti_theft_suffix {
        format!("_id{id}")
    } else {
        String::new()
    };

    let page = format!("{:03}", request.page_index);
    let file = format!("{page}{suffix}.{ext}");
    let bare = format!("{id}_{page}{suffix}.{ext}");
    let titled_folder = sanitize_segment(&format!("{id}_{title}"), &id);

    let layouts: [Vec<&str>; 4] = [
        vec![root.as_str(), author.as_str(), titled_folder.as_str(), file.as_str()],
        vec![root.as_str(), author.as_str(), id.as_str(), file.as_str()],
        vec![root.as_str(), id.as_str(), file.as_str()],
        vec![bare.as_str()],
    ];

    let mut candidates: Vec<PathBuf> = Vec::with_capacity(layouts.len());
    for segments in layouts {
        let joined = segments.join("/");
        if joined.chars().count() > max_chars {
            tracing::debug!(path = %joined, max_chars, "Candidate path exceeds length ceiling");
            continue;
        }
        let path: PathBuf = segments.iter().collect();
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }

    if candidates.is_empty() {
        candidates.push(timestamped_path(&id, &page, &ext, max_chars));
    }

    candidates
}

/// Last-resort name built from the subject id and the current time
///
/// The id is cut first, then the timestamp, so the name fits any ceiling of at least
/// [`MIN_PATH_CHARS`].
fn timestamped_path(id: &str, page: &str, ext: &str, max_chars: usize) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
    // One id character, the separators, the page and the extension
    let fixed = 1 + page.chars().count() + 2 + 1 + ext.chars().count();
    let stamp: String = stamp.chars().take(max_chars.saturating_sub(fixed)).collect();

    let tail = format!("_{page}_{stamp}.{ext}");
    let keep = max_chars.saturating_sub(tail.chars().count()).max(1);
    let head: String = id.chars().take(keep).collect();
    PathBuf::from(format!("{head}{tail}"))
}

/// Outcome of checking a target path against the collision policy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathDecision {
    /// Write to this path
    Write(PathBuf),
    /// The file already exists and the policy keeps it
    KeepExisting(PathBuf),
}

/// Decide where a file goes, handling collisions according to the specified action
///
/// For `Rename`, an existing `name.ext` becomes `name (1).ext`, `name (2).ext`, and so on.
/// For `Skip`, an existing file is kept. For `Overwrite`, the path is used unchanged.
///
/// # Examples
///
/// ```no_run
/// use illust_dl::config::FileCollisionAction;
/// use illust_dl::paths::{PathDecision, resolve_collision};
/// use std::path::Path;
///
/// # async fn example() -> illust_dl::Result<()> {
/// let path = Path::new("/tmp/illust-dl-doc/000.png");
/// // If 000.png exists, writes go to "000 (1).png"
/// if let PathDecision::Write(target) = resolve_collision(path, FileCollisionAction::Rename).await? {
///     println!("writing {}", target.display());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn resolve_collision(path: &Path, action: FileCollisionAction) -> Result<PathDecision> {
    match action {
        FileCollisionAction::Overwrite => Ok(PathDecision::Write(path.to_path_buf())),
        FileCollisionAction::Skip => {
            if exists(path).await {
                return Ok(PathDecision::KeepExisting(path.to_path_buf()));
            }
            Ok(PathDecision::Write(path.to_path_buf()))
        }
        FileCollisionAction::Rename => {
            if !exists(path).await {
                return Ok(PathDecision::Write(path.to_path_buf()));
            }

            let rejected = |reason: &str| {
                Error::Download(DownloadError::PathRejected {
                    path: path.display().to_string(),
                    reason: reason.to_string(),
                })
            };
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| rejected("cannot extract file stem"))?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path
                .parent()
                .ok_or_else(|| rejected("cannot extract parent directory"))?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !exists(&new_path).await {
                    return Ok(PathDecision::Write(new_path));
                }
            }

            Err(Error::Download(DownloadError::CommitFailed {
                path: path.display().to_string(),
                reason: format!(
                    "could not find unique filename after {} attempts",
                    MAX_RENAME_ATTEMPTS
                ),
            }))
        }
    }
}

/// Unreadable locations count as absent; the write itself reports the real error
async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
