//! Common test utilities for illust-dl integration tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use illust_dl::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration pointing the API at a mock server, with near-instant retries
pub fn config_for(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.cookie = Some("PHPSESSID=test-session".to_string());
    config.retry.delay_step = Duration::from_millis(1);
    config
}

/// Every file below `root`, relative and sorted
#[allow(dead_code)]
pub fn saved_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}
