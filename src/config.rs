//! Configuration types for illust-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
///
/// Every field has a serde default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Retry failed asset fetches (default: true)
    ///
    /// When disabled each URL candidate is tried exactly once.
    #[serde(default = "default_true")]
    pub retry_enabled: bool,

    /// Append the subject id marker to every saved filename (default: false)
    #[serde(default)]
    pub anti_theft_suffix_enabled: bool,

    /// Top-level folder all saved paths are placed under (default: "illust-dl")
    #[serde(default = "default_root_folder_name")]
    pub root_folder_name: String,

    /// Locale used for placeholder titles and author names (default: en)
    #[serde(default)]
    pub locale: Locale,

    /// What the sink does when a target path already exists (default: rename)
    #[serde(default)]
    pub conflict_policy: FileCollisionAction,

    /// Per-candidate retry behavior
    #[serde(default)]
    pub retry: RetryConfig,

    /// Remote metadata API and asset host settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_enabled: true,
            anti_theft_suffix_enabled: false,
            root_folder_name: default_root_folder_name(),
            locale: Locale::default(),
            conflict_policy: FileCollisionAction::default(),
            retry: RetryConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Number of tries made against one URL candidate
    pub fn attempts_per_candidate(&self) -> u32 {
        if self.retry_enabled {
            self.retry.max_attempts
        } else {
            1
        }
    }

    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if self.root_folder_name.trim().is_empty() {
            return Err(Error::Config {
                message: "root folder name must not be empty".to_string(),
                key: Some("root_folder_name".to_string()),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "max_attempts must be at least 1".to_string(),
                key: Some("retry.max_attempts".to_string()),
            });
        }

        if let Err(e) = url::Url::parse(&self.api.base_url) {
            return Err(Error::Config {
                message: format!("invalid base_url '{}': {}", self.api.base_url, e),
                key: Some("api.base_url".to_string()),
            });
        }

        Ok(())
    }
}

/// Retry behavior for a single URL candidate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Tries per URL candidate when retries are enabled (default: 4)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay step; the wait before retry `n` is `delay_step * n` (default: 150ms)
    #[serde(default = "default_delay_step", with = "duration_millis_serde")]
    pub delay_step: Duration,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_step: default_delay_step(),
            jitter: false,
        }
    }
}

/// Remote metadata API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Site origin the ajax endpoints live under (default: "https://www.pixiv.net")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Referer sent with metadata and asset requests; the image host rejects requests without it
    #[serde(default = "default_referer")]
    pub referer: String,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Session cookie supplied by the calling environment
    #[serde(default)]
    pub cookie: Option<String>,

    /// Per-request transport timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            referer: default_referer(),
            user_agent: default_user_agent(),
            cookie: None,
            timeout: default_timeout(),
        }
    }
}

/// Locale for generated placeholder strings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    /// English (default)
    #[default]
    En,
    /// Japanese
    Ja,
    /// Simplified Chinese
    Zh,
}

impl Locale {
    /// Title used when a record has none
    pub fn untitled(&self, subject_id: &str) -> String {
        match self {
            Locale::En => format!("Untitled {subject_id}"),
            Locale::Ja => format!("無題 {subject_id}"),
            Locale::Zh => format!("无标题 {subject_id}"),
        }
    }

    /// Author name used when a record has none
    pub fn unknown_author(&self, subject_id: &str) -> String {
        match self {
            Locale::En => format!("Unknown artist ({subject_id})"),
            Locale::Ja => format!("不明な作者 ({subject_id})"),
            Locale::Zh => format!("未知作者 ({subject_id})"),
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

fn default_true() -> bool {
    true
}

fn default_root_folder_name() -> String {
    "illust-dl".to_string()
}

fn default_max_attempts() -> u32 {
    4
}

fn default_delay_step() -> Duration {
    Duration::from_millis(150)
}

fn default_base_url() -> String {
    "https://www.pixiv.net".to_string()
}

fn default_referer() -> String {
    "https://www.pixiv.net/".to_string()
}

fn default_user_agent() -> String {
    concat!("illust-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Retry delays are sub-second, so they round-trip as milliseconds
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
