use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::retry::RetryPolicy;
use crate::core::transcode::{TranscodeSettings, DEFAULT_BITRATE};
use crate::error::{ArchiveError, Result};

/// Contents of the secrets file, read once before any track is collected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Segments of the archive root, joined under the filesystem root.
    pub download_path: Vec<String>,
    #[serde(default)]
    pub soundcloud_token: Option<String>,
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
    #[serde(default = "default_backoff_seconds")]
    pub retry_backoff_seconds: u64,
    #[serde(default)]
    pub retry_max_attempts: Option<u32>,
    #[serde(default = "default_true")]
    pub keep_failed_transcode_input: bool,
    #[serde(default)]
    pub podcast: Option<PodcastConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PodcastConfig {
    pub page_url: String,
    pub artist: String,
    pub artist_eng: String,
    pub playlist: String,
}

fn default_bitrate() -> u32 {
    DEFAULT_BITRATE
}

fn default_backoff_seconds() -> u64 {
    30 * 60
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn download_root(&self) -> PathBuf {
        let mut root = PathBuf::from(MAIN_SEPARATOR_STR);
        root.extend(&self.download_path);
        root
    }

    pub fn soundcloud_token(&self) -> Result<&str> {
        self.soundcloud_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ArchiveError::config("SoundcloudToken is missing from the secrets file"))
    }

    pub fn podcast(&self) -> Result<&PodcastConfig> {
        self.podcast
            .as_ref()
            .ok_or_else(|| ArchiveError::config("Podcast section is missing from the secrets file"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_secs(self.retry_backoff_seconds),
            max_attempts: self.retry_max_attempts,
        }
    }

    pub fn transcode_settings(&self) -> TranscodeSettings {
        TranscodeSettings {
            bitrate: self.bitrate,
            keep_failed_input: self.keep_failed_transcode_input,
        }
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_json::from_str(content)
        .map_err(|e| ArchiveError::config(format!("malformed secrets file: {e}")))?;
    if config.download_path.is_empty() {
        return Err(ArchiveError::config("DownloadPath must not be empty"));
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ArchiveError::config(format!("cannot read secrets file {}: {e}", path.display()))
    })?;
    parse_config(&content)
}
