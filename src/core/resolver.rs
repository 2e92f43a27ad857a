use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ArchiveError, ResolveError, Result};

/// Metadata and best audio stream of a video page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub title: String,
    pub author: String,
    /// `YYYY-MM-DD`
    pub published: String,
    pub audio_url: String,
    pub audio_ext: String,
}

pub trait VideoResolver {
    fn check_available(&self) -> Result<()>;

    fn resolve(&self, page_url: &str) -> std::result::Result<VideoInfo, ResolveError>;
}

/// Resolves video pages with `yt-dlp --dump-json`.
pub struct YtDlp;

#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    title: String,
    uploader: Option<String>,
    channel: Option<String>,
    /// `YYYYMMDD`
    upload_date: Option<String>,
    url: Option<String>,
    ext: Option<String>,
}

/// Stderr fragments meaning "come back later" rather than "broken".
const TRANSIENT_MARKERS: &[&str] = &[
    "HTTP Error 429",
    "Too Many Requests",
    "HTTP Error 503",
    "Sign in to confirm",
    "temporarily unavailable",
];

pub fn classify_failure(stderr: &str) -> ResolveError {
    let reason = stderr.trim().to_string();
    if TRANSIENT_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        ResolveError::Unavailable(reason)
    } else {
        ResolveError::Failed(reason)
    }
}

fn dashed_date(raw: &str) -> String {
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        raw.to_string()
    }
}

fn parse_metadata(json: &[u8]) -> std::result::Result<VideoInfo, ResolveError> {
    let meta: YtDlpMetadata = serde_json::from_slice(json)
        .map_err(|e| ResolveError::Failed(format!("unreadable yt-dlp output: {e}")))?;
    let audio_url = meta
        .url
        .ok_or_else(|| ResolveError::Failed("yt-dlp returned no stream url".to_string()))?;
    Ok(VideoInfo {
        title: meta.title,
        author: meta.uploader.or(meta.channel).unwrap_or_default(),
        published: meta.upload_date.as_deref().map(dashed_date).unwrap_or_default(),
        audio_url,
        audio_ext: meta.ext.unwrap_or_else(|| "m4a".to_string()),
    })
}

impl VideoResolver for YtDlp {
    fn check_available(&self) -> Result<()> {
        which::which("yt-dlp")
            .map(|_| ())
            .map_err(|_| ArchiveError::config("yt-dlp not found in PATH"))
    }

    fn resolve(&self, page_url: &str) -> std::result::Result<VideoInfo, ResolveError> {
        debug!("resolving {}", page_url);
        let output = Command::new("yt-dlp")
            .arg("--dump-json")
            .arg("--no-download")
            .arg("--no-playlist")
            .arg("-f")
            .arg("bestaudio[ext=m4a]/bestaudio")
            .arg(page_url)
            .output()
            .map_err(|e| ResolveError::Failed(format!("could not start yt-dlp: {e}")))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }
        parse_metadata(&output.stdout)
    }
}
