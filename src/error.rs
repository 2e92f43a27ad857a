use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while describing, fetching, transcoding or tagging a track.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transcoding {} failed: {reason}", input.display())]
    Transcode { input: PathBuf, reason: String },

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("video resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("unexpected data from {source_name}: {reason}")]
    Source { source_name: String, reason: String },

    #[error("tagging failed: {0}")]
    Tag(String),

    #[error("io error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ArchiveError::Configuration(message.into())
    }

    pub fn source(source_name: &str, reason: impl Into<String>) -> Self {
        ArchiveError::Source {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Configuration problems are never specific to one track.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ArchiveError::Configuration(_))
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The video index is rate limited or has not caught up yet.
    #[error("video index unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
