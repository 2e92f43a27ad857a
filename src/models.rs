use std::fmt;
use std::str::FromStr;

use crate::error::{ArchiveError, Result};

/// Container of the bytes a track carries at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    /// MP4/M4A audio, transcoded to mp3 unless the source keeps it raw.
    Mp4,
}

impl FromStr for AudioFormat {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "mp4" | "m4a" => Ok(AudioFormat::Mp4),
            other => Err(ArchiveError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Mp3 => f.write_str("mp3"),
            AudioFormat::Mp4 => f.write_str("mp4"),
        }
    }
}

/// Keyword -> numeric label used to tell apart sub-series of one playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRule {
    pub keyword: String,
    pub label: u32,
}

impl PrefixRule {
    pub fn new(keyword: impl Into<String>, label: u32) -> Self {
        Self {
            keyword: keyword.into(),
            label,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixRules(Vec<PrefixRule>);

impl PrefixRules {
    pub fn iter(&self) -> impl Iterator<Item = &PrefixRule> {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for PrefixRules {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(keyword, label)| PrefixRule::new(keyword, label))
                .collect(),
        )
    }
}

/// Normalized metadata of one track. Built by a collector, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub title: String,
    /// `YYYY-MM-DD` or a zero-padded sequence index; only used as a sort key.
    pub created: String,
    /// Unique within (artist, playlist).
    pub permalink: String,
    pub permalink_url: String,
    pub artist: String,
    pub artist_normalized: String,
    pub playlist: String,
    pub audio_format: AudioFormat,
    pub prefix_rules: PrefixRules,
}

/// ASCII-ish artist token used for directory names and hashtags.
pub fn normalize_artist(artist: &str) -> String {
    artist.trim().replace(' ', "_")
}

/// Start offset for trimming video intros, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimOffset(u32);

impl TrimOffset {
    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }
}

impl FromStr for TrimOffset {
    type Err = ArchiveError;

    /// Accepts `S`, `M:S` and `H:M:S`.
    fn from_str(s: &str) -> Result<Self> {
        let mut total: u32 = 0;
        for part in s.trim().split(':') {
            let value: u32 = part
                .parse()
                .map_err(|_| ArchiveError::config(format!("invalid trim offset {s:?}")))?;
            total = total
                .checked_mul(60)
                .and_then(|t| t.checked_add(value))
                .ok_or_else(|| ArchiveError::config(format!("trim offset {s:?} is too large")))?;
        }
        Ok(Self::from_seconds(total))
    }
}

/// Audio stream a video page resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub url: String,
    /// Container extension as reported by the resolver (`m4a`, `webm`).
    pub ext: String,
}

/// Where the audio bytes of a track come from. Owned by exactly one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePayload {
    /// Hosting API endpoint that redirects to the actual stream.
    HostedStream { stream_endpoint: String },
    DirectUrl { url: String },
    /// Video page. `stream` is set when the collector already resolved it;
    /// otherwise the page is resolved when the track is fetched.
    VideoReference {
        page_url: String,
        stream: Option<ResolvedStream>,
        trim: Option<TrimOffset>,
        transcode: bool,
    },
}
