use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{ArchiveError, Result};
use crate::models::TrimOffset;

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: u32 = 2;
pub const DEFAULT_BITRATE: u32 = 192_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeSettings {
    pub bitrate: u32,
    /// Keep the pre-transcode input when the transcoder fails.
    pub keep_failed_input: bool,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            bitrate: DEFAULT_BITRATE,
            keep_failed_input: true,
        }
    }
}

/// Converts a video-container audio stream into a standalone mp3.
pub trait Transcoder {
    fn check_available(&self) -> Result<()>;

    fn to_mp3(
        &self,
        input: &Path,
        output: &Path,
        trim: Option<TrimOffset>,
        settings: &TranscodeSettings,
    ) -> Result<()>;
}

pub struct Ffmpeg;

impl Ffmpeg {
    pub fn arguments(
        input: &Path,
        output: &Path,
        trim: Option<TrimOffset>,
        settings: &TranscodeSettings,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-loglevel".into(),
            "0".into(),
            "-i".into(),
            input.into(),
            "-f".into(),
            "mp3".into(),
            "-b:a".into(),
            settings.bitrate.to_string().into(),
            "-ar".into(),
            SAMPLE_RATE.to_string().into(),
            "-ac".into(),
            CHANNELS.to_string().into(),
            "-vn".into(),
            "-y".into(),
        ];
        if let Some(trim) = trim {
            args.push("-ss".into());
            args.push(trim.seconds().to_string().into());
        }
        args.push(output.into());
        args
    }
}

impl Transcoder for Ffmpeg {
    fn check_available(&self) -> Result<()> {
        which::which("ffmpeg")
            .map(|_| ())
            .map_err(|_| ArchiveError::config("ffmpeg not found in PATH"))
    }

    fn to_mp3(
        &self,
        input: &Path,
        output: &Path,
        trim: Option<TrimOffset>,
        settings: &TranscodeSettings,
    ) -> Result<()> {
        let args = Self::arguments(input, output, trim, settings);
        debug!("running ffmpeg {:?}", args);

        let status = Command::new("ffmpeg")
            .args(&args)
            .status()
            .map_err(|e| ArchiveError::Transcode {
                input: input.to_path_buf(),
                reason: format!("could not start ffmpeg: {e}"),
            })?;

        if !status.success() {
            return Err(ArchiveError::Transcode {
                input: input.to_path_buf(),
                reason: format!("ffmpeg exited with {status}"),
            });
        }
        info!("converted {} to mp3", input.display());
        Ok(())
    }
}
