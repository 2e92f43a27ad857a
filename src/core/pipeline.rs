use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::core::track::{Backends, Track};
use crate::error::{ArchiveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Pending,
    Fetching,
    Transcoding,
    Tagging,
    Saved,
    AlreadyExists,
    Failed,
}

impl SaveState {
    pub fn can_follow(self, previous: SaveState) -> bool {
        use SaveState::*;
        matches!(
            (previous, self),
            (Pending, Fetching)
                | (Pending, AlreadyExists)
                | (Fetching, Transcoding)
                | (Fetching, Tagging)
                | (Transcoding, Tagging)
                | (Tagging, Saved)
                | (Fetching, Failed)
                | (Transcoding, Failed)
                | (Tagging, Failed)
        )
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// States one track went through while being saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveProgress {
    trail: Vec<SaveState>,
}

impl Default for SaveProgress {
    fn default() -> Self {
        Self {
            trail: vec![SaveState::Pending],
        }
    }
}

impl SaveProgress {
    pub fn current(&self) -> SaveState {
        self.trail.last().copied().unwrap_or(SaveState::Pending)
    }

    pub fn trail(&self) -> &[SaveState] {
        &self.trail
    }

    pub fn enter(&mut self, state: SaveState) {
        let previous = self.current();
        if state.can_follow(previous) {
            debug!("{} -> {}", previous, state);
        } else {
            warn!("unexpected transition {} -> {}", previous, state);
        }
        self.trail.push(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    Skipped(PathBuf),
}

/// `{target}.part`, where bytes land before being tagged and moved in place.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

pub struct SavePipeline {
    backends: Backends,
}

impl SavePipeline {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn save(&self, track: Track, root: &Path, force: bool) -> Result<SaveOutcome> {
        self.save_with_progress(track, root, force, &mut SaveProgress::default())
    }

    /// Fetches, transcodes if needed, tags and places one track under `root`.
    /// An existing target is left alone unless `force` is set.
    pub fn save_with_progress(
        &self,
        mut track: Track,
        root: &Path,
        force: bool,
        progress: &mut SaveProgress,
    ) -> Result<SaveOutcome> {
        let target = root.join(track.relative_path()?);
        if !force && target.exists() {
            progress.enter(SaveState::AlreadyExists);
            info!("file {} exists, skipping", target.display());
            return Ok(SaveOutcome::Skipped(target));
        }

        progress.enter(SaveState::Fetching);
        match self.place(&mut track, &target, progress) {
            Ok(()) => {
                progress.enter(SaveState::Saved);
                info!("file {} was saved, meta was updated", target.display());
                debug!("caption:\n{}", track.caption());
                Ok(SaveOutcome::Saved(target))
            }
            Err(e) => {
                progress.enter(SaveState::Failed);
                debug!("failed after {:?}", progress.trail());
                Err(e)
            }
        }
    }

    fn place(&self, track: &mut Track, target: &Path, progress: &mut SaveProgress) -> Result<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let partial = partial_path(target);
        track.fetch_bytes(&partial, &self.backends, progress)?;

        progress.enter(SaveState::Tagging);
        track.apply_tags(&partial)?;
        track.verify_tags(&partial)?;

        std::fs::rename(&partial, target).map_err(|e| ArchiveError::io(target, e))
    }
}

/// What a per-track failure does to the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and go on with the next track.
    #[default]
    Continue,
    /// Stop the batch at the first failure.
    Abort,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub root: PathBuf,
    pub save: bool,
    pub force: bool,
    pub on_error: FailurePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub checked: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Feeds every collected track through the pipeline, one at a time.
pub fn run_batch<I>(pipeline: &SavePipeline, tracks: I, options: &BatchOptions) -> Result<BatchReport>
where
    I: IntoIterator<Item = Result<Track>>,
{
    let mut report = BatchReport::default();
    let mut seen: HashSet<(String, String, String)> = HashSet::new();

    for track in tracks {
        let track = match track {
            Ok(track) => track,
            Err(e) if e.is_fatal() || options.on_error == FailurePolicy::Abort => return Err(e),
            Err(e) => {
                error!("could not collect track: {}", e);
                report.failed += 1;
                continue;
            }
        };
        let d = track.describe();
        let key = (
            d.artist_normalized.clone(),
            d.playlist.clone(),
            d.permalink.clone(),
        );
        if !seen.insert(key) {
            return Err(ArchiveError::config(format!(
                "permalink {:?} appears twice in {}/{}",
                d.permalink, d.artist_normalized, d.playlist
            )));
        }

        info!("{}", track.summary()?);
        report.checked += 1;

        if !options.save {
            debug!("source: {:?} ({})", track.payload(), track.format());
            let target = options.root.join(track.relative_path()?);
            let note = if target.exists() { "exists" } else { "missing" };
            info!("file wasn't saved (dry run, target {})", note);
            continue;
        }

        match pipeline.save(track, &options.root, options.force) {
            Ok(SaveOutcome::Saved(path)) => {
                debug!("{} ready for distribution", path.display());
                report.saved += 1;
            }
            Ok(SaveOutcome::Skipped(path)) => {
                debug!("{} left untouched", path.display());
                report.skipped += 1;
            }
            Err(e) if e.is_fatal() || options.on_error == FailurePolicy::Abort => return Err(e),
            Err(e) => {
                error!("track failed: {}", e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Checked {} tracks, saved {}, skipped {}, failed {}",
        report.checked, report.saved, report.skipped, report.failed
    );
    Ok(report)
}
