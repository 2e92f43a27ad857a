use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::fetch::Fetcher;
use crate::core::naming;
use crate::core::pipeline::{SaveProgress, SaveState};
use crate::core::resolver::VideoResolver;
use crate::core::retry::RetryPolicy;
use crate::core::tagger;
use crate::core::transcode::{TranscodeSettings, Transcoder};
use crate::error::{ArchiveError, Result};
use crate::models::{AudioFormat, ResolvedStream, SourcePayload, TrackDescriptor, TrimOffset};

/// External collaborators a track needs to get its bytes on disk.
pub struct Backends {
    pub fetcher: Box<dyn Fetcher>,
    pub transcoder: Box<dyn Transcoder>,
    pub resolver: Box<dyn VideoResolver>,
    pub retry: RetryPolicy,
    pub transcode: TranscodeSettings,
}

/// One collected track: its metadata plus the exclusive locator of its audio.
#[derive(Debug, Clone)]
pub struct Track {
    descriptor: TrackDescriptor,
    payload: SourcePayload,
    format: AudioFormat,
}

impl Track {
    pub fn new(descriptor: TrackDescriptor, payload: SourcePayload) -> Self {
        let format = descriptor.audio_format;
        Self {
            descriptor,
            payload,
            format,
        }
    }

    pub fn describe(&self) -> &TrackDescriptor {
        &self.descriptor
    }

    pub fn payload(&self) -> &SourcePayload {
        &self.payload
    }

    /// Container of the bytes currently on disk (or about to be).
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn relative_path(&self) -> Result<PathBuf> {
        naming::relative_path(&self.descriptor)
    }

    pub fn caption(&self) -> String {
        naming::caption(&self.descriptor)
    }

    pub fn summary(&self) -> Result<String> {
        naming::summary(&self.descriptor)
    }

    /// Puts the audio bytes at `destination`, transcoding video audio first.
    pub fn fetch_bytes(
        &mut self,
        destination: &Path,
        backends: &Backends,
        progress: &mut SaveProgress,
    ) -> Result<()> {
        match &self.payload {
            SourcePayload::HostedStream { stream_endpoint } => {
                let stream_url = backends.fetcher.redirect_location(stream_endpoint)?;
                debug!("stream of {} is {}", self.descriptor.permalink, stream_url);
                backends.fetcher.download(&stream_url, destination)
            }
            SourcePayload::DirectUrl { url } => backends.fetcher.download(url, destination),
            SourcePayload::VideoReference {
                page_url,
                stream,
                trim,
                transcode,
            } => {
                let stream = match stream {
                    Some(stream) => stream.clone(),
                    None => {
                        let info = backends
                            .retry
                            .run(page_url, || backends.resolver.resolve(page_url))?;
                        ResolvedStream {
                            url: info.audio_url,
                            ext: info.audio_ext,
                        }
                    }
                };
                let (trim, transcode) = (*trim, *transcode);
                self.fetch_video(&stream, trim, transcode, destination, backends, progress)
            }
        }
    }

    fn fetch_video(
        &mut self,
        stream: &ResolvedStream,
        trim: Option<TrimOffset>,
        transcode: bool,
        destination: &Path,
        backends: &Backends,
        progress: &mut SaveProgress,
    ) -> Result<()> {
        if !transcode {
            let container: AudioFormat = stream.ext.parse()?;
            backends.fetcher.download(&stream.url, destination)?;
            self.format = container;
            return Ok(());
        }

        let raw = transcode_input_path(destination);
        backends.fetcher.download(&stream.url, &raw)?;

        progress.enter(SaveState::Transcoding);
        if let Err(e) = backends
            .transcoder
            .to_mp3(&raw, destination, trim, &backends.transcode)
        {
            if backends.transcode.keep_failed_input {
                warn!("keeping {} for inspection", raw.display());
            } else if let Err(remove) = std::fs::remove_file(&raw) {
                warn!("could not remove {}: {}", raw.display(), remove);
            }
            return Err(e);
        }

        std::fs::remove_file(&raw).map_err(|e| ArchiveError::io(&raw, e))?;
        self.format = AudioFormat::Mp3;
        Ok(())
    }

    pub fn apply_tags(&self, path: &Path) -> Result<()> {
        debug!("tagging {} as {}", path.display(), self.format);
        tagger::write_tags(
            path,
            self.format,
            &self.descriptor.artist,
            &self.descriptor.title,
        )
    }

    /// Reads the tags back and checks they are the ones just written.
    pub fn verify_tags(&self, path: &Path) -> Result<()> {
        let tags = tagger::read_tags(path, self.format)?;
        if tags.artist.as_deref() != Some(self.descriptor.artist.as_str())
            || tags.title.as_deref() != Some(self.descriptor.title.as_str())
        {
            return Err(ArchiveError::Tag(format!(
                "{} reads back as {:?}",
                path.display(),
                tags
            )));
        }
        Ok(())
    }
}

/// `{destination}.tmp`, the raw download fed to the transcoder.
pub fn transcode_input_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetch::stub::FetcherStub;
    use crate::core::resolver::stub::ResolverStub;
    use crate::core::resolver::VideoInfo;
    use crate::core::transcode::stub::TranscoderStub;
    use crate::models::PrefixRules;
    use std::time::Duration;

    fn descriptor(format: AudioFormat) -> TrackDescriptor {
        TrackDescriptor {
            title: "Shlosberg Live #37".to_string(),
            created: "2017-03-14".to_string(),
            permalink: "shlosberg-live-37".to_string(),
            permalink_url: "https://video.example.com/watch?v=37".to_string(),
            artist: "Grazhdanin TV".to_string(),
            artist_normalized: "grazhdanin-tv".to_string(),
            playlist: "shlosberg-live".to_string(),
            audio_format: format,
            prefix_rules: PrefixRules::default(),
        }
    }

    fn video_info() -> VideoInfo {
        VideoInfo {
            title: "Shlosberg Live #37".to_string(),
            author: "Grazhdanin TV".to_string(),
            published: "2017-03-14".to_string(),
            audio_url: "https://cdn.example.com/37.m4a".to_string(),
            audio_ext: "m4a".to_string(),
        }
    }

    fn backends(fetcher: FetcherStub, transcoder: TranscoderStub, resolver: ResolverStub) -> Backends {
        Backends {
            fetcher: Box::new(fetcher),
            transcoder: Box::new(transcoder),
            resolver: Box::new(resolver),
            retry: RetryPolicy {
                backoff: Duration::ZERO,
                max_attempts: None,
            },
            transcode: TranscodeSettings::default(),
        }
    }

    fn video_track(transcode: bool) -> Track {
        Track::new(
            descriptor(AudioFormat::Mp4),
            SourcePayload::VideoReference {
                page_url: "https://video.example.com/watch?v=37".to_string(),
                stream: None,
                trim: Some(TrimOffset::from_seconds(26)),
                transcode,
            },
        )
    }

    #[test]
    fn test_hosted_stream_follows_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.mp3");
        let mut fetcher = FetcherStub::serving("https://cdn.example.com/a.mp3", b"audio");
        fetcher.redirects.insert(
            "https://api.example.com/tracks/1/stream".to_string(),
            "https://cdn.example.com/a.mp3".to_string(),
        );
        let backends = backends(fetcher, TranscoderStub::default(), ResolverStub::new(video_info()));
        let mut track = Track::new(
            descriptor(AudioFormat::Mp3),
            SourcePayload::HostedStream {
                stream_endpoint: "https://api.example.com/tracks/1/stream".to_string(),
            },
        );

        track
            .fetch_bytes(&dest, &backends, &mut SaveProgress::default())
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"audio");
    }

    #[test]
    fn test_direct_url_404_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.mp3");
        let mut fetcher = FetcherStub::default();
        fetcher
            .statuses
            .insert("https://example.com/gone.mp3".to_string(), 404);
        let backends = backends(fetcher, TranscoderStub::default(), ResolverStub::new(video_info()));
        let mut track = Track::new(
            descriptor(AudioFormat::Mp3),
            SourcePayload::DirectUrl {
                url: "https://example.com/gone.mp3".to_string(),
            },
        );

        let err = track
            .fetch_bytes(&dest, &backends, &mut SaveProgress::default())
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Download { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_video_is_transcoded_and_temp_removed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("37.mp3");
        let transcoder = TranscoderStub::default();
        let last_trim = transcoder.last_trim.clone();
        let backends = backends(
            FetcherStub::serving("https://cdn.example.com/37.m4a", b"m4a bytes"),
            transcoder,
            ResolverStub::new(video_info()),
        );
        let mut track = video_track(true);
        let mut progress = SaveProgress::default();
        progress.enter(SaveState::Fetching);

        track.fetch_bytes(&dest, &backends, &mut progress).unwrap();

        assert_eq!(track.format(), AudioFormat::Mp3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"transcoded");
        assert!(!transcode_input_path(&dest).exists());
        assert_eq!(last_trim.get(), Some(26));
        assert_eq!(progress.current(), SaveState::Transcoding);
    }

    #[test]
    fn test_failed_transcode_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("37.mp3");
        let backends = backends(
            FetcherStub::serving("https://cdn.example.com/37.m4a", b"m4a bytes"),
            TranscoderStub {
                fail: true,
                ..Default::default()
            },
            ResolverStub::new(video_info()),
        );
        let mut track = video_track(true);

        let err = track
            .fetch_bytes(&dest, &backends, &mut SaveProgress::default())
            .unwrap_err();

        assert!(matches!(err, ArchiveError::Transcode { .. }));
        assert_eq!(
            std::fs::read(transcode_input_path(&dest)).unwrap(),
            b"m4a bytes"
        );
        assert_eq!(track.format(), AudioFormat::Mp4);
    }

    #[test]
    fn test_resolution_retried_while_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("37.mp3");
        let mut resolver = ResolverStub::new(video_info());
        resolver.unavailable_for = 2;
        let calls = resolver.calls.clone();
        let backends = backends(
            FetcherStub::serving("https://cdn.example.com/37.m4a", b"m4a bytes"),
            TranscoderStub::default(),
            resolver,
        );

        video_track(true)
            .fetch_bytes(&dest, &backends, &mut SaveProgress::default())
            .unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_resolved_stream_is_not_resolved_again() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("37.mp3");
        let resolver = ResolverStub::new(video_info());
        let calls = resolver.calls.clone();
        let backends = backends(
            FetcherStub::serving("https://cdn.example.com/early.m4a", b"m4a bytes"),
            TranscoderStub::default(),
            resolver,
        );
        let mut track = Track::new(
            descriptor(AudioFormat::Mp4),
            SourcePayload::VideoReference {
                page_url: "https://video.example.com/watch?v=37".to_string(),
                stream: Some(ResolvedStream {
                    url: "https://cdn.example.com/early.m4a".to_string(),
                    ext: "m4a".to_string(),
                }),
                trim: None,
                transcode: true,
            },
        );

        track
            .fetch_bytes(&dest, &backends, &mut SaveProgress::default())
            .unwrap();
        assert_eq!(calls.get(), 0);
        assert_eq!(std::fs::read(&dest).unwrap(), b"transcoded");
    }

    #[test]
    fn test_untranscoded_video_keeps_container() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("37.mp3");
        let transcoder = TranscoderStub::default();
        let runs = transcoder.runs.clone();
        let backends = backends(
            FetcherStub::serving("https://cdn.example.com/37.m4a", b"m4a bytes"),
            transcoder,
            ResolverStub::new(video_info()),
        );
        let mut track = video_track(false);

        track
            .fetch_bytes(&dest, &backends, &mut SaveProgress::default())
            .unwrap();
        assert_eq!(track.format(), AudioFormat::Mp4);
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn test_untranscoded_webm_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = video_info();
        info.audio_ext = "webm".to_string();
        let backends = backends(
            FetcherStub::default(),
            TranscoderStub::default(),
            ResolverStub::new(info),
        );

        let err = video_track(false)
            .fetch_bytes(&dir.path().join("37.mp3"), &backends, &mut SaveProgress::default())
            .unwrap_err();
        assert!(matches!(err, ArchiveError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_transcode_input_path_is_sibling() {
        let path = transcode_input_path(Path::new("/a/b/c.mp3.part"));
        assert_eq!(path, PathBuf::from("/a/b/c.mp3.part.tmp"));
    }
}
