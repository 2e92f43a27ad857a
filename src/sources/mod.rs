pub mod openuni;
pub mod podcast;
pub mod soundcloud;
pub mod youtube;

use reqwest::blocking::Client;
use tracing::info;

use crate::core::track::Track;
use crate::error::{ArchiveError, Result};

/// Forward-only sequence of tracks; restartable only by collecting again.
pub type TrackStream<'a> = Box<dyn Iterator<Item = Result<Track>> + 'a>;

/// One external content source, mapped onto tracks.
/// SoundCloud, the Shlosberg Live videos, Open University and the podcast
/// page all sit behind this trait.
pub trait Collector {
    fn name(&self) -> &str;

    /// Queries the source and yields its tracks lazily, one at a time.
    fn tracks(&self) -> Result<TrackStream<'_>>;
}

/// Chains the collectors; each source is queried only once the previous
/// one is exhausted. A failing source shows up as an error item.
pub fn collect_all<'a>(collectors: &'a [Box<dyn Collector + 'a>]) -> TrackStream<'a> {
    Box::new(collectors.iter().flat_map(|collector| -> TrackStream<'a> {
        info!("collecting {}", collector.name());
        match collector.tracks() {
            Ok(tracks) => tracks,
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }))
}

/// GET returning the body as text; non-success statuses are download errors.
pub fn get_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(ArchiveError::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text()?)
}
