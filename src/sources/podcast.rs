use reqwest::blocking::Client;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::info;

use crate::config::PodcastConfig;
use crate::core::track::Track;
use crate::error::{ArchiveError, Result};
use crate::models::{normalize_artist, AudioFormat, PrefixRules, SourcePayload, TrackDescriptor};
use crate::sources::{get_text, Collector, TrackStream};

const NAME: &str = "podcast";

/// An mp3 linked from the podcast page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioLink {
    pub url: String,
    pub title: String,
    /// Last path segment without `.mp3`, used as permalink.
    pub stem: String,
}

/// Episodes linked inline from a single podcast page.
pub struct PodcastPage {
    client: Client,
    config: PodcastConfig,
}

impl PodcastPage {
    pub fn new(config: PodcastConfig) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
        })
    }

    fn to_track(&self, index: usize, link: AudioLink) -> Track {
        Track::new(
            TrackDescriptor {
                title: link.title,
                created: format!("{:02}", index + 1),
                permalink: link.stem,
                permalink_url: self.config.page_url.clone(),
                artist: self.config.artist.clone(),
                artist_normalized: normalize_artist(&self.config.artist_eng),
                playlist: self.config.playlist.clone(),
                audio_format: AudioFormat::Mp3,
                prefix_rules: PrefixRules::default(),
            },
            SourcePayload::DirectUrl { url: link.url },
        )
    }
}

impl Collector for PodcastPage {
    fn name(&self) -> &str {
        NAME
    }

    fn tracks<'a>(&'a self) -> Result<TrackStream<'a>> {
        let html = get_text(&self.client, &self.config.page_url)?;
        let links = audio_links(&html, &self.config.page_url)?;
        info!("{} episodes on {}", links.len(), self.config.page_url);
        Ok(Box::new(
            links
                .into_iter()
                .enumerate()
                .map(move |(index, link)| Ok(self.to_track(index, link))),
        ))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ArchiveError::source(NAME, format!("bad selector {css:?}: {e}")))
}

fn is_mp3(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".mp3")
}

fn link_title(element: &ElementRef<'_>, stem: &str) -> String {
    let text = element.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        return text;
    }
    element
        .value()
        .attr("title")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| stem.to_string())
}

/// Collects mp3 links (`<a href>`, `<audio src>`, `<audio><source src>`) in
/// document order, resolved against the page url, without duplicates.
pub fn audio_links(html: &str, page_url: &str) -> Result<Vec<AudioLink>> {
    let base = Url::parse(page_url)
        .map_err(|e| ArchiveError::config(format!("invalid podcast url {page_url:?}: {e}")))?;
    let document = Html::parse_document(html);
    let sel = selector("a[href], audio[src], audio source[src]")?;

    let mut links: Vec<AudioLink> = Vec::new();
    for element in document.select(&sel) {
        let Some(raw) = element.value().attr("href").or(element.value().attr("src")) else {
            continue;
        };
        let Ok(url) = base.join(raw.trim()) else {
            continue;
        };
        if !is_mp3(&url) || links.iter().any(|l| l.url == url.as_str()) {
            continue;
        }
        let stem = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|last| last[..last.len() - ".mp3".len()].to_string())
            .unwrap_or_default();
        let title = link_title(&element, &stem);
        links.push(AudioLink {
            url: url.to_string(),
            title,
            stem,
        });
    }
    Ok(links)
}
