use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use crate::core::track::Track;
use crate::error::{ArchiveError, Result};
use crate::models::{normalize_artist, AudioFormat, PrefixRules, SourcePayload, TrackDescriptor};
use crate::sources::{Collector, TrackStream};

const API_URL: &str = "https://api.soundcloud.com";

/// A user playlist to archive, with an optional local name and the prefix
/// rules that keep its speakers apart.
pub struct PlaylistSet {
    pub url: &'static str,
    pub name: Option<&'static str>,
    pub prefixes: &'static [(&'static str, u32)],
}

pub const SETS: &[PlaylistSet] = &[PlaylistSet {
    url: "https://soundcloud.com/inliberty/sets/fj1fjsmauyke",
    name: Some("public-lie"),
    prefixes: &[
        ("zorin", 3),
        ("shulman", 6),
        ("titaev", 1),
        ("panchenko", 4),
        ("chabovskii", 5),
        ("gelfand", 2),
        ("levontina", 8),
        ("klyucharev", 7),
    ],
}];

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    title: String,
    permalink: String,
    tracks: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    id: u64,
    title: String,
    /// `2017/03/14 10:00:00 +0000`
    created_at: String,
    permalink: String,
    permalink_url: String,
}

/// SoundCloud playlists, listed through the public API with a client id.
pub struct SoundcloudCollector {
    client: Client,
    client_id: String,
    sets: &'static [PlaylistSet],
}

impl SoundcloudCollector {
    pub fn new(client_id: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            client_id: client_id.to_string(),
            sets: SETS,
        })
    }

    fn user_playlists(&self, user: &str) -> Result<Vec<ApiPlaylist>> {
        let url = format!("{API_URL}/users/{user}/playlists");
        let response = self
            .client
            .get(&url)
            .query(&[("client_id", self.client_id.as_str())])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Download {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.json()?)
    }

    fn set_tracks(&self, set: &PlaylistSet) -> Result<Vec<Track>> {
        let (user, playlist) = parse_set_url(set.url)?;
        info!("looking for playlist {:?} of user {:?}", playlist, user);

        let mut tracks = Vec::new();
        for raw in self.user_playlists(&user)? {
            if raw.permalink != playlist {
                info!("skipping playlist {:?}", raw.permalink);
                continue;
            }
            info!(
                "playlist {:?} ({}) of {} tracks",
                raw.title,
                raw.permalink,
                raw.tracks.len()
            );
            let playlist_name = set.name.unwrap_or(playlist.as_str());
            let rules: PrefixRules = set.prefixes.iter().copied().collect();
            for track in raw.tracks {
                tracks.push(self.to_track(&user, playlist_name, &rules, track));
            }
        }
        Ok(tracks)
    }

    fn to_track(&self, user: &str, playlist: &str, rules: &PrefixRules, track: ApiTrack) -> Track {
        let stream_endpoint = format!(
            "{API_URL}/tracks/{}/stream?client_id={}",
            track.id, self.client_id
        );
        Track::new(
            TrackDescriptor {
                title: track.title,
                created: created_date(&track.created_at),
                permalink: track.permalink,
                permalink_url: track.permalink_url,
                artist: user.to_string(),
                artist_normalized: normalize_artist(user),
                playlist: playlist.to_string(),
                audio_format: AudioFormat::Mp3,
                prefix_rules: rules.clone(),
            },
            SourcePayload::HostedStream { stream_endpoint },
        )
    }
}

impl Collector for SoundcloudCollector {
    fn name(&self) -> &str {
        "soundcloud"
    }

    fn tracks<'a>(&'a self) -> Result<TrackStream<'a>> {
        Ok(Box::new(self.sets.iter().flat_map(move |set| -> TrackStream<'a> {
            match self.set_tracks(set) {
                Ok(tracks) => Box::new(tracks.into_iter().map(Ok)),
                Err(e) => Box::new(std::iter::once(Err(e))),
            }
        })))
    }
}

/// `https://soundcloud.com/{user}/sets/{playlist}` -> `(user, playlist)`
pub fn parse_set_url(url: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = url.trim_end_matches('/').split('/').collect();
    match parts.as_slice() {
        [.., user, "sets", playlist] if !user.is_empty() && !playlist.is_empty() => {
            Ok((user.to_string(), playlist.to_string()))
        }
        _ => Err(ArchiveError::config(format!("not a playlist url: {url}"))),
    }
}

/// `2017/03/14 10:00:00 +0000` -> `2017-03-14`
pub fn created_date(created_at: &str) -> String {
    created_at.replace('/', "-").chars().take(10).collect()
}
