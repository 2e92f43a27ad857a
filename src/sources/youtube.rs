use tracing::info;

use crate::core::resolver::{VideoInfo, VideoResolver};
use crate::core::retry::RetryPolicy;
use crate::core::track::Track;
use crate::error::Result;
use crate::models::{
    AudioFormat, PrefixRules, ResolvedStream, SourcePayload, TrackDescriptor, TrimOffset,
};
use crate::sources::{Collector, TrackStream};

const ARTIST_ENG: &str = "grazhdanin-tv";
const PLAYLIST: &str = "shlosberg-live";

/// (video url, part number, intro to cut)
pub const VIDEOS: &[(&str, &str, Option<&str>)] = &[
    ("https://www.youtube.com/watch?v=HuKCihT4P64", "37", Some("0:26")),
    ("https://www.youtube.com/watch?v=zKi__hj_apc", "36", Some("0:37")),
    ("https://www.youtube.com/watch?v=0_h7w_JC6f4", "35", Some("0:09")),
    ("https://www.youtube.com/watch?v=XmdVz34VuV4", "34", Some("0:05")),
    ("https://www.youtube.com/watch?v=cUgP2C7Y7mM", "33", Some("0:19")),
    ("https://www.youtube.com/watch?v=CuiADlYfjq0", "32", Some("1:52")),
    ("https://www.youtube.com/watch?v=7pkAydybFCc", "31", Some("0:10")),
    ("https://www.youtube.com/watch?v=ofL2yRqw9f0", "30-2", None),
    ("https://www.youtube.com/watch?v=YVSGDJov7cw", "30-1", Some("0:08")),
    ("https://www.youtube.com/watch?v=XXusqj6xygc", "29", Some("1:02")),
    ("https://www.youtube.com/watch?v=QBsjBcqFev0", "28", Some("0:54")),
    ("https://www.youtube.com/watch?v=YttJ60SY7sM", "27", Some("0:50")),
    ("https://www.youtube.com/watch?v=JPxS1wIjUmc", "26", Some("1:08")),
    ("https://www.youtube.com/watch?v=QYwTmlN0UdE", "25", Some("1:06")),
    ("https://www.youtube.com/watch?v=jv_B1PXiQB8", "24", Some("1:08")),
    ("https://www.youtube.com/watch?v=owBdz-X_SWQ", "23", Some("1:47")),
    ("https://www.youtube.com/watch?v=HWd9l03xp1k", "22", Some("1:34")),
    ("https://www.youtube.com/watch?v=ZhmZghs89wA", "21", Some("2:15")),
    ("https://www.youtube.com/watch?v=72DIC22v1W4", "20", Some("1:16")),
    ("https://www.youtube.com/watch?v=yXK-AZd2HAw", "19", Some("0:34")),
    ("https://www.youtube.com/watch?v=fTyN66Sd9Fs", "18", Some("2:45")),
    ("https://www.youtube.com/watch?v=wov7yvgTEok", "17", Some("1:18")),
    ("https://www.youtube.com/watch?v=-h_KXVWVEJg", "16", Some("0:15")),
    ("https://www.youtube.com/watch?v=xb0AsPuGvuc", "15", Some("0:49")),
    ("https://www.youtube.com/watch?v=p2jOsznpVrk", "14", Some("0:08")),
    ("https://www.youtube.com/watch?v=x5RDW-SXKA0", "13", Some("2:35")),
    ("https://www.youtube.com/watch?v=pu_l_4FrRQI", "12", Some("1:01")),
    ("https://www.youtube.com/watch?v=GxkhHqTKAlU", "11", Some("2:17")),
    ("https://www.youtube.com/watch?v=Kf6AZOuj9dg", "10", Some("0:45")),
    ("https://www.youtube.com/watch?v=23vjnCTlTjc", "9-2", Some("0:15")),
    ("https://www.youtube.com/watch?v=i0-AI04ZYes", "9-1", Some("0:59")),
    ("https://www.youtube.com/watch?v=jkN6Af4m9x8", "8", Some("0:15")),
    ("https://www.youtube.com/watch?v=DivQCLyu_6s", "7", Some("0:36")),
    ("https://www.youtube.com/watch?v=j7rL2jqhZnE", "6", Some("0:35")),
    ("https://www.youtube.com/watch?v=fslL0Sjgz5U", "5", Some("1:36")),
    ("https://www.youtube.com/watch?v=EP_ljk6sZvU", "4", Some("0:41")),
    ("https://www.youtube.com/watch?v=jVj9L8KD3eA", "3", Some("0:39")),
    ("https://www.youtube.com/watch?v=COhG3aHOs58", "2", Some("1:12")),
    ("https://www.youtube.com/watch?v=X0mPF5HwaFs", "1", Some("36:20")),
];

/// Shlosberg Live episodes, picked by hand from the channel's video list.
pub struct ShlosbergLive<'a> {
    resolver: &'a dyn VideoResolver,
    retry: RetryPolicy,
    videos: &'static [(&'static str, &'static str, Option<&'static str>)],
}

impl<'a> ShlosbergLive<'a> {
    pub fn new(resolver: &'a dyn VideoResolver, retry: RetryPolicy) -> Self {
        Self {
            resolver,
            retry,
            videos: VIDEOS,
        }
    }

    fn video_track(&self, url: &str, part: &str, trim: Option<&str>) -> Result<Track> {
        let trim = trim.map(str::parse::<TrimOffset>).transpose()?;
        let info = self.retry.run(url, || self.resolver.resolve(url))?;
        Ok(episode_track(url, part, trim, info))
    }
}

pub fn episode_track(url: &str, part: &str, trim: Option<TrimOffset>, info: VideoInfo) -> Track {
    Track::new(
        TrackDescriptor {
            title: info.title,
            created: info.published.chars().take(10).collect(),
            permalink: format!("{PLAYLIST}-{part}"),
            permalink_url: url.to_string(),
            artist: info.author,
            artist_normalized: ARTIST_ENG.to_string(),
            playlist: PLAYLIST.to_string(),
            audio_format: AudioFormat::Mp4,
            prefix_rules: PrefixRules::default(),
        },
        SourcePayload::VideoReference {
            page_url: url.to_string(),
            stream: Some(ResolvedStream {
                url: info.audio_url,
                ext: info.audio_ext,
            }),
            trim,
            transcode: true,
        },
    )
}

impl Collector for ShlosbergLive<'_> {
    fn name(&self) -> &str {
        PLAYLIST
    }

    fn tracks<'s>(&'s self) -> Result<TrackStream<'s>> {
        info!("videos of Shlosberg Live are chosen manually");
        Ok(Box::new(
            self.videos
                .iter()
                .map(move |(url, part, trim)| self.video_track(url, part, *trim)),
        ))
    }
}
