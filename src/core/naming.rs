use std::path::PathBuf;

use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::models::TrackDescriptor;

/// Replacement for `:` in basenames; colons are invalid on some filesystems.
const COLON_REPLACEMENT: &str = " \u{2014}";

/// Replaces characters that would split a basename into path components.
pub fn sanitize_basename(s: &str) -> String {
    s.replace(':', COLON_REPLACEMENT)
        .chars()
        .map(|c| if c == '/' || c == '\0' { '_' } else { c })
        .collect()
}

/// Finds the numeric label of the single prefix rule matching the descriptor.
/// Two matching rules mean the rule set is ambiguous.
pub fn matching_prefix(descriptor: &TrackDescriptor) -> Result<Option<u32>> {
    let permalink = descriptor.permalink.to_lowercase();
    let title = descriptor.title.to_lowercase();

    let mut found: Option<u32> = None;
    for rule in descriptor.prefix_rules.iter() {
        let keyword = rule.keyword.to_lowercase();
        if !permalink.contains(&keyword) && !title.contains(&keyword) {
            continue;
        }
        if found.is_some() {
            return Err(ArchiveError::config(format!(
                "prefix rules are ambiguous for {:?}: {:?} matches too",
                descriptor.permalink, rule.keyword
            )));
        }
        found = Some(rule.label);
    }
    Ok(found)
}

/// `{prefix-}{created}-{permalink}.mp3`. Always `.mp3`, messengers only
/// show that extension as audio.
pub fn build_basename(descriptor: &TrackDescriptor) -> Result<String> {
    let prefix = matching_prefix(descriptor)?
        .map(|label| format!("{label}-"))
        .unwrap_or_default();
    let basename = sanitize_basename(&format!(
        "{}{}-{}.mp3",
        prefix, descriptor.created, descriptor.permalink
    ));
    debug!("basename is {}", basename);
    Ok(basename)
}

/// `{artist_normalized}/{playlist}/{basename}`
pub fn relative_path(descriptor: &TrackDescriptor) -> Result<PathBuf> {
    let basename = build_basename(descriptor)?;
    Ok(PathBuf::from(&descriptor.artist_normalized)
        .join(&descriptor.playlist)
        .join(basename))
}

/// Turns a token into something a messenger accepts as a hashtag.
pub fn hashtag(token: &str) -> String {
    token.replace([' ', '-'], "_")
}

pub fn caption(descriptor: &TrackDescriptor) -> String {
    let caption = format!(
        "#{} #{} [{}] {}\n{}",
        hashtag(&descriptor.artist_normalized),
        hashtag(&descriptor.playlist),
        descriptor.created,
        descriptor.title,
        descriptor.permalink_url
    );
    debug!("caption is {}", caption);
    caption
}

/// Human readable block logged for every track the collectors produce.
pub fn summary(descriptor: &TrackDescriptor) -> Result<String> {
    Ok(format!(
        "\nArtist:\t\t{}\nArtistEng:\t{}\nPlaylist:\t{}\nTitle:\t\t{}\nCreated:\t{}\nPermalink:\t{}\nPermalink URL:\t{}\nFilename:\t{}\nCaption:\n{}\n",
        descriptor.artist,
        descriptor.artist_normalized,
        descriptor.playlist,
        descriptor.title,
        descriptor.created,
        descriptor.permalink,
        descriptor.permalink_url,
        relative_path(descriptor)?.display(),
        caption(descriptor),
    ))
}
