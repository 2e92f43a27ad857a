use std::fs::File;
use std::path::Path;

use id3::{Tag, TagLike, Version};
use lofty::mp4::{Atom, AtomData, AtomIdent, Ilst, Mp4File};
use lofty::{Accessor, AudioFile, ParseOptions, TagExt};

use crate::error::{ArchiveError, Result};
use crate::models::AudioFormat;

const MP4_ARTIST: [u8; 4] = *b"\xa9ART";
const MP4_TITLE: [u8; 4] = *b"\xa9nam";

/// Artist/title pair as stored in a file's metadata container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicTags {
    pub artist: Option<String>,
    pub title: Option<String>,
}

/// Writes artist and title using the convention of the file's container.
pub fn write_tags(path: &Path, format: AudioFormat, artist: &str, title: &str) -> Result<()> {
    match format {
        AudioFormat::Mp3 => write_id3(path, artist, title),
        AudioFormat::Mp4 => write_ilst(path, artist, title),
    }
}

pub fn read_tags(path: &Path, format: AudioFormat) -> Result<BasicTags> {
    match format {
        AudioFormat::Mp3 => read_id3(path),
        AudioFormat::Mp4 => read_ilst(path),
    }
}

/// ID3v2.4 text frames. Frames already in the file are kept.
fn write_id3(path: &Path, artist: &str, title: &str) -> Result<()> {
    let mut tag = Tag::read_from_path(path).unwrap_or_else(|_| Tag::new());
    tag.set_artist(artist);
    tag.set_title(title);
    tag.write_to_path(path, Version::Id3v24)
        .map_err(|e| ArchiveError::Tag(format!("{}: {}", path.display(), e)))
}

fn read_id3(path: &Path) -> Result<BasicTags> {
    let tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => return Ok(BasicTags::default()),
        Err(e) => return Err(ArchiveError::Tag(format!("{}: {}", path.display(), e))),
    };
    Ok(BasicTags {
        artist: tag.artist().map(|s| s.to_string()),
        title: tag.title().map(|s| s.to_string()),
    })
}

/// `ilst` holding the four-character `©ART`/`©nam` atoms.
pub fn build_ilst(artist: &str, title: &str) -> Ilst {
    let mut ilst = Ilst::default();
    ilst.insert(Atom::new(
        AtomIdent::Fourcc(MP4_ARTIST),
        AtomData::UTF8(artist.to_string()),
    ));
    ilst.insert(Atom::new(
        AtomIdent::Fourcc(MP4_TITLE),
        AtomData::UTF8(title.to_string()),
    ));
    ilst
}

fn write_ilst(path: &Path, artist: &str, title: &str) -> Result<()> {
    build_ilst(artist, title)
        .save_to_path(path)
        .map_err(|e| ArchiveError::Tag(format!("{}: {}", path.display(), e)))
}

fn read_ilst(path: &Path) -> Result<BasicTags> {
    let mut file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    let mp4 = Mp4File::read_from(&mut file, ParseOptions::new().read_properties(false))
        .map_err(|e| ArchiveError::Tag(format!("{}: {}", path.display(), e)))?;
    Ok(mp4.ilst().map(tags_from_ilst).unwrap_or_default())
}

fn tags_from_ilst(ilst: &Ilst) -> BasicTags {
    BasicTags {
        artist: ilst.artist().map(|s| s.to_string()),
        title: ilst.title().map(|s| s.to_string()),
    }
}
