//! core/tags/read.rs
//! Read ID3 frames from a file and turn them into engine tag pairs.
//!
//! - Reading never fails hard: a file without a readable tag yields nothing.
//! - Names are the engine's tag names (`core::stream::tag`), not frame ids.

use std::path::Path;

use id3::frame::Content;
use id3::{Tag, TagLike};

use super::super::stream::{TagValue, tag as names};
use super::art::embedded_art;
use super::util::{flag, position_of};

pub fn read_id3_tags(path: &Path) -> Vec<(&'static str, TagValue)> {
    match Tag::read_from_path(path) {
        Ok(tag) => tags_from_id3(&tag),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn tags_from_id3(tag: &Tag) -> Vec<(&'static str, TagValue)> {
    let mut out: Vec<(&'static str, TagValue)> = Vec::new();

    let mut text = |name: &'static str, value: Option<String>| {
        if let Some(v) = value.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()) {
            out.push((name, TagValue::Text(v)));
        }
    };

    text(
        names::TITLE,
        tag.title().map(str::to_owned).or_else(|| text_frame(tag, "TIT2")),
    );
    text(
        names::ARTIST,
        tag.artist().map(str::to_owned).or_else(|| text_frame(tag, "TPE1")),
    );
    text(
        names::ALBUM,
        tag.album().map(str::to_owned).or_else(|| text_frame(tag, "TALB")),
    );
    text(names::ALBUM_ARTIST, text_frame(tag, "TPE2"));
    text(names::COMPOSER, text_frame(tag, "TCOM"));
    text(names::GENRE, text_frame(tag, "TCON"));
    text(
        names::DATE,
        text_frame(tag, "TDRC").or_else(|| text_frame(tag, "TYER")),
    );
    text(names::COMMENT, first_comment(tag));
    text(names::LYRICS, first_lyrics(tag));
    text(names::ISRC, text_frame(tag, "TSRC"));
    text(names::COPYRIGHT, text_frame(tag, "TCOP"));
    text(names::ORGANIZATION, text_frame(tag, "TPUB"));

    let pair = |id: &str| text_frame(tag, id).map_or((None, None), |s| position_of(&s));
    let (track_no_from_text, track_total) = pair("TRCK");
    let (disc_no_from_text, disc_total) = pair("TPOS");

    let mut int = |name: &'static str, value: Option<u32>| {
        if let Some(v) = value {
            out.push((name, TagValue::Int(i64::from(v))));
        }
    };

    int(names::TRACK_NUMBER, tag.track().or(track_no_from_text));
    int(names::TRACK_COUNT, track_total);
    int(names::DISC_NUMBER, tag.disc().or(disc_no_from_text));
    int(names::DISC_COUNT, disc_total);
    int(
        names::BPM,
        text_frame(tag, "TBPM").and_then(|s| s.trim().parse::<u32>().ok()),
    );

    if let Some(compilation) = text_frame(tag, "TCMP").and_then(|s| flag(&s)) {
        out.push((names::COMPILATION, TagValue::Int(i64::from(compilation))));
    }

    // TLEN is milliseconds and often wrong; only a hint until the decoder knows.
    if let Some(ms) = text_frame(tag, "TLEN").and_then(|s| s.trim().parse::<i64>().ok()) {
        out.push((names::DURATION, TagValue::Int(ms * 1_000_000)));
    }

    if let Some((data, mime)) = embedded_art(tag) {
        out.push((names::IMAGE, TagValue::Bytes(data)));
        out.push((names::IMAGE_MIME, TagValue::Text(mime)));
    }

    out
}

/// Get a best-effort string value from a frame id.
/// Some frames that are "text-ish" may not be Content::Text.
fn text_frame(tag: &Tag, id: &str) -> Option<String> {
    let frame = tag.get(id)?;
    match frame.content() {
        Content::Text(s) => Some(s.clone()),
        Content::Link(s) => Some(s.clone()),
        _ => None,
    }
}

fn first_comment(tag: &Tag) -> Option<String> {
    tag.frames()
        .filter(|f| f.id() == "COMM")
        .find_map(|f| match f.content() {
            Content::Comment(c) => Some(c.text.clone()),
            _ => None,
        })
}

fn first_lyrics(tag: &Tag) -> Option<String> {
    tag.frames()
        .filter(|f| f.id() == "USLT")
        .find_map(|f| match f.content() {
            Content::Lyrics(l) => Some(l.text.clone()),
            _ => None,
        })
}
