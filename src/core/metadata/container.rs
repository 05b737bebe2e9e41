//! core/metadata/container.rs
//! Container-level probing (Symphonia): duration, codec and embedded tags.
//!
//! Nothing is decoded; the format reader is opened just far enough to see
//! the default track's parameters and any metadata revisions.

use std::fs::File;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey, Value};
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use super::super::stream::{TagValue, tag as names};
use super::super::tags::util::numeric_text;
use super::super::types::NANOS_PER_SEC;

pub(crate) struct ContainerInfo {
    /// Nanoseconds
    pub duration: Option<i64>,
    pub tags: Vec<(&'static str, TagValue)>,
}

pub(crate) fn probe_container(path: &Path) -> Result<ContainerInfo, String> {
    let file = File::open(path).map_err(|e| format!("Open failed: {e}"))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("Format probe failed: {e}"))?;

    let (duration, codec) = {
        let track = probed
            .format
            .default_track()
            .ok_or_else(|| "No supported audio track found.".to_string())?;

        let params = &track.codec_params;
        let codec = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|d| d.short_name.to_owned());

        (duration_from_params(params.time_base, params.n_frames), codec)
    };

    let mut tags = Vec::new();
    if let Some(codec) = codec {
        tags.push((names::AUDIO_CODEC, TagValue::Text(codec)));
    }

    // Tags found ahead of the stream (ID3v2 on MP3) come first, then the
    // container's own; later entries win when the parser copies them.
    if let Some(md) = probed.metadata.get() {
        if let Some(rev) = md.current() {
            collect_revision(rev, &mut tags);
        }
    }
    if let Some(rev) = probed.format.metadata().current() {
        collect_revision(rev, &mut tags);
    }

    Ok(ContainerInfo { duration, tags })
}

fn duration_from_params(time_base: Option<TimeBase>, n_frames: Option<u64>) -> Option<i64> {
    let tb = time_base?;
    let frames = n_frames?;

    let t = tb.calc_time(frames);
    // Time is { seconds: u64, frac: f64 } in symphonia 0.5.x.
    // Out-of-range declared lengths count as unknown.
    let secs = i64::try_from(t.seconds).ok()?;
    secs.checked_mul(NANOS_PER_SEC)?
        .checked_add((t.frac * NANOS_PER_SEC as f64).round() as i64)
}

fn collect_revision(rev: &MetadataRevision, out: &mut Vec<(&'static str, TagValue)>) {
    for t in rev.tags() {
        let Some(key) = &t.std_key else { continue };

        let (name, numeric) = match key {
            StandardTagKey::TrackTitle => (names::TITLE, false),
            StandardTagKey::Artist => (names::ARTIST, false),
            StandardTagKey::Album => (names::ALBUM, false),
            StandardTagKey::AlbumArtist => (names::ALBUM_ARTIST, false),
            StandardTagKey::Composer => (names::COMPOSER, false),
            StandardTagKey::Genre => (names::GENRE, false),
            StandardTagKey::Date => (names::DATE, false),
            StandardTagKey::Comment => (names::COMMENT, false),
            StandardTagKey::Lyrics => (names::LYRICS, false),
            StandardTagKey::IdentIsrc => (names::ISRC, false),
            StandardTagKey::Copyright => (names::COPYRIGHT, false),
            StandardTagKey::Label => (names::ORGANIZATION, false),
            StandardTagKey::TrackNumber => (names::TRACK_NUMBER, true),
            StandardTagKey::TrackTotal => (names::TRACK_COUNT, true),
            StandardTagKey::DiscNumber => (names::DISC_NUMBER, true),
            StandardTagKey::DiscTotal => (names::DISC_COUNT, true),
            StandardTagKey::Bpm => (names::BPM, true),
            StandardTagKey::Compilation => (names::COMPILATION, true),
            _ => continue,
        };

        if let Some(value) = convert_value(&t.value, numeric) {
            out.push((name, value));
        }
    }
}

fn convert_value(value: &Value, numeric: bool) -> Option<TagValue> {
    match value {
        Value::String(s) if numeric => numeric_text(s),
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| TagValue::Text(s.to_owned()))
        }
        Value::UnsignedInt(v) => i64::try_from(*v).ok().map(TagValue::Int),
        Value::SignedInt(v) => Some(TagValue::Int(*v)),
        Value::Float(v) => Some(TagValue::Float(*v)),
        Value::Boolean(b) => Some(TagValue::Int(i64::from(*b))),
        Value::Flag => Some(TagValue::Int(1)),
        Value::Binary(b) => Some(TagValue::Bytes(b.to_vec())),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}
