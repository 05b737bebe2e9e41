//! core/stream.rs
//! A playable item: URI identity plus mutable metadata.
//!
//! Streams are shared as [`StreamRef`] (`Rc<Stream>`) between the playlist,
//! the queue, the metadata parser and whatever collaborator holds one. All
//! mutable fields use `Cell`/`RefCell`, so setters take `&self`. The engine is
//! single-threaded, so none of this is `Send`.
//!
//! Identity is the [`StreamId`] handed out at construction, not the URI: the
//! same file may be inserted twice and the two entries stay distinguishable.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use url::Url;

use super::error::{Error, Result};

pub type StreamRef = Rc<Stream>;

/// Well-known tag names.
pub mod tag {
    pub const URI: &str = "uri";
    pub const TITLE: &str = "title";
    pub const ARTIST: &str = "artist";
    pub const ALBUM: &str = "album";
    pub const ALBUM_ARTIST: &str = "album-artist";
    pub const COMPOSER: &str = "composer";
    pub const GENRE: &str = "genre";
    pub const DATE: &str = "date";
    pub const COMMENT: &str = "comment";
    pub const LYRICS: &str = "lyrics";
    pub const TRACK_NUMBER: &str = "track-number";
    pub const TRACK_COUNT: &str = "track-count";
    pub const DISC_NUMBER: &str = "album-disc-number";
    pub const DISC_COUNT: &str = "album-disc-count";
    pub const DURATION: &str = "duration";
    pub const AUDIO_CODEC: &str = "audio-codec";
    pub const ISRC: &str = "isrc";
    pub const COPYRIGHT: &str = "copyright";
    pub const ORGANIZATION: &str = "organization";
    pub const BPM: &str = "beats-per-minute";
    pub const COMPILATION: &str = "compilation";
    pub const IMAGE: &str = "image";
    pub const IMAGE_MIME: &str = "image-mime";
}

/// Single-character shorthand used by `tag_by_id` and `expand`.
const SHORTHAND: &[(char, &str)] = &[
    ('a', tag::ARTIST),
    ('b', tag::ALBUM),
    ('t', tag::TITLE),
    ('g', tag::GENRE),
    ('n', tag::TRACK_NUMBER),
    ('d', tag::DATE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        StreamId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl TagValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Text(s) => write!(f, "{s}"),
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Float(v) => write!(f, "{v}"),
            TagValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Text(s.to_owned())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        TagValue::Text(s)
    }
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Int(v)
    }
}

pub struct Stream {
    id: StreamId,
    uri: String,
    tags: RefCell<HashMap<String, TagValue>>,
    extended: RefCell<HashMap<String, TagValue>>,
    extended_watchers: RefCell<Vec<Sender<String>>>,
    all_tags: Cell<bool>,
    failed: Cell<bool>,
    length: Cell<i64>,
    external_id: Cell<Option<i64>>,
}

impl Stream {
    /// Validate `uri` and build a stream around it.
    ///
    /// Accepted URIs are printable ASCII and carry a scheme separator
    /// (`file:///music/a.mp3`, `http://host/radio`).
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if !is_valid_uri(&uri) {
            return Err(Error::InvalidUri(uri));
        }

        Ok(Self {
            id: StreamId::next(),
            uri,
            tags: RefCell::new(HashMap::new()),
            extended: RefCell::new(HashMap::new()),
            extended_watchers: RefCell::new(Vec::new()),
            all_tags: Cell::new(false),
            failed: Cell::new(false),
            length: Cell::new(-1),
            external_id: Cell::new(None),
        })
    }

    /// Build a `file://` stream for a local path. Relative paths are resolved
    /// against the current directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let url = Url::from_file_path(&absolute)
            .map_err(|_| Error::InvalidUri(absolute.display().to_string()))?;
        Self::new(String::from(url))
    }

    pub fn shared(self) -> StreamRef {
        Rc::new(self)
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Local filesystem path for `file://` streams.
    pub fn local_path(&self) -> Option<PathBuf> {
        uri_to_path(&self.uri)
    }

    pub fn tag(&self, name: &str) -> Option<TagValue> {
        self.tags.borrow().get(name).cloned()
    }

    pub fn tag_text(&self, name: &str) -> Option<String> {
        self.tags.borrow().get(name).map(ToString::to_string)
    }

    /// `None` removes the tag.
    pub fn set_tag(&self, name: &str, value: Option<TagValue>) {
        let mut tags = self.tags.borrow_mut();
        match value {
            Some(v) => {
                tags.insert(name.to_owned(), v);
            }
            None => {
                tags.remove(name);
            }
        }
    }

    /// Tag names currently set, sorted.
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tags.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Shorthand lookup: a=artist, b=album, t=title, g=genre, n=track, d=date.
    pub fn tag_by_id(&self, id: char) -> Option<String> {
        let (_, name) = SHORTHAND.iter().find(|(key, _)| *key == id)?;
        let tags = self.tags.borrow();
        let value = tags.get(*name)?;

        if id == 'n' {
            let number = match value {
                TagValue::Int(n) => Some(*n),
                TagValue::Text(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            if let Some(n) = number {
                return Some(format!("{n:02}"));
            }
        }

        Some(value.to_string())
    }

    /// Expand `%a %b %t %g %n %d` in `pattern`. `%%` is a literal percent.
    pub fn expand(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => out.push('%'),
                Some(id) if SHORTHAND.iter().any(|(key, _)| *key == id) => {
                    if let Some(v) = self.tag_by_id(id) {
                        out.push_str(&v);
                    }
                }
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }

        out
    }

    pub fn extended_metadata(&self, key: &str) -> Option<TagValue> {
        self.extended.borrow().get(key).cloned()
    }

    /// Set (or with `None`, remove) an extended entry and tell every watcher
    /// which key changed.
    pub fn set_extended_metadata(&self, key: &str, value: Option<TagValue>) {
        {
            let mut extended = self.extended.borrow_mut();
            match value {
                Some(v) => {
                    extended.insert(key.to_owned(), v);
                }
                None => {
                    extended.remove(key);
                }
            }
        }

        self.extended_watchers
            .borrow_mut()
            .retain(|tx| tx.send(key.to_owned()).is_ok());
    }

    /// Receive the key of every future extended metadata update.
    pub fn watch_extended(&self) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        self.extended_watchers.borrow_mut().push(tx);
        rx
    }

    pub fn all_tags(&self) -> bool {
        self.all_tags.get()
    }

    pub fn set_all_tags(&self, value: bool) {
        self.all_tags.set(value);
    }

    pub fn failed(&self) -> bool {
        self.failed.get()
    }

    pub fn set_failed(&self, value: bool) {
        self.failed.set(value);
    }

    /// Length in nanoseconds, `-1` when unknown.
    pub fn length(&self) -> i64 {
        self.length.get()
    }

    pub fn set_length(&self, ns: i64) {
        self.length.set(ns);
    }

    /// Identifier attached by a persistence layer, if any.
    pub fn external_id(&self) -> Option<i64> {
        self.external_id.get()
    }

    pub fn set_external_id(&self, id: Option<i64>) {
        self.external_id.set(id);
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .field("all_tags", &self.all_tags.get())
            .field("failed", &self.failed.get())
            .field("length", &self.length.get())
            .finish()
    }
}

pub fn is_valid_uri(uri: &str) -> bool {
    uri.bytes().all(|b| (32..=126).contains(&b)) && uri.contains("://")
}

pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_uris() {
        assert!(Stream::new("file:///music/a.mp3").is_ok());
        assert!(Stream::new("http://radio.example/live").is_ok());
        assert!(matches!(Stream::new("/music/a.mp3"), Err(Error::InvalidUri(_))));
        assert!(matches!(
            Stream::new("file:///music/caf\u{e9}.mp3"),
            Err(Error::InvalidUri(_))
        ));
        assert!(Stream::new("file:///bad\ttab").is_err());
    }

    #[test]
    fn identity_is_per_instance() {
        let a = Stream::new("file:///a.mp3").unwrap();
        let b = Stream::new("file:///a.mp3").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.uri(), b.uri());
    }

    #[test]
    fn setting_none_removes_tag() {
        let s = Stream::new("file:///a.mp3").unwrap();
        s.set_tag(tag::TITLE, Some("Intro".into()));
        assert_eq!(s.tag_text(tag::TITLE).as_deref(), Some("Intro"));

        s.set_tag(tag::TITLE, None);
        assert_eq!(s.tag(tag::TITLE), None);
        assert!(s.tag_names().is_empty());
        assert_eq!(s.uri(), "file:///a.mp3");
    }

    #[test]
    fn shorthand_lookup_pads_track_numbers() {
        let s = Stream::new("file:///a.mp3").unwrap();
        s.set_tag(tag::ARTIST, Some("Nina".into()));
        s.set_tag(tag::TRACK_NUMBER, Some(TagValue::Int(3)));

        assert_eq!(s.tag_by_id('a').as_deref(), Some("Nina"));
        assert_eq!(s.tag_by_id('n').as_deref(), Some("03"));
        assert_eq!(s.tag_by_id('b'), None);
        assert_eq!(s.tag_by_id('z'), None);
    }

    #[test]
    fn expand_fills_known_ids() {
        let s = Stream::new("file:///a.mp3").unwrap();
        s.set_tag(tag::ARTIST, Some("Nina".into()));
        s.set_tag(tag::TITLE, Some("Sinnerman".into()));

        assert_eq!(s.expand("%a - %t"), "Nina - Sinnerman");
        assert_eq!(s.expand("%b|%x|100%%"), "|%x|100%");
    }

    #[test]
    fn extended_metadata_notifies_watchers() {
        let s = Stream::new("file:///a.mp3").unwrap();
        let rx = s.watch_extended();

        s.set_extended_metadata("art", Some(TagValue::Bytes(vec![1, 2, 3])));
        s.set_extended_metadata("lyrics", Some("la la".into()));

        assert_eq!(rx.try_recv().ok().as_deref(), Some("art"));
        assert_eq!(rx.try_recv().ok().as_deref(), Some("lyrics"));
        assert!(s.tag("art").is_none());
        assert_eq!(
            s.extended_metadata("art"),
            Some(TagValue::Bytes(vec![1, 2, 3]))
        );
    }

    #[test]
    fn path_round_trip() {
        let s = Stream::from_path(Path::new("/tmp/some song.mp3")).unwrap();
        assert_eq!(s.uri(), "file:///tmp/some%20song.mp3");
        assert_eq!(s.local_path(), Some(PathBuf::from("/tmp/some song.mp3")));

        let remote = Stream::new("http://radio.example/live").unwrap();
        assert_eq!(remote.local_path(), None);
    }

    #[test]
    fn defaults() {
        let s = Stream::new("file:///a.mp3").unwrap();
        assert_eq!(s.length(), -1);
        assert!(!s.all_tags());
        assert!(!s.failed());
        assert_eq!(s.external_id(), None);

        s.set_external_id(Some(42));
        assert_eq!(s.external_id(), Some(42));
    }
}
