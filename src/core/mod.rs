//! core/mod.rs
//!
//! The playback engine:
//! - `stream`, `playlist`, `queue`: what can be played and in which order
//! - `hooks`: interceptors that can take over or veto any mutating call
//! - `metadata`: background tag extraction, one probe at a time
//! - `playback`: the `Player` state machine and its backends
//! - `events`: notifications sent to collaborators
//! - `stats`, `logger`: observers built on those notifications
//! - `library`, `tags`: filesystem discovery and ID3 reading
//!
//! Everything here runs on one thread. Backends and probes may use their own
//! worker threads but only reach the player through its event channel.

pub mod error;
pub mod events;
pub mod hooks;
pub mod library;
pub mod logger;
pub mod metadata;
pub mod playback;
pub mod playlist;
pub mod queue;
pub mod stats;
pub mod stream;
pub mod tags;
pub mod types;

pub use error::{Error, Result};
pub use events::Notification;
pub use hooks::{Hook, HookEvent, HookOutcome, HookRef, hook};
pub use metadata::{FileProber, MetadataParser, Priority, ScriptedProber};
pub use playback::{NullFactory, Player, PlayerOptions, RodioFactory, SharedPlayer, WeakPlayer};
pub use stream::{Stream, StreamId, StreamRef, TagValue};
pub use types::{PlayerState, SeekFormat};
