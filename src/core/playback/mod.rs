//! core/playback/mod.rs
//! Playback: the player state machine and the backends it drives.
//!
//! - [`Player`] is the engine entry point (playlist, queue, hooks, metadata).
//! - [`Backend`] / [`BackendFactory`] abstract the thing that makes sound.
//! - [`RodioFactory`] plays local files through rodio.
//! - [`NullFactory`] is silent and scriptable.
//!
//! Backends and probes may run worker threads; they only talk back through
//! [`Incoming`] messages that the player consumes on its own thread.

mod backend;
mod engine;
mod null;
mod player;

pub use backend::{Backend, BackendEvent, BackendFactory, BackendSink, BackendState, StateChange};
pub use engine::{RodioBackend, RodioFactory};
pub use null::{NullBackend, NullDevice, NullFactory};
pub use player::{Player, PlayerOptions, SharedPlayer, WeakPlayer};

use super::metadata::ProbeEvent;

/// Messages from backends and probes into the player's event loop.
/// The generation tags each message with the backend/probe that sent it so
/// late messages from a torn-down instance can be dropped.
#[derive(Debug)]
pub(crate) enum Incoming {
    Backend { generation: u64, event: BackendEvent },
    Probe { generation: u64, event: ProbeEvent },
}
