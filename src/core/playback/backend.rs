//! core/playback/backend.rs
//! The seam between the player state machine and whatever makes sound.
//!
//! A backend is built per stream by a [`BackendFactory`] and dropped when the
//! player moves on. Anything it wants to report later (end of stream, errors,
//! state reached asynchronously) goes through its [`BackendSink`], which the
//! player drains on its own thread.

use std::sync::mpsc::Sender;

use super::super::error::{Error, Result};
use super::super::stream::TagValue;
use super::super::types::PlayerState;
use super::Incoming;

/// Pipeline-level state, one step finer than [`PlayerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Null,
    Ready,
    Paused,
    Playing,
}

impl BackendState {
    pub fn to_player(self) -> PlayerState {
        match self {
            BackendState::Null | BackendState::Ready => PlayerState::Stop,
            BackendState::Paused => PlayerState::Pause,
            BackendState::Playing => PlayerState::Play,
        }
    }

    pub fn from_player(state: PlayerState) -> Option<Self> {
        match state {
            PlayerState::Play => Some(BackendState::Playing),
            PlayerState::Pause => Some(BackendState::Paused),
            PlayerState::Stop => Some(BackendState::Ready),
            PlayerState::Invalid => None,
        }
    }
}

/// Result of a state request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// Reached before returning
    Success,
    /// Will be reported later through `BackendEvent::StateChanged`
    Async,
}

#[derive(Debug, Clone)]
pub enum BackendEvent {
    StateChanged {
        old: BackendState,
        new: BackendState,
        /// Still moving towards this state
        pending: Option<BackendState>,
    },
    Eos,
    Error(String),
    Tag { name: String, value: TagValue },
}

/// Channel end handed to a backend at creation.
#[derive(Clone)]
pub struct BackendSink {
    generation: u64,
    tx: Sender<Incoming>,
}

impl BackendSink {
    pub(crate) fn new(generation: u64, tx: Sender<Incoming>) -> Self {
        Self { generation, tx }
    }

    /// Best-effort: returns false once the player is gone.
    pub fn send(&self, event: BackendEvent) -> bool {
        self.tx
            .send(Incoming::Backend {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Positions and lengths are nanoseconds.
pub trait Backend {
    fn set_state(&mut self, state: BackendState) -> Result<StateChange>;

    fn state(&self) -> BackendState;

    fn seek(&mut self, position: i64) -> Result<()>;

    fn tell(&self) -> Option<i64>;

    fn length(&self) -> Option<i64>;

    /// 0..=100
    fn set_volume(&mut self, volume: u8) -> Result<()>;

    fn set_mute(&mut self, mute: bool) -> Result<()> {
        let _ = mute;
        Err(Error::MissingCapability("set_mute"))
    }
}

pub trait BackendFactory {
    fn create(&self, uri: &str, sink: BackendSink) -> Result<Box<dyn Backend>>;
}
