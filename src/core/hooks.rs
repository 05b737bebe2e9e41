//! core/hooks.rs
//! Interceptors consulted before every mutating player operation.
//!
//! - A hook sees a [`HookEvent`] describing what is about to happen.
//! - Returning [`HookOutcome::Continue`] lets the next hook (and finally the
//!   player's default action) run.
//! - Anything else stops the chain and replaces the default action: the
//!   player does no further work and sends no notification for that call.
//!
//! The most recently added hook runs first, so layers registered late get
//! first refusal.

use std::cell::RefCell;
use std::rc::Rc;

use super::stream::StreamRef;
use super::types::PlayerState;

#[derive(Debug, Clone)]
pub enum HookEvent {
    Play,
    Pause,
    Stop,
    /// Nanoseconds
    Seek { from: i64, to: i64 },
    Volume(u8),
    Mute(bool),
    Insert { stream: StreamRef, pos: usize },
    Remove { stream: StreamRef, pos: usize },
    Queue { stream: StreamRef, pos: usize, queue_pos: usize },
    Dequeue { stream: StreamRef, queue_pos: usize },
    QueueClear,
    Change { from: Option<usize>, to: Option<usize> },
    Clear,
    Repeat(bool),
    Random(bool),
    Eos,
    Tag { stream: StreamRef, tag: String },
    AllTags { stream: StreamRef },
    Error { stream: Option<StreamRef>, message: String },
    /// State reported by the backend (as opposed to requested by a caller)
    StateChanged(PlayerState),
}

impl HookEvent {
    /// Short name used in logs and `BlockedByHook` errors.
    pub fn kind(&self) -> &'static str {
        match self {
            HookEvent::Play => "play",
            HookEvent::Pause => "pause",
            HookEvent::Stop => "stop",
            HookEvent::Seek { .. } => "seek",
            HookEvent::Volume(_) => "volume",
            HookEvent::Mute(_) => "mute",
            HookEvent::Insert { .. } => "insert",
            HookEvent::Remove { .. } => "remove",
            HookEvent::Queue { .. } => "queue",
            HookEvent::Dequeue { .. } => "dequeue",
            HookEvent::QueueClear => "queue-clear",
            HookEvent::Change { .. } => "change",
            HookEvent::Clear => "clear",
            HookEvent::Repeat(_) => "repeat",
            HookEvent::Random(_) => "random",
            HookEvent::Eos => "eos",
            HookEvent::Tag { .. } => "tag",
            HookEvent::AllTags { .. } => "all-tags",
            HookEvent::Error { .. } => "error",
            HookEvent::StateChanged(_) => "state-changed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Not interested; keep going.
    Continue,
    /// The hook took care of it. The call reports success.
    Handled,
    /// Veto. The call fails with `Error::BlockedByHook`.
    Blocked,
    /// Like `Handled`, with the value the call should return
    /// (only meaningful for `queue`, which returns a queue index).
    HandledWith(usize),
}

impl HookOutcome {
    pub fn is_intercepted(self) -> bool {
        self != HookOutcome::Continue
    }
}

pub trait Hook {
    fn handle(&mut self, event: &HookEvent) -> HookOutcome;
}

impl<F> Hook for F
where
    F: FnMut(&HookEvent) -> HookOutcome,
{
    fn handle(&mut self, event: &HookEvent) -> HookOutcome {
        self(event)
    }
}

/// Shared handle to a hook. Keep a clone to remove it later.
pub type HookRef = Rc<RefCell<dyn Hook>>;

pub fn hook<H: Hook + 'static>(h: H) -> HookRef {
    Rc::new(RefCell::new(h))
}

#[derive(Default)]
pub struct HookChain {
    hooks: Vec<HookRef>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend.
    pub fn add(&mut self, hook: HookRef) {
        self.hooks.insert(0, hook);
    }

    /// Remove the first entry that is this same hook. No-op when absent.
    pub fn remove(&mut self, hook: &HookRef) -> bool {
        match self.hooks.iter().position(|h| Rc::ptr_eq(h, hook)) {
            Some(i) => {
                self.hooks.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn run(&self, event: &HookEvent) -> HookOutcome {
        for h in &self.hooks {
            // A hook already running further up the stack (re-entered
            // through a shared player handle) cannot be asked again.
            let Ok(mut h) = h.try_borrow_mut() else {
                continue;
            };

            let outcome = h.handle(event);
            if outcome.is_intercepted() {
                tracing::debug!(event = event.kind(), ?outcome, "hook intercepted");
                return outcome;
            }
        }
        HookOutcome::Continue
    }
}
