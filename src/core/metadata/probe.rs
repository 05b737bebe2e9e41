//! core/metadata/probe.rs
//! Disposable probe-only backends used by the metadata parser.

use std::sync::mpsc::Sender;

use super::super::error::Result;
use super::super::playback::{BackendState, Incoming};
use super::super::stream::TagValue;

/// What a running probe reports back.
#[derive(Debug, Clone)]
pub enum ProbeEvent {
    Tag { name: String, value: TagValue },
    StateChanged { old: BackendState, new: BackendState },
    /// A clock was selected: the pipeline is live and prerolled
    NewClock,
    Eos,
    Error(String),
}

#[derive(Clone)]
pub struct ProbeSink {
    generation: u64,
    tx: Sender<Incoming>,
}

impl ProbeSink {
    pub(crate) fn new(generation: u64, tx: Sender<Incoming>) -> Self {
        Self { generation, tx }
    }

    /// Best-effort: returns false once the player is gone.
    pub fn send(&self, event: ProbeEvent) -> bool {
        self.tx
            .send(Incoming::Probe {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// A probe in flight. Dropping it tears the probe down.
pub trait ProbeHandle {
    /// Nanoseconds, once known.
    fn duration(&self) -> Option<i64>;
}

pub trait Prober {
    fn probe(&self, uri: &str, sink: ProbeSink) -> Result<Box<dyn ProbeHandle>>;
}
