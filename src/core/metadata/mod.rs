//! core/metadata
//! Asynchronous tag extraction for streams that were inserted but not played.
//!
//! Streams wait in a queue and are probed one at a time. A probe is a
//! disposable, silent backend built by a [`Prober`]; it reports tags and
//! preroll progress through the player's event channel. Once the probe has
//! prerolled and selected a clock (or hit an error or end-of-stream) the
//! stream is marked `all_tags` and the next one starts on the following idle
//! pass.

mod container;
mod file;
mod probe;
mod scripted;

pub use file::FileProber;
pub use probe::{ProbeEvent, ProbeHandle, ProbeSink, Prober};
pub use scripted::ScriptedProber;

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::Sender;

use tracing::{debug, trace};

use super::playback::{BackendState, Incoming};
use super::stream::{StreamRef, TagValue, tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Front of the queue
    Immediate,
    Default,
}

/// What the parser learned; the player turns these into hooks and
/// notifications.
#[derive(Debug, Clone)]
pub enum ParserEvent {
    Tag(StreamRef, String),
    AllTags(StreamRef),
}

struct ActiveProbe {
    stream: StreamRef,
    handle: Option<Box<dyn ProbeHandle>>,
    generation: u64,
    prerolled: bool,
    clock: bool,
}

pub struct MetadataParser {
    pending: VecDeque<StreamRef>,
    active: Option<ActiveProbe>,
    idle_scheduled: bool,
    prober: Box<dyn Prober>,
    generation: u64,
    tx: Sender<Incoming>,
}

impl MetadataParser {
    pub(crate) fn new(prober: Box<dyn Prober>, tx: Sender<Incoming>) -> Self {
        Self {
            pending: VecDeque::new(),
            active: None,
            idle_scheduled: false,
            prober,
            generation: 0,
            tx,
        }
    }

    /// Queue `stream` for extraction. Streams already parsed, queued or in
    /// flight are left alone; an `Immediate` request for a queued stream
    /// moves it to the front.
    pub fn submit(&mut self, stream: StreamRef, priority: Priority) {
        if stream.all_tags() {
            return;
        }
        if self
            .active
            .as_ref()
            .is_some_and(|a| Rc::ptr_eq(&a.stream, &stream))
        {
            return;
        }

        if let Some(i) = self.pending.iter().position(|s| Rc::ptr_eq(s, &stream)) {
            if priority == Priority::Immediate && i > 0 {
                if let Some(s) = self.pending.remove(i) {
                    self.pending.push_front(s);
                }
            }
            return;
        }

        trace!(uri = stream.uri(), ?priority, "queued for parsing");
        match priority {
            Priority::Immediate => self.pending.push_front(stream),
            Priority::Default => self.pending.push_back(stream),
        }

        if self.active.is_none() {
            self.idle_scheduled = true;
        }
    }

    pub fn has_idle_work(&self) -> bool {
        self.idle_scheduled
    }

    /// Start the next probe if one is due. Returns events for a probe that
    /// failed to start, since it finishes on the spot.
    pub fn run_idle(&mut self) -> Vec<ParserEvent> {
        let mut events = Vec::new();
        if !self.idle_scheduled {
            return events;
        }
        self.idle_scheduled = false;

        while self.active.is_none() {
            let Some(stream) = self.pending.pop_front() else {
                break;
            };
            if stream.all_tags() {
                continue;
            }

            self.generation += 1;
            let sink = ProbeSink::new(self.generation, self.tx.clone());
            debug!(uri = stream.uri(), "parsing");

            match self.prober.probe(stream.uri(), sink) {
                Ok(handle) => {
                    self.active = Some(ActiveProbe {
                        stream,
                        handle: Some(handle),
                        generation: self.generation,
                        prerolled: false,
                        clock: false,
                    });
                }
                Err(e) => {
                    debug!(uri = stream.uri(), "probe did not start: {e}");
                    self.finish(
                        ActiveProbe {
                            stream,
                            handle: None,
                            generation: self.generation,
                            prerolled: false,
                            clock: false,
                        },
                        &mut events,
                    );
                    // One probe per idle pass, failed or not.
                    break;
                }
            }
        }

        events
    }

    pub(crate) fn handle_probe_event(
        &mut self,
        generation: u64,
        event: ProbeEvent,
    ) -> Vec<ParserEvent> {
        let mut events = Vec::new();

        let Some(active) = self.active.as_mut() else {
            trace!(generation, "probe event with nothing in flight");
            return events;
        };
        if active.generation != generation {
            trace!(generation, current = active.generation, "stale probe event");
            return events;
        }

        let done = match event {
            ProbeEvent::Tag { name, value } => {
                active.stream.set_tag(&name, Some(value));
                events.push(ParserEvent::Tag(Rc::clone(&active.stream), name));
                false
            }
            ProbeEvent::StateChanged { old, new } => {
                if old == BackendState::Ready && new == BackendState::Paused {
                    active.prerolled = true;
                }
                active.prerolled && active.clock
            }
            ProbeEvent::NewClock => {
                active.clock = true;
                active.prerolled
            }
            ProbeEvent::Eos => true,
            ProbeEvent::Error(msg) => {
                debug!(uri = active.stream.uri(), "probe error: {msg}");
                true
            }
        };

        if done {
            if let Some(active) = self.active.take() {
                self.finish(active, &mut events);
            }
        }

        events
    }

    fn finish(&mut self, mut active: ActiveProbe, events: &mut Vec<ParserEvent>) {
        let stream = active.stream;

        if let Some(ns) = active.handle.as_ref().and_then(|h| h.duration()) {
            stream.set_length(ns);
        }

        stream.set_tag(tag::URI, Some(TagValue::Text(stream.uri().to_owned())));
        events.push(ParserEvent::Tag(Rc::clone(&stream), tag::URI.to_owned()));

        stream.set_all_tags(true);
        events.push(ParserEvent::AllTags(Rc::clone(&stream)));

        active.handle.take();
        if !self.pending.is_empty() {
            self.idle_scheduled = true;
        }
    }

    /// Drop the probe in flight and everything waiting.
    pub fn clear(&mut self) {
        self.active = None;
        self.pending.clear();
        self.idle_scheduled = false;
        self.generation += 1;
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.pending.is_empty()
    }

    /// Streams waiting, not counting the one in flight.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight(&self) -> Option<&StreamRef> {
        self.active.as_ref().map(|a| &a.stream)
    }
}
