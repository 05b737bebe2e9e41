//! core/metadata/scripted.rs
//! Prober that replays canned event scripts.
//!
//! Events are written into the sink before `probe` returns, so they are
//! delivered on the player's next dispatch.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::super::error::{Error, Result};
use super::super::playback::BackendState;
use super::probe::{ProbeEvent, ProbeHandle, ProbeSink, Prober};

#[derive(Default)]
struct Scripts {
    by_uri: HashMap<String, Vec<ProbeEvent>>,
    durations: HashMap<String, i64>,
    refuse: HashSet<String>,
    probed: Vec<String>,
}

#[derive(Clone, Default)]
pub struct ScriptedProber {
    scripts: Rc<RefCell<Scripts>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// The events replayed for `uri`, in order. Unscripted URIs get
    /// [`ScriptedProber::prerolled`].
    pub fn script(&self, uri: &str, events: Vec<ProbeEvent>) {
        self.scripts
            .borrow_mut()
            .by_uri
            .insert(uri.to_owned(), events);
    }

    /// Tags followed by a normal preroll.
    pub fn script_tags(&self, uri: &str, tags: &[(&str, &str)]) {
        let mut events: Vec<ProbeEvent> = tags
            .iter()
            .map(|(name, value)| ProbeEvent::Tag {
                name: (*name).to_owned(),
                value: (*value).into(),
            })
            .collect();
        events.extend(Self::prerolled());
        self.script(uri, events);
    }

    pub fn set_duration(&self, uri: &str, ns: i64) {
        self.scripts
            .borrow_mut()
            .durations
            .insert(uri.to_owned(), ns);
    }

    /// Make `probe` itself fail for `uri`.
    pub fn refuse(&self, uri: &str) {
        self.scripts.borrow_mut().refuse.insert(uri.to_owned());
    }

    pub fn prerolled() -> Vec<ProbeEvent> {
        vec![
            ProbeEvent::StateChanged {
                old: BackendState::Ready,
                new: BackendState::Paused,
            },
            ProbeEvent::NewClock,
        ]
    }

    /// URIs probed so far, oldest first.
    pub fn probed(&self) -> Vec<String> {
        self.scripts.borrow().probed.clone()
    }

    pub fn probe_count(&self) -> usize {
        self.scripts.borrow().probed.len()
    }
}

impl Prober for ScriptedProber {
    fn probe(&self, uri: &str, sink: ProbeSink) -> Result<Box<dyn ProbeHandle>> {
        let mut scripts = self.scripts.borrow_mut();
        scripts.probed.push(uri.to_owned());

        if scripts.refuse.contains(uri) {
            return Err(Error::Probe(format!("cannot probe {uri}")));
        }

        let events = scripts
            .by_uri
            .get(uri)
            .cloned()
            .unwrap_or_else(Self::prerolled);
        for event in events {
            sink.send(event);
        }

        Ok(Box::new(ScriptedProbe {
            duration: scripts.durations.get(uri).copied(),
        }))
    }
}

struct ScriptedProbe {
    duration: Option<i64>,
}

impl ProbeHandle for ScriptedProbe {
    fn duration(&self) -> Option<i64> {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::playback::Incoming;
    use std::sync::mpsc;

    #[test]
    fn replays_script_then_default() {
        let (tx, rx) = mpsc::channel();
        let prober = ScriptedProber::new();
        prober.script_tags("file:///a.mp3", &[("title", "Intro")]);
        prober.set_duration("file:///a.mp3", 42);

        let handle = prober
            .probe("file:///a.mp3", ProbeSink::new(1, tx.clone()))
            .unwrap();
        assert_eq!(handle.duration(), Some(42));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            Incoming::Probe { event: ProbeEvent::Tag { name, .. }, .. } if name == "title"
        ));

        let handle = prober
            .probe("file:///b.mp3", ProbeSink::new(2, tx))
            .unwrap();
        assert_eq!(handle.duration(), None);
        assert_eq!(rx.try_iter().count(), 2);
        assert_eq!(prober.probe_count(), 2);
    }

    #[test]
    fn refused_uri_fails_to_start() {
        let (tx, _rx) = mpsc::channel();
        let prober = ScriptedProber::new();
        prober.refuse("file:///x.mp3");
        assert!(matches!(
            prober.probe("file:///x.mp3", ProbeSink::new(1, tx)),
            Err(Error::Probe(_))
        ));
        assert_eq!(prober.probed(), vec!["file:///x.mp3".to_string()]);
    }
}
