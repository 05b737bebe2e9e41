//! core/playback/null.rs
//! A backend that plays nothing.
//!
//! Used for headless runs (`--scan`) and by tests. Every backend created by a
//! [`NullFactory`] shares a device record with the factory, so the caller can
//! look at what the player asked for (volume, mute, seeks) and push events
//! as if they came from a real pipeline.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::super::error::{Error, Result};
use super::super::types::NANOS_PER_SEC;
use super::backend::{Backend, BackendEvent, BackendFactory, BackendSink, BackendState, StateChange};

const DEFAULT_LENGTH: i64 = 180 * NANOS_PER_SEC;

/// Snapshot of the most recently created backend.
#[derive(Debug, Clone, PartialEq)]
pub struct NullDevice {
    pub uri: String,
    pub state: BackendState,
    pub position: i64,
    pub length: i64,
    pub volume: Option<u8>,
    pub mute: Option<bool>,
    pub seeks: Vec<i64>,
    /// False once the player dropped it
    pub alive: bool,
}

struct Device {
    info: NullDevice,
    sink: BackendSink,
}

struct Shared {
    current: Option<Rc<RefCell<Device>>>,
    created: Vec<String>,
    fail_uris: HashSet<String>,
    fail_states: bool,
    async_states: bool,
    native_mute: bool,
    length: i64,
}

#[derive(Clone)]
pub struct NullFactory {
    shared: Rc<RefCell<Shared>>,
}

impl Default for NullFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl NullFactory {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                current: None,
                created: Vec::new(),
                fail_uris: HashSet::new(),
                fail_states: false,
                async_states: false,
                native_mute: false,
                length: DEFAULT_LENGTH,
            })),
        }
    }

    /// Refuse to build a backend for `uri`.
    pub fn fail_on(&self, uri: &str) {
        self.shared.borrow_mut().fail_uris.insert(uri.to_owned());
    }

    /// Make every `set_state` call fail.
    pub fn fail_states(&self, fail: bool) {
        self.shared.borrow_mut().fail_states = fail;
    }

    /// Report state changes only through events, the way a real pipeline
    /// prerolls. Going to Playing then passes through Paused first.
    pub fn set_async(&self, async_states: bool) {
        self.shared.borrow_mut().async_states = async_states;
    }

    pub fn set_native_mute(&self, native: bool) {
        self.shared.borrow_mut().native_mute = native;
    }

    /// Length reported by backends created from now on.
    pub fn set_length(&self, ns: i64) {
        self.shared.borrow_mut().length = ns;
    }

    /// URIs of every backend built so far, oldest first.
    pub fn created(&self) -> Vec<String> {
        self.shared.borrow().created.clone()
    }

    pub fn device(&self) -> Option<NullDevice> {
        let shared = self.shared.borrow();
        shared.current.as_ref().map(|d| d.borrow().info.clone())
    }

    pub fn set_position(&self, ns: i64) {
        if let Some(d) = &self.shared.borrow().current {
            d.borrow_mut().info.position = ns;
        }
    }

    /// Push an event as if the current backend produced it.
    pub fn emit(&self, event: BackendEvent) -> bool {
        let shared = self.shared.borrow();
        let Some(d) = &shared.current else {
            return false;
        };
        let d = d.borrow();
        d.info.alive && d.sink.send(event)
    }

    /// Jump to the end and report end-of-stream.
    pub fn finish(&self) -> bool {
        if let Some(d) = &self.shared.borrow().current {
            let mut d = d.borrow_mut();
            d.info.position = d.info.length;
        }
        self.emit(BackendEvent::Eos)
    }
}

impl BackendFactory for NullFactory {
    fn create(&self, uri: &str, sink: BackendSink) -> Result<Box<dyn Backend>> {
        let mut shared = self.shared.borrow_mut();
        if shared.fail_uris.contains(uri) {
            return Err(Error::Backend(format!("cannot open {uri}")));
        }

        let device = Rc::new(RefCell::new(Device {
            info: NullDevice {
                uri: uri.to_owned(),
                state: BackendState::Ready,
                position: 0,
                length: shared.length,
                volume: None,
                mute: None,
                seeks: Vec::new(),
                alive: true,
            },
            sink,
        }));

        shared.created.push(uri.to_owned());
        shared.current = Some(Rc::clone(&device));

        Ok(Box::new(NullBackend {
            device,
            shared: Rc::clone(&self.shared),
        }))
    }
}

pub struct NullBackend {
    device: Rc<RefCell<Device>>,
    shared: Rc<RefCell<Shared>>,
}

impl Backend for NullBackend {
    fn set_state(&mut self, state: BackendState) -> Result<StateChange> {
        let (fail, async_states) = {
            let shared = self.shared.borrow();
            (shared.fail_states, shared.async_states)
        };
        if fail {
            return Err(Error::Backend("state change refused".into()));
        }

        let mut d = self.device.borrow_mut();
        let old = d.info.state;
        if old == state {
            return Ok(StateChange::Success);
        }
        d.info.state = state;

        if state == BackendState::Ready {
            d.info.position = 0;
        }

        if async_states && state == BackendState::Playing && old != BackendState::Paused {
            d.sink.send(BackendEvent::StateChanged {
                old,
                new: BackendState::Paused,
                pending: None,
            });
            d.sink.send(BackendEvent::StateChanged {
                old: BackendState::Paused,
                new: state,
                pending: None,
            });
        } else {
            d.sink.send(BackendEvent::StateChanged {
                old,
                new: state,
                pending: None,
            });
        }

        Ok(if async_states {
            StateChange::Async
        } else {
            StateChange::Success
        })
    }

    fn state(&self) -> BackendState {
        self.device.borrow().info.state
    }

    fn seek(&mut self, position: i64) -> Result<()> {
        let mut d = self.device.borrow_mut();
        let clamped = position.clamp(0, d.info.length.max(0));
        d.info.position = clamped;
        d.info.seeks.push(clamped);
        Ok(())
    }

    fn tell(&self) -> Option<i64> {
        Some(self.device.borrow().info.position)
    }

    fn length(&self) -> Option<i64> {
        let length = self.device.borrow().info.length;
        (length >= 0).then_some(length)
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.device.borrow_mut().info.volume = Some(volume);
        Ok(())
    }

    fn set_mute(&mut self, mute: bool) -> Result<()> {
        if !self.shared.borrow().native_mute {
            return Err(Error::MissingCapability("set_mute"));
        }
        self.device.borrow_mut().info.mute = Some(mute);
        Ok(())
    }
}

impl Drop for NullBackend {
    fn drop(&mut self) {
        let mut d = self.device.borrow_mut();
        d.info.alive = false;
        d.info.state = BackendState::Null;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::playback::Incoming;
    use std::sync::mpsc;

    #[test]
    fn records_requests_and_forwards_events() {
        let (tx, rx) = mpsc::channel();
        let factory = NullFactory::new();
        let mut backend = factory
            .create("file:///a.mp3", BackendSink::new(3, tx))
            .unwrap();

        backend.set_volume(40).unwrap();
        assert!(matches!(
            backend.set_mute(true),
            Err(Error::MissingCapability(_))
        ));
        backend.seek(5 * NANOS_PER_SEC).unwrap();

        let dev = factory.device().unwrap();
        assert_eq!(dev.volume, Some(40));
        assert_eq!(dev.seeks, vec![5 * NANOS_PER_SEC]);

        assert!(factory.finish());
        match rx.try_recv().unwrap() {
            Incoming::Backend { generation, event } => {
                assert_eq!(generation, 3);
                assert!(matches!(event, BackendEvent::Eos));
            }
            other => panic!("unexpected {other:?}"),
        }

        drop(backend);
        assert!(!factory.device().unwrap().alive);
        assert!(!factory.emit(BackendEvent::Eos));
    }

    #[test]
    fn refuses_configured_uris() {
        let (tx, _rx) = mpsc::channel();
        let factory = NullFactory::new();
        factory.fail_on("file:///bad.mp3");
        assert!(factory
            .create("file:///bad.mp3", BackendSink::new(1, tx))
            .is_err());
        assert!(factory.created().is_empty());
    }
}
