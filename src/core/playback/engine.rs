//! core/playback/engine.rs
//! Rodio backend.
//!
//! One worker thread per loaded stream. The worker owns:
//! - OutputStream (must stay alive while the sink plays)
//! - Sink holding the decoded file
//! - command loop + periodic ticks (position, end-of-stream)
//!
//! The `RodioBackend` handle the player holds is just a command sender plus
//! a status snapshot the worker keeps up to date.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use super::super::error::{Error, Result};
use super::super::stream::uri_to_path;
use super::super::types::{duration_to_nanos, nanos_to_duration};
use super::backend::{Backend, BackendEvent, BackendFactory, BackendSink, BackendState, StateChange};

const TICK_MS: u64 = 200;

/// Builds a [`RodioBackend`] for `file://` URIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioFactory;

impl BackendFactory for RodioFactory {
    fn create(&self, uri: &str, sink: BackendSink) -> Result<Box<dyn Backend>> {
        let path = uri_to_path(uri)
            .ok_or_else(|| Error::Backend(format!("Unsupported URI (local files only): {uri}")))?;
        let backend = RodioBackend::open(path, sink)?;
        Ok(Box::new(backend))
    }
}

#[derive(Debug)]
enum EngineCommand {
    SetState(BackendState),
    Seek(Duration),
    SetVolume(f32), // 0.0..=1.0
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state: BackendState,
    position: i64,
    length: Option<i64>,
}

pub struct RodioBackend {
    command_tx: Sender<EngineCommand>,
    status: Arc<Mutex<Status>>,
}

impl RodioBackend {
    /// Spawn the worker and wait until the file is decodable and the output
    /// device is open.
    pub fn open(path: PathBuf, events: BackendSink) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<EngineCommand>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<(), String>>(1);
        let status = Arc::new(Mutex::new(Status {
            state: BackendState::Ready,
            position: 0,
            length: None,
        }));

        let worker_status = Arc::clone(&status);
        thread::Builder::new()
            .name("sonora-playback".into())
            .spawn(move || {
                let mut engine = match PlaybackEngine::open(&path, events, worker_status) {
                    Ok(e) => e,
                    Err(msg) => {
                        let _ = ready_tx.send(Err(msg));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                engine.run(command_rx);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { command_tx, status }),
            Ok(Err(msg)) => Err(Error::Backend(msg)),
            Err(_) => Err(Error::Backend("playback worker exited during startup".into())),
        }
    }

    fn send(&self, cmd: EngineCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|_| Error::Backend("playback worker is gone".into()))
    }

    fn snapshot(&self) -> Status {
        match self.status.lock() {
            Ok(s) => *s,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Status)) {
        match self.status.lock() {
            Ok(mut s) => f(&mut s),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Backend for RodioBackend {
    fn set_state(&mut self, state: BackendState) -> Result<StateChange> {
        if state == BackendState::Null {
            self.send(EngineCommand::Shutdown)?;
        } else {
            self.send(EngineCommand::SetState(state))?;
        }

        self.update(|s| {
            s.state = state;
            if state == BackendState::Ready {
                s.position = 0;
            }
        });
        Ok(StateChange::Success)
    }

    fn state(&self) -> BackendState {
        self.snapshot().state
    }

    fn seek(&mut self, position: i64) -> Result<()> {
        self.send(EngineCommand::Seek(nanos_to_duration(position)))?;
        self.update(|s| s.position = position.max(0));
        Ok(())
    }

    fn tell(&self) -> Option<i64> {
        Some(self.snapshot().position)
    }

    fn length(&self) -> Option<i64> {
        self.snapshot().length
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.send(EngineCommand::SetVolume(f32::from(volume.min(100)) / 100.0))
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        // Best-effort; the worker may already have exited.
        let _ = self.command_tx.send(EngineCommand::Shutdown);
    }
}

/// Lives on the worker thread.
struct PlaybackEngine {
    // Keep this alive for the lifetime of the engine!
    _stream: OutputStream,
    sink: Sink,
    state: BackendState,
    ended: bool,
    status: Arc<Mutex<Status>>,
    events: BackendSink,
}

impl PlaybackEngine {
    fn open(
        path: &Path,
        events: BackendSink,
        status: Arc<Mutex<Status>>,
    ) -> std::result::Result<Self, String> {
        // rodio 0.21.x: build/open the default output stream via OutputStreamBuilder
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| format!("Failed to open audio output: {e}"))?;

        // rodio 0.21.x: Sink is created from the stream's mixer
        let sink = Sink::connect_new(stream.mixer());

        let file = File::open(path).map_err(|e| format!("Failed to open file: {e}"))?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| format!("Decode failed: {e}"))?;
        let length = decoder.total_duration().map(duration_to_nanos);

        sink.pause();
        sink.append(decoder);

        if let Ok(mut s) = status.lock() {
            s.length = length;
        }

        debug!(path = %path.display(), ?length, "rodio backend ready");

        Ok(Self {
            _stream: stream,
            sink,
            state: BackendState::Ready,
            ended: false,
            status,
            events,
        })
    }

    fn run(&mut self, command_rx: Receiver<EngineCommand>) {
        let tick = Duration::from_millis(TICK_MS);

        loop {
            match command_rx.recv_timeout(tick) {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break;
                    }
                    while let Ok(cmd) = command_rx.try_recv() {
                        if self.handle_command(cmd) {
                            self.sink.stop();
                            return;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.tick();
        }

        self.sink.stop();
    }

    fn handle_command(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::SetState(state) => self.apply_state(state),
            EngineCommand::Seek(to) => {
                if let Err(e) = self.sink.try_seek(to) {
                    warn!("Seek failed (decoder may not support it): {e}");
                }
                self.ended = false;
            }
            EngineCommand::SetVolume(v) => self.sink.set_volume(v.clamp(0.0, 1.0)),
            EngineCommand::Shutdown => return true,
        }

        false
    }

    fn apply_state(&mut self, state: BackendState) {
        let old = self.state;
        if old == state {
            return;
        }

        match state {
            BackendState::Playing => self.sink.play(),
            BackendState::Paused => self.sink.pause(),
            BackendState::Ready | BackendState::Null => {
                self.sink.pause();
                if self.sink.try_seek(Duration::ZERO).is_err() {
                    debug!("rewind on stop not supported by decoder");
                }
                self.ended = false;
            }
        }

        self.state = state;
        let _ = self.events.send(BackendEvent::StateChanged {
            old,
            new: state,
            pending: None,
        });
    }

    fn tick(&mut self) {
        let position = duration_to_nanos(self.sink.get_pos());
        if let Ok(mut s) = self.status.lock() {
            s.position = position;
        }

        if self.state == BackendState::Playing && self.sink.empty() && !self.ended {
            self.ended = true;
            let _ = self.events.send(BackendEvent::Eos);
        }
    }
}
