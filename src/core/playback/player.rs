//! core/playback/player.rs
//! The player: playlist + queue + hooks + metadata parser around one backend.
//!
//! Every public mutating call follows the same shape:
//!   1. validate
//!   2. run the hook chain (a hook may take over or veto)
//!   3. mutate
//!   4. notify subscribers
//!
//! Backends and probes report back through an mpsc channel that the owner
//! drains with [`Player::dispatch`] / [`Player::iterate`]; nothing here is
//! driven from another thread.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::super::error::{Error, Result};
use super::super::events::{Notification, Notifier};
use super::super::hooks::{HookChain, HookEvent, HookOutcome, HookRef};
use super::super::metadata::{MetadataParser, ParserEvent, Priority, Prober};
use super::super::playlist::Playlist;
use super::super::queue::Queue;
use super::super::stream::{Stream, StreamRef};
use super::super::types::{NANOS_PER_MILLI, PlayerState, SeekFormat};
use super::Incoming;
use super::backend::{Backend, BackendEvent, BackendFactory, BackendSink, BackendState, StateChange};

/// Backends report a transient pause right after preroll; anything this
/// close to the start is not a user-visible pause.
const PREROLL_PAUSE_WINDOW: i64 = 50 * NANOS_PER_MILLI;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOptions {
    /// Submit inserted streams to the metadata parser
    pub auto_parse: bool,
    /// Start playing when the first stream lands in an empty playlist
    pub auto_play: bool,
    /// 0..=100
    pub volume: u8,
    pub mute: bool,
    /// Fixed shuffle seed (tests, reproducible sessions)
    pub seed: Option<u64>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            auto_parse: true,
            auto_play: false,
            volume: 50,
            mute: false,
            seed: None,
        }
    }
}

pub struct Player {
    playlist: Playlist,
    queue: Queue,
    hooks: HookChain,
    notifier: Notifier,
    parser: MetadataParser,

    factory: Box<dyn BackendFactory>,
    backend: Option<Box<dyn Backend>>,
    /// Bumped whenever a backend is torn down; older messages are stale
    generation: u64,

    volume: u8,
    mute: bool,
    /// Mute done by zeroing the backend volume
    mute_emulated: bool,

    /// Reported instead of the backend state while switching streams
    shadow_state: Option<PlayerState>,
    last_state: PlayerState,

    options: PlayerOptions,
    tx: Sender<Incoming>,
    rx: Receiver<Incoming>,
}

impl Player {
    pub fn new(
        factory: Box<dyn BackendFactory>,
        prober: Box<dyn Prober>,
        options: PlayerOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let playlist = match options.seed {
            Some(seed) => Playlist::with_seed(seed),
            None => Playlist::new(),
        };

        Self {
            playlist,
            queue: Queue::new(),
            hooks: HookChain::new(),
            notifier: Notifier::default(),
            parser: MetadataParser::new(prober, tx.clone()),
            factory,
            backend: None,
            generation: 0,
            volume: options.volume.min(100),
            mute: options.mute,
            mute_emulated: false,
            shadow_state: None,
            last_state: PlayerState::Stop,
            options,
            tx,
            rx,
        }
    }

    // ---------------------------------------------------------------------
    // Hooks and subscribers
    // ---------------------------------------------------------------------

    pub fn hook_add(&mut self, hook: HookRef) {
        self.hooks.add(hook);
    }

    pub fn hook_remove(&mut self, hook: &HookRef) -> bool {
        self.hooks.remove(hook)
    }

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Run the chain. `Ok(true)` means a hook took over and the caller should
    /// return success without doing anything.
    fn intercept(&self, event: &HookEvent) -> Result<bool> {
        match self.hooks.run(event) {
            HookOutcome::Continue => Ok(false),
            HookOutcome::Blocked => Err(Error::BlockedByHook(event.kind())),
            HookOutcome::Handled | HookOutcome::HandledWith(_) => Ok(true),
        }
    }

    fn emit(&mut self, n: Notification) {
        self.notifier.emit(n);
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    pub fn current(&self) -> Option<usize> {
        self.playlist.current()
    }

    pub fn current_stream(&self) -> Option<StreamRef> {
        self.playlist.current_stream().cloned()
    }

    pub fn total(&self) -> usize {
        self.playlist.len()
    }

    pub fn nth_stream(&self, pos: usize) -> Option<StreamRef> {
        self.playlist.nth(pos).cloned()
    }

    pub fn index_of(&self, stream: &Stream) -> Option<usize> {
        self.playlist.index_of(stream)
    }

    pub fn streams(&self) -> &[StreamRef] {
        self.playlist.streams()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_position(&self, stream: &Stream) -> Option<usize> {
        self.queue.position_of(stream)
    }

    pub fn queued(&self) -> impl Iterator<Item = &StreamRef> {
        self.queue.iter()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn repeat(&self) -> bool {
        self.playlist.repeat()
    }

    pub fn random(&self) -> bool {
        self.playlist.random()
    }

    pub fn parser(&self) -> &MetadataParser {
        &self.parser
    }

    /// The queue head wins over playlist order.
    pub fn get_next(&self) -> Option<usize> {
        if let Some(i) = self.queue.peek().and_then(|s| self.playlist.index_of(s)) {
            return Some(i);
        }
        self.playlist.get_next()
    }

    pub fn get_previous(&self) -> Option<usize> {
        self.playlist.get_previous()
    }

    pub fn can_go_next(&self) -> bool {
        self.get_next().is_some()
    }

    pub fn can_go_previous(&self) -> bool {
        self.get_previous().is_some()
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    pub fn state(&self) -> PlayerState {
        if let Some(s) = self.shadow_state {
            return s;
        }

        match (&self.backend, self.playlist.current()) {
            (Some(b), Some(_)) => match b.state() {
                BackendState::Null => PlayerState::Invalid,
                other => other.to_player(),
            },
            _ => PlayerState::Stop,
        }
    }

    pub fn set_state(&mut self, target: PlayerState) -> Result<()> {
        let event = match target {
            PlayerState::Play => HookEvent::Play,
            PlayerState::Pause => HookEvent::Pause,
            PlayerState::Stop | PlayerState::Invalid => HookEvent::Stop,
        };
        if self.intercept(&event)? {
            return Ok(());
        }

        if self.state() == target {
            return Ok(());
        }

        self.request_state(target)
    }

    pub fn play(&mut self) -> Result<()> {
        self.set_state(PlayerState::Play)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.set_state(PlayerState::Pause)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.set_state(PlayerState::Stop)
    }

    /// Ask the backend for `target` without consulting hooks.
    fn request_state(&mut self, target: PlayerState) -> Result<()> {
        // Stopping rewinds, so the position has to be read first.
        let before = self.tell(SeekFormat::Time).unwrap_or(0);
        let Some(backend) = self.backend.as_mut() else {
            return match target {
                PlayerState::Stop | PlayerState::Invalid => {
                    self.reconcile();
                    Ok(())
                }
                _ => Err(Error::NoStream),
            };
        };

        let wanted = BackendState::from_player(target)
            .ok_or_else(|| Error::InvalidArgument(format!("cannot request state {target}")))?;

        match backend.set_state(wanted) {
            Ok(StateChange::Success) => {
                self.reconcile_at(before);
                Ok(())
            }
            Ok(StateChange::Async) => {
                trace!(%target, "state change in progress");
                Ok(())
            }
            Err(Error::Backend(msg)) => Err(Error::Backend(msg)),
            Err(e) => Err(Error::Backend(e.to_string())),
        }
    }

    fn reconcile(&mut self) {
        let position = self.tell(SeekFormat::Time).unwrap_or(0);
        self.reconcile_at(position);
    }

    /// Emit Play/Pause/Stop if the logical state moved since the last one sent.
    fn reconcile_at(&mut self, position: i64) {
        let state = self.state();
        if state == self.last_state {
            return;
        }
        debug!(from = %self.last_state, to = %state, position, "state");
        self.last_state = state;

        match state {
            PlayerState::Play => self.emit(Notification::Play { position }),
            PlayerState::Pause => self.emit(Notification::Pause { position }),
            PlayerState::Stop => self.emit(Notification::Stop { position }),
            PlayerState::Invalid => {}
        }
    }

    // ---------------------------------------------------------------------
    // Position
    // ---------------------------------------------------------------------

    pub fn seek(&mut self, format: SeekFormat, value: i64) -> Result<()> {
        if self.backend.is_none() || self.playlist.current().is_none() {
            return Err(Error::NoStream);
        }

        let to = match format {
            SeekFormat::Time => value,
            SeekFormat::Percent => {
                if !(0..=100).contains(&value) {
                    return Err(Error::InvalidArgument(format!(
                        "seek percent out of range: {value}"
                    )));
                }
                let length = self
                    .length(SeekFormat::Time)
                    .ok_or(Error::MissingCapability("length"))?;
                length.checked_mul(value).map(|v| v / 100).ok_or_else(|| {
                    Error::InvalidArgument(format!("length too large to seek by percent: {length}"))
                })?
            }
        };
        if to < 0 {
            return Err(Error::InvalidArgument(format!("negative seek target: {to}")));
        }

        let from = self.tell(SeekFormat::Time).unwrap_or(0);
        if self.intercept(&HookEvent::Seek { from, to })? {
            return Ok(());
        }

        if let Some(backend) = self.backend.as_mut() {
            backend.seek(to)?;
        }
        self.emit(Notification::Seek { from, to });
        Ok(())
    }

    pub fn tell(&self, format: SeekFormat) -> Option<i64> {
        self.playlist.current()?;
        let position = self.backend.as_ref()?.tell()?;
        match format {
            SeekFormat::Time => Some(position),
            SeekFormat::Percent => {
                let length = self.length(SeekFormat::Time)?;
                if length <= 0 {
                    return None;
                }
                let percent = i128::from(position) * 100 / i128::from(length);
                i64::try_from(percent).ok()
            }
        }
    }

    /// Backend length, falling back to what the parser found.
    pub fn length(&self, format: SeekFormat) -> Option<i64> {
        let stream = self.playlist.current_stream()?;
        let length = self
            .backend
            .as_ref()
            .and_then(|b| b.length())
            .or_else(|| (stream.length() >= 0).then(|| stream.length()))?;

        match format {
            SeekFormat::Time => Some(length),
            SeekFormat::Percent => Some(100),
        }
    }

    // ---------------------------------------------------------------------
    // Volume / mute
    // ---------------------------------------------------------------------

    /// Negative means "reapply the stored volume". Clamped to 0..=100.
    pub fn set_volume(&mut self, volume: i32) -> Result<()> {
        let volume = if volume < 0 {
            self.volume
        } else {
            volume.min(100) as u8
        };

        if self.backend.is_none() {
            if volume != self.volume {
                self.volume = volume;
                self.emit(Notification::Volume(volume));
            }
            return Ok(());
        }

        if self.intercept(&HookEvent::Volume(volume))? {
            return Ok(());
        }

        let effective = if self.mute_emulated { 0 } else { volume };
        if let Some(backend) = self.backend.as_mut() {
            backend.set_volume(effective)?;
        }
        self.volume = volume;
        self.emit(Notification::Volume(volume));
        Ok(())
    }

    pub fn set_mute(&mut self, mute: bool) -> Result<()> {
        if self.backend.is_none() {
            if mute != self.mute {
                self.mute = mute;
                self.emit(Notification::Mute(mute));
            }
            return Ok(());
        }

        if self.intercept(&HookEvent::Mute(mute))? {
            return Ok(());
        }

        if let Some(backend) = self.backend.as_mut() {
            self.mute_emulated = apply_mute(backend.as_mut(), mute, self.volume)?;
        }
        self.mute = mute;
        self.emit(Notification::Mute(mute));
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Backend lifecycle
    // ---------------------------------------------------------------------

    fn create_backend(&mut self, stream: &StreamRef) -> Result<()> {
        self.release_backend();

        self.generation += 1;
        let sink = BackendSink::new(self.generation, self.tx.clone());
        let mut backend = self.factory.create(stream.uri(), sink)?;

        if let Err(e) = backend.set_volume(self.volume) {
            warn!(uri = stream.uri(), "could not apply volume: {e}");
        }
        self.mute_emulated = false;
        if self.mute {
            match apply_mute(backend.as_mut(), true, self.volume) {
                Ok(emulated) => self.mute_emulated = emulated,
                Err(e) => warn!(uri = stream.uri(), "could not apply mute: {e}"),
            }
        }

        debug!(uri = stream.uri(), generation = self.generation, "backend ready");
        self.backend = Some(backend);
        Ok(())
    }

    fn release_backend(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.set_state(BackendState::Null) {
                debug!("backend teardown: {e}");
            }
            self.generation += 1;
        }
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn go_to(&mut self, to: Option<usize>) -> Result<()> {
        let from = self.playlist.current();
        if self.intercept(&HookEvent::Change { from, to })? {
            return Ok(());
        }

        if let Some(pos) = to {
            if pos >= self.playlist.len() {
                return Err(Error::NoSuchItem(pos));
            }
        }
        if from == to {
            return Ok(());
        }

        let position = self.tell(SeekFormat::Time).unwrap_or(0);
        let length = self.length(SeekFormat::Time).unwrap_or(-1);
        self.emit(Notification::PreChange {
            from,
            to,
            position,
            length,
        });

        let Some(pos) = to else {
            self.unload();
            self.emit(Notification::Change { from, to: None });
            return Ok(());
        };

        match self.load(pos) {
            Ok(()) => {
                info!(from = ?from, to = pos, "change");
                self.emit(Notification::Change { from, to });
                Ok(())
            }
            Err(e) => {
                warn!(to = pos, "could not load stream: {e}");
                self.unload();
                self.emit(Notification::Change { from, to: None });
                Err(e)
            }
        }
    }

    pub fn go_next(&mut self) -> Result<()> {
        self.go_to(self.get_next())
    }

    pub fn go_previous(&mut self) -> Result<()> {
        self.go_to(self.get_previous())
    }

    /// Stop, drop the backend and clear the cursor.
    fn unload(&mut self) {
        self.shadow_state = None;
        let position = self.tell(SeekFormat::Time).unwrap_or(0);
        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.set_state(BackendState::Ready) {
                debug!("stop before unload: {e}");
            }
        }
        self.release_backend();
        // Index was validated by the caller or is None.
        let _ = self.playlist.set_current(None);
        self.reconcile_at(position);
    }

    /// Point the player at `pos`, keeping the current logical state.
    fn load(&mut self, pos: usize) -> Result<()> {
        let stream = self
            .playlist
            .nth(pos)
            .cloned()
            .ok_or(Error::NoSuchItem(pos))?;
        let saved = self.state();

        self.shadow_state = Some(saved);
        let loaded = self.load_stream(pos, &stream);
        self.shadow_state = None;

        if let Err(e) = loaded {
            stream.set_failed(true);
            return Err(e);
        }

        match saved {
            PlayerState::Play | PlayerState::Pause => self.request_state(saved),
            PlayerState::Stop | PlayerState::Invalid => {
                self.reconcile();
                Ok(())
            }
        }
    }

    fn load_stream(&mut self, pos: usize, stream: &StreamRef) -> Result<()> {
        self.create_backend(stream)?;

        if let Some(queue_pos) = self.queue.position_of(stream) {
            self.queue.remove(queue_pos);
            self.emit(Notification::Dequeue {
                stream: Rc::clone(stream),
                queue_pos,
            });
        }

        self.playlist.set_current(Some(pos))?;

        if self.options.auto_parse {
            self.parser.submit(Rc::clone(stream), Priority::Immediate);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Playlist editing
    // ---------------------------------------------------------------------

    pub fn insert(&mut self, stream: StreamRef, pos: Option<usize>) -> Result<()> {
        self.insert_many(vec![stream], pos)
    }

    pub fn insert_uri(&mut self, uri: &str, pos: Option<usize>) -> Result<()> {
        let stream = Stream::new(uri)?.shared();
        self.insert(stream, pos)
    }

    pub fn insert_paths(&mut self, paths: &[PathBuf], pos: Option<usize>) -> Result<()> {
        let streams = paths
            .iter()
            .map(|p| Stream::from_path(p).map(Stream::shared))
            .collect::<Result<Vec<_>>>()?;
        self.insert_many(streams, pos)
    }

    /// Insert in order starting at `pos` (`None` appends). Streams a hook
    /// takes over are skipped; a veto stops the batch.
    pub fn insert_many(&mut self, streams: Vec<StreamRef>, pos: Option<usize>) -> Result<()> {
        let was_empty = self.playlist.is_empty();
        let mut at = pos;
        let mut vetoed = false;

        for stream in streams {
            let len = self.playlist.len();
            let target = at.map_or(len, |p| p.min(len));

            let event = HookEvent::Insert {
                stream: Rc::clone(&stream),
                pos: target,
            };
            match self.hooks.run(&event) {
                HookOutcome::Continue => {}
                HookOutcome::Blocked => {
                    vetoed = true;
                    break;
                }
                HookOutcome::Handled | HookOutcome::HandledWith(_) => continue,
            }

            let index = self.playlist.insert(Rc::clone(&stream), Some(target));
            if at.is_some() {
                at = Some(index + 1);
            }
            trace!(uri = stream.uri(), index, "insert");
            self.emit(Notification::Insert {
                stream: Rc::clone(&stream),
                pos: index,
            });

            if self.options.auto_parse {
                self.parser.submit(stream, Priority::Default);
            }
        }

        if was_empty && !self.playlist.is_empty() {
            match self.go_to(Some(0)) {
                Ok(()) if self.options.auto_play => {
                    if let Err(e) = self.play() {
                        warn!("auto-play failed: {e}");
                    }
                }
                Ok(()) => {}
                Err(e) => warn!("could not load first stream: {e}"),
            }
        }

        if vetoed {
            return Err(Error::BlockedByHook("insert"));
        }
        Ok(())
    }

    pub fn remove(&mut self, pos: usize) -> Result<()> {
        let stream = self
            .playlist
            .nth(pos)
            .cloned()
            .ok_or(Error::NoSuchItem(pos))?;

        if self.intercept(&HookEvent::Remove {
            stream: Rc::clone(&stream),
            pos,
        })? {
            return Ok(());
        }

        for queue_pos in self.queue.purge(&stream) {
            self.emit(Notification::Dequeue {
                stream: Rc::clone(&stream),
                queue_pos,
            });
        }

        if self.playlist.current() == Some(pos) {
            match self.get_next() {
                Some(next) if next != pos => {
                    if let Err(e) = self.go_to(Some(next)) {
                        debug!("moving off removed stream: {e}");
                    }
                }
                _ => {
                    if let Err(e) = self.request_state(PlayerState::Stop) {
                        debug!("stop before remove: {e}");
                    }
                    self.unload();
                }
            }
        }

        self.playlist.remove(pos)?;
        // The removed stream may still be the one loaded if moving away
        // failed or was taken over by a hook.
        if self.playlist.current().is_none() && self.backend.is_some() {
            self.unload();
        }

        self.emit(Notification::Remove { stream, pos });
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.playlist.is_empty() {
            return Ok(());
        }
        if self.intercept(&HookEvent::Clear)? {
            return Ok(());
        }

        if let Err(e) = self.go_to(None) {
            debug!("clear: {e}");
        }
        if self.backend.is_some() {
            self.unload();
        }

        self.playlist.clear();
        self.queue.clear();
        self.parser.clear();
        self.emit(Notification::Clear);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Queue
    // ---------------------------------------------------------------------

    /// Queue the stream at playlist index `pos`. Returns its queue index.
    pub fn queue(&mut self, pos: usize) -> Result<usize> {
        let stream = self
            .playlist
            .nth(pos)
            .cloned()
            .ok_or(Error::NoSuchItem(pos))?;
        let queue_pos = self.queue.len();

        let event = HookEvent::Queue {
            stream: Rc::clone(&stream),
            pos,
            queue_pos,
        };
        match self.hooks.run(&event) {
            HookOutcome::Continue => {}
            HookOutcome::Blocked => return Err(Error::BlockedByHook(event.kind())),
            HookOutcome::Handled => return Ok(queue_pos),
            HookOutcome::HandledWith(i) => return Ok(i),
        }

        let queue_pos = self.queue.push(Rc::clone(&stream));
        self.emit(Notification::Queue {
            stream,
            pos,
            queue_pos,
        });
        Ok(queue_pos)
    }

    pub fn dequeue(&mut self, queue_pos: usize) -> Result<()> {
        let stream = self
            .queue
            .get(queue_pos)
            .cloned()
            .ok_or(Error::NoSuchItem(queue_pos))?;

        if self.intercept(&HookEvent::Dequeue {
            stream: Rc::clone(&stream),
            queue_pos,
        })? {
            return Ok(());
        }

        self.queue.remove(queue_pos);
        self.emit(Notification::Dequeue { stream, queue_pos });
        Ok(())
    }

    pub fn queue_clear(&mut self) -> Result<()> {
        if self.intercept(&HookEvent::QueueClear)? {
            return Ok(());
        }
        self.queue.clear();
        self.emit(Notification::QueueClear);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Modes
    // ---------------------------------------------------------------------

    pub fn set_repeat(&mut self, repeat: bool) -> Result<()> {
        if self.intercept(&HookEvent::Repeat(repeat))? {
            return Ok(());
        }
        self.playlist.set_repeat(repeat);
        self.emit(Notification::Repeat(repeat));
        Ok(())
    }

    pub fn set_random(&mut self, random: bool) -> Result<()> {
        if self.intercept(&HookEvent::Random(random))? {
            return Ok(());
        }
        self.playlist.set_random(random);
        self.emit(Notification::Random(random));
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Event loop
    // ---------------------------------------------------------------------

    /// Handle everything already waiting, then one round of idle work.
    /// Returns whether anything happened.
    pub fn dispatch(&mut self) -> bool {
        let mut progressed = false;

        while let Ok(msg) = self.rx.try_recv() {
            self.handle_incoming(msg);
            progressed = true;
        }

        if self.parser.has_idle_work() {
            let events = self.parser.run_idle();
            self.forward_parser_events(events);
            progressed = true;
        }

        progressed
    }

    /// Wait up to `wait` for the first message, then dispatch.
    pub fn iterate(&mut self, wait: Duration) -> bool {
        let mut progressed = false;

        if !self.parser.has_idle_work() {
            match self.rx.recv_timeout(wait) {
                Ok(msg) => {
                    self.handle_incoming(msg);
                    progressed = true;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
            }
        }

        self.dispatch() || progressed
    }

    fn handle_incoming(&mut self, msg: Incoming) {
        match msg {
            Incoming::Backend { generation, event } => {
                if generation != self.generation || self.backend.is_none() {
                    trace!(generation, current = self.generation, "stale backend event");
                    return;
                }
                self.handle_backend_event(event);
            }
            Incoming::Probe { generation, event } => {
                let events = self.parser.handle_probe_event(generation, event);
                self.forward_parser_events(events);
            }
        }
    }

    fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Error(message) => {
                let stream = self.current_stream();
                let hook = HookEvent::Error {
                    stream: stream.clone(),
                    message: message.clone(),
                };
                if self.hooks.run(&hook).is_intercepted() {
                    return;
                }

                warn!(uri = stream.as_ref().map(|s| s.uri()), "playback error: {message}");
                if let Some(s) = &stream {
                    s.set_failed(true);
                }
                self.emit(Notification::Error { stream, message });
            }

            BackendEvent::Eos => {
                if self.hooks.run(&HookEvent::Eos).is_intercepted() {
                    return;
                }
                let position = self.tell(SeekFormat::Time).unwrap_or(0);
                let length = self.length(SeekFormat::Time).unwrap_or(-1);
                self.emit(Notification::Eos { position, length });
            }

            BackendEvent::Tag { name, value } => {
                let Some(stream) = self.current_stream() else {
                    return;
                };
                stream.set_tag(&name, Some(value));

                let hook = HookEvent::Tag {
                    stream: Rc::clone(&stream),
                    tag: name.clone(),
                };
                if self.hooks.run(&hook).is_intercepted() {
                    return;
                }
                self.emit(Notification::Tag { stream, tag: name });
            }

            BackendEvent::StateChanged { old, new, pending } => {
                if pending.is_some() {
                    return;
                }
                if new == BackendState::Paused
                    && self.tell(SeekFormat::Time).unwrap_or(0) <= PREROLL_PAUSE_WINDOW
                {
                    trace!(?old, "ignoring preroll pause");
                    return;
                }

                if self
                    .hooks
                    .run(&HookEvent::StateChanged(new.to_player()))
                    .is_intercepted()
                {
                    return;
                }
                self.reconcile();
            }
        }
    }

    fn forward_parser_events(&mut self, events: Vec<ParserEvent>) {
        for event in events {
            match event {
                ParserEvent::Tag(stream, tag) => {
                    let hook = HookEvent::Tag {
                        stream: Rc::clone(&stream),
                        tag: tag.clone(),
                    };
                    if !self.hooks.run(&hook).is_intercepted() {
                        self.emit(Notification::Tag { stream, tag });
                    }
                }
                ParserEvent::AllTags(stream) => {
                    let hook = HookEvent::AllTags {
                        stream: Rc::clone(&stream),
                    };
                    if !self.hooks.run(&hook).is_intercepted() {
                        self.emit(Notification::AllTags { stream });
                    }
                }
            }
        }
    }
}

/// Mute natively when the backend can, otherwise by zeroing its volume.
/// Returns true when emulated.
fn apply_mute(backend: &mut dyn Backend, mute: bool, volume: u8) -> Result<bool> {
    match backend.set_mute(mute) {
        Ok(()) => Ok(false),
        Err(Error::MissingCapability(_)) => {
            backend.set_volume(if mute { 0 } else { volume })?;
            Ok(mute)
        }
        Err(e) => Err(e),
    }
}

/// A player shared with hooks and collaborators.
///
/// Calls made while another call on the same player is still running (for
/// example from inside a hook) fail with [`Error::Reentrant`] instead of
/// panicking.
#[derive(Clone)]
pub struct SharedPlayer(Rc<RefCell<Player>>);

impl SharedPlayer {
    pub fn new(player: Player) -> Self {
        Self(Rc::new(RefCell::new(player)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Player) -> Result<R>) -> Result<R> {
        let mut player = self.0.try_borrow_mut().map_err(|_| Error::Reentrant)?;
        f(&mut player)
    }

    pub fn downgrade(&self) -> WeakPlayer {
        WeakPlayer(Rc::downgrade(&self.0))
    }
}

/// Non-owning handle, for hooks that call back into their player.
#[derive(Clone)]
pub struct WeakPlayer(Weak<RefCell<Player>>);

impl WeakPlayer {
    pub fn upgrade(&self) -> Option<SharedPlayer> {
        self.0.upgrade().map(SharedPlayer)
    }
}
