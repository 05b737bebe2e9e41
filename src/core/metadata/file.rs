//! core/metadata/file.rs
//! Prober for local files: Symphonia for the container, `id3` for frames.
//!
//! Each probe runs on its own short-lived thread so a slow disk never stalls
//! the player. Results travel back as `ProbeEvent`s.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;

use tracing::debug;

use super::super::error::{Error, Result};
use super::super::playback::BackendState;
use super::super::stream::uri_to_path;
use super::super::tags::read_id3_tags;
use super::container::probe_container;
use super::probe::{ProbeEvent, ProbeHandle, ProbeSink, Prober};

#[derive(Debug, Default, Clone, Copy)]
pub struct FileProber;

impl Prober for FileProber {
    fn probe(&self, uri: &str, sink: ProbeSink) -> Result<Box<dyn ProbeHandle>> {
        let path =
            uri_to_path(uri).ok_or_else(|| Error::Probe(format!("Not a local file: {uri}")))?;

        let handle = FileProbe {
            duration: Arc::new(AtomicI64::new(-1)),
            cancelled: Arc::new(AtomicBool::new(false)),
        };

        let duration = Arc::clone(&handle.duration);
        let cancelled = Arc::clone(&handle.cancelled);
        thread::Builder::new()
            .name("sonora-probe".into())
            .spawn(move || run_probe(path, sink, duration, cancelled))?;

        Ok(Box::new(handle))
    }
}

struct FileProbe {
    duration: Arc<AtomicI64>,
    cancelled: Arc<AtomicBool>,
}

impl ProbeHandle for FileProbe {
    fn duration(&self) -> Option<i64> {
        let d = self.duration.load(Ordering::Acquire);
        (d >= 0).then_some(d)
    }
}

impl Drop for FileProbe {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Sends `ProbeEvent::Error` if the probe thread unwinds, so the parser is
/// never left waiting on a dead probe.
struct ReportOnPanic<'a>(&'a ProbeSink);

impl Drop for ReportOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.send(ProbeEvent::Error("probe thread panicked".into()));
        }
    }
}

fn run_probe(path: PathBuf, sink: ProbeSink, duration: Arc<AtomicI64>, cancelled: Arc<AtomicBool>) {
    let _guard = ReportOnPanic(&sink);

    let info = match probe_container(&path) {
        Ok(info) => info,
        Err(msg) => {
            debug!(path = %path.display(), "probe failed: {msg}");
            sink.send(ProbeEvent::Error(msg));
            return;
        }
    };

    if let Some(d) = info.duration {
        duration.store(d, Ordering::Release);
    }

    let frames = read_id3_tags(&path);
    for (name, value) in info.tags.into_iter().chain(frames) {
        if cancelled.load(Ordering::Acquire) {
            return;
        }
        sink.send(ProbeEvent::Tag {
            name: name.to_owned(),
            value,
        });
    }

    sink.send(ProbeEvent::StateChanged {
        old: BackendState::Ready,
        new: BackendState::Paused,
    });
    sink.send(ProbeEvent::NewClock);
}
