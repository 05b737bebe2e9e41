//! core/stats.rs
//! Played-time bookkeeping for the current stream.
//!
//! `PlayStats` listens to the player's notifications and counts how long the
//! current stream has actually been heard (seeks and pauses excluded). A
//! stream counts as "submitted" once it has played for at least 30 seconds
//! and at least half its length, checked when it ends or is switched away
//! from. Dropping the watcher unsubscribes it.

use std::sync::mpsc::Receiver;

use tracing::debug;

use super::events::Notification;
use super::playback::Player;
use super::types::NANOS_PER_SEC;

const SUBMIT_MIN_PLAYED: i64 = 30 * NANOS_PER_SEC;

pub struct PlayStats {
    rx: Receiver<Notification>,
    played: i64,
    check_point: i64,
    submitted: bool,
    submissions: usize,
}

impl PlayStats {
    pub fn watch(player: &mut Player) -> Self {
        Self {
            rx: player.subscribe(),
            played: 0,
            check_point: 0,
            submitted: false,
            submissions: 0,
        }
    }

    /// Consume pending notifications. Returns true if the current stream
    /// became submitted during this call.
    pub fn update(&mut self) -> bool {
        let before = self.submissions;
        while let Ok(n) = self.rx.try_recv() {
            self.apply(&n);
        }
        self.submissions != before
    }

    /// Nanoseconds heard of the current stream.
    pub fn played(&self) -> i64 {
        self.played
    }

    pub fn submitted(&self) -> bool {
        self.submitted
    }

    /// Streams submitted since the watcher was created.
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    fn apply(&mut self, n: &Notification) {
        match *n {
            Notification::Play { position } => self.set_check_point(position, false),
            Notification::Pause { position } | Notification::Stop { position } => {
                self.set_check_point(position, true)
            }
            Notification::Seek { from, to } => {
                self.set_check_point(from, true);
                self.set_check_point(to, false);
            }
            Notification::PreChange {
                position, length, ..
            }
            | Notification::Eos { position, length } => {
                self.set_check_point(position, true);
                self.evaluate(length);
            }
            Notification::Change { .. } => self.reset(),
            _ => {}
        }
    }

    fn set_check_point(&mut self, position: i64, add: bool) {
        // Positions reported after teardown read as 0; never count backwards.
        if add && position > self.check_point {
            self.played += position - self.check_point;
        }
        self.check_point = position;
    }

    fn evaluate(&mut self, length: i64) {
        if self.submitted {
            return;
        }
        if self.played >= SUBMIT_MIN_PLAYED && self.played >= length / 2 {
            debug!(played_ns = self.played, length_ns = length, "stream submitted");
            self.submitted = true;
            self.submissions += 1;
        } else {
            debug!(played_ns = self.played, "not enough played to submit");
        }
    }

    fn reset(&mut self) {
        self.played = 0;
        self.check_point = 0;
        self.submitted = false;
    }
}
