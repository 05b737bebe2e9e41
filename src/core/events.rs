//! core/events.rs
//! What the player tells the outside world.
//!
//! Collaborators call `Player::subscribe()` and get a `Receiver<Notification>`.
//! Every notification is cloned to every live subscriber; a dropped receiver
//! is pruned on the next send.

use std::sync::mpsc::{self, Receiver, Sender};

use super::stream::StreamRef;

#[derive(Debug, Clone)]
pub enum Notification {
    /// Positions are nanoseconds at the moment of the transition
    Play { position: i64 },
    Pause { position: i64 },
    Stop { position: i64 },
    Seek { from: i64, to: i64 },
    Volume(u8),
    Mute(bool),
    Insert { stream: StreamRef, pos: usize },
    Remove { stream: StreamRef, pos: usize },
    Queue { stream: StreamRef, pos: usize, queue_pos: usize },
    Dequeue { stream: StreamRef, queue_pos: usize },
    QueueClear,
    /// Sent before the cursor moves; position/length describe the outgoing stream
    PreChange {
        from: Option<usize>,
        to: Option<usize>,
        position: i64,
        length: i64,
    },
    Change { from: Option<usize>, to: Option<usize> },
    Clear,
    Repeat(bool),
    Random(bool),
    Eos { position: i64, length: i64 },
    Error { stream: Option<StreamRef>, message: String },
    Tag { stream: StreamRef, tag: String },
    AllTags { stream: StreamRef },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Play { .. } => "play",
            Notification::Pause { .. } => "pause",
            Notification::Stop { .. } => "stop",
            Notification::Seek { .. } => "seek",
            Notification::Volume(_) => "volume",
            Notification::Mute(_) => "mute",
            Notification::Insert { .. } => "insert",
            Notification::Remove { .. } => "remove",
            Notification::Queue { .. } => "queue",
            Notification::Dequeue { .. } => "dequeue",
            Notification::QueueClear => "queue-clear",
            Notification::PreChange { .. } => "pre-change",
            Notification::Change { .. } => "change",
            Notification::Clear => "clear",
            Notification::Repeat(_) => "repeat",
            Notification::Random(_) => "random",
            Notification::Eos { .. } => "eos",
            Notification::Error { .. } => "error",
            Notification::Tag { .. } => "tag",
            Notification::AllTags { .. } => "all-tags",
        }
    }
}

#[derive(Default)]
pub(crate) struct Notifier {
    subscribers: Vec<Sender<Notification>>,
}

impl Notifier {
    pub(crate) fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, n: Notification) {
        tracing::trace!(notification = n.name(), "emit");
        self.subscribers.retain(|tx| tx.send(n.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_out_and_prunes_dropped_receivers() {
        let mut n = Notifier::default();
        let a = n.subscribe();
        let b = n.subscribe();

        n.emit(Notification::Clear);
        assert!(matches!(a.try_recv(), Ok(Notification::Clear)));
        assert!(matches!(b.try_recv(), Ok(Notification::Clear)));

        drop(b);
        n.emit(Notification::Repeat(true));
        assert_eq!(n.subscriber_count(), 1);
        assert!(matches!(a.try_recv(), Ok(Notification::Repeat(true))));
    }
}
