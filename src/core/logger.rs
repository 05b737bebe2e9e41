//! core/logger.rs
//! Debug log of everything the player announces.

use std::sync::mpsc::Receiver;

use tracing::debug;

use super::events::Notification;
use super::playback::Player;
use super::types::format_clock;

pub struct EventLogger {
    rx: Receiver<Notification>,
}

impl EventLogger {
    pub fn watch(player: &mut Player) -> Self {
        Self {
            rx: player.subscribe(),
        }
    }

    /// Log everything received so far. Returns how many were logged.
    pub fn flush(&mut self) -> usize {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            debug!(target: "sonora::events", event = event.name(), "{}", describe(&event));
            n += 1;
        }
        n
    }
}

fn describe(n: &Notification) -> String {
    match n {
        Notification::Play { position }
        | Notification::Pause { position }
        | Notification::Stop { position } => format!("at {}", format_clock(*position)),
        Notification::Seek { from, to } => {
            format!("{} -> {}", format_clock(*from), format_clock(*to))
        }
        Notification::Volume(v) => format!("volume {v}"),
        Notification::Mute(m) => format!("mute {m}"),
        Notification::Insert { stream, pos } | Notification::Remove { stream, pos } => {
            format!("{} @ {pos}", stream.uri())
        }
        Notification::Queue {
            stream,
            pos,
            queue_pos,
        } => format!("{} @ {pos} (queue {queue_pos})", stream.uri()),
        Notification::Dequeue { stream, queue_pos } => {
            format!("{} (queue {queue_pos})", stream.uri())
        }
        Notification::PreChange { from, to, .. } | Notification::Change { from, to } => {
            format!("{from:?} -> {to:?}")
        }
        Notification::Repeat(v) | Notification::Random(v) => v.to_string(),
        Notification::Eos { position, length } => {
            format!("{} / {}", format_clock(*position), format_clock(*length))
        }
        Notification::Error { stream, message } => match stream {
            Some(s) => format!("{}: {message}", s.uri()),
            None => message.clone(),
        },
        Notification::Tag { stream, tag } => {
            let value = stream.tag_text(tag).unwrap_or_default();
            format!("{} {tag}={value}", stream.uri())
        }
        Notification::AllTags { stream } => stream.uri().to_owned(),
        Notification::QueueClear | Notification::Clear => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::ScriptedProber;
    use crate::core::playback::{NullFactory, PlayerOptions};

    #[test]
    fn flush_drains_everything() {
        let mut p = Player::new(
            Box::new(NullFactory::new()),
            Box::new(ScriptedProber::new()),
            PlayerOptions::default(),
        );
        let mut log = EventLogger::watch(&mut p);

        p.insert_uri("file:///a.mp3", None).unwrap();
        assert_eq!(log.flush(), 3);
        assert_eq!(log.flush(), 0);
    }

    #[test]
    fn describes_positions_as_clock() {
        let n = Notification::Seek {
            from: 0,
            to: 65 * crate::core::types::NANOS_PER_SEC,
        };
        assert_eq!(describe(&n), "0:00 -> 1:05");
    }
}
