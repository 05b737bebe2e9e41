//! sonora-engine
//!
//! Playlist, queue and playback state machine for a desktop music player,
//! with hookable operations and background metadata extraction.
//!
//! ```no_run
//! use sonora_engine::{FileProber, Player, PlayerOptions, RodioFactory};
//!
//! let mut player = Player::new(
//!     Box::new(RodioFactory),
//!     Box::new(FileProber),
//!     PlayerOptions::default(),
//! );
//! let events = player.subscribe();
//! player.insert_uri("file:///music/intro.mp3", None)?;
//! player.play()?;
//! while player.iterate(std::time::Duration::from_millis(200)) {
//!     for n in events.try_iter() {
//!         println!("{}", n.name());
//!     }
//! }
//! # Ok::<(), sonora_engine::Error>(())
//! ```

pub mod config;
pub mod core;

pub use crate::core::*;
