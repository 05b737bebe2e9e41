//! config.rs
//! Engine configuration.
//!
//! Lookup order for the file:
//!   1. `--config <FILE>` on the command line
//!   2. `SONORA_CONFIG` in the environment
//!   3. `<config dir>/sonora/engine.toml`
//!   4. built-in defaults
//!
//! (1) and (2) come in through clap, so this module only sees an optional
//! explicit path. An explicit path that does not exist is an error; a missing
//! default file is not. Individual CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::core::playback::PlayerOptions;

pub const DEFAULT_FORMAT: &str = "%a - %t";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 0..=100
    pub volume: u8,
    pub mute: bool,
    pub repeat: bool,
    pub random: bool,
    pub auto_parse: bool,
    pub auto_play: bool,
    /// Event loop wait per iteration
    pub tick_ms: u64,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log every player notification at debug level
    pub log_events: bool,
    /// Pattern for the now-playing line (`%a %b %t %g %n %d`)
    pub now_playing_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            volume: 50,
            mute: false,
            repeat: false,
            random: false,
            auto_parse: true,
            auto_play: true,
            tick_ms: 200,
            log_level: "info".into(),
            log_events: false,
            now_playing_format: DEFAULT_FORMAT.into(),
        }
    }
}

impl Config {
    /// `<config dir>/sonora/engine.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sonora").join("engine.toml"))
    }

    /// Load from `explicit` if given, else from the default path if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config = Self::parse(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.volume = config.volume.min(100);
        if config.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be greater than zero".into()));
        }
        Ok(config)
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            auto_parse: self.auto_parse,
            auto_play: self.auto_play,
            volume: self.volume,
            mute: self.mute,
            seed: None,
        }
    }
}
