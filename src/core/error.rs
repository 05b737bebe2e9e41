//! core/error.rs
//! Error types for the playback engine.
//!
//! Validation failures are returned to the caller right away and leave the
//! engine untouched. Faults that show up after a backend already accepted a
//! transition never come back through here: they arrive as an `Error`
//! notification instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad argument (out of range value, unknown state, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Playlist or queue index out of range
    #[error("No such item at index {0}")]
    NoSuchItem(usize),

    /// The backend lacks a required operation
    #[error("Missing capability: {0}")]
    MissingCapability(&'static str),

    /// Operation needs a loaded stream and there is none
    #[error("No stream loaded")]
    NoStream,

    /// Backend could not be created or refused a transition
    #[error("Backend error: {0}")]
    Backend(String),

    /// A hook vetoed the action
    #[error("Action blocked by hook: {0}")]
    BlockedByHook(&'static str),

    /// Mutating call issued while another one is still running
    #[error("Another player operation is already in progress")]
    Reentrant,

    /// URI rejected by `Stream::new`
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Metadata probe could not be started
    #[error("Probe error: {0}")]
    Probe(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
