//! core/tags/mod.rs
//!
//! ID3 tag reading for the metadata prober.
//! Public API:
//! - [`read_id3_tags`] reads a file's ID3 frames as engine tag pairs
//!   (non-fatal on tag read failure: unreadable means empty).

mod art;
mod read;
pub(crate) mod util;

pub use read::read_id3_tags;
