//! Turns extracted page text into speakable chunks with voice assignment and
//! plays them back one at a time against a speech synthesis backend.
//!
//! Data flows one way:
//! - `source` yields positioned text items per page.
//! - `layout` rebuilds paragraph breaks from vertical position jumps.
//! - `chunker` splits page text into bounded chunks on sentence boundaries.
//! - `classify` flags dialogue and extracts the speaker.
//! - `playback` walks the chunk sequence and asks `voices` which voice to use.
//! - `reader` executes the controller's effects against a `backend`.

pub mod backend;
pub mod cancellation;
pub mod chunker;
pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod keep_alive;
pub mod layout;
pub mod playback;
pub mod reader;
pub mod source;
pub mod voices;

pub use error::{ReaderError, Result};
