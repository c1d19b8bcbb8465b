//! # slackwatch-store
//!
//! Persists the watermark map as pretty-printed JSON. Writes go to a sibling
//! `.tmp` file which is then renamed over the real one, so a reader sees
//! either the previous complete file or the new complete file.

#![deny(unsafe_code)]

pub mod file;

pub use file::FileStore;
