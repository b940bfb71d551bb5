//! Repeating record cache.
//!
//! This crate reads a small window of records once from a sequential record
//! store and replays it cyclically to any number of concurrent consumer
//! streams, without touching the store again:
//!
//! - `record`: on-disk schema of a record store (frames, header, records)
//! - `store`: sequential store adapters (framed file, in-memory)
//! - `selection`: keep/drop rules applied to field names
//! - `field_index`, `cache`, `reader`: the shared read-only cache and the
//!   per-stream lazy field resolution on top of it
//! - `hierarchy`: container/run/lumi/record state machine
//! - `source`: the repeating source tying it all together
//!
//! The `repeat_cache` binary drives a source with several worker streams;
//! `inspect` dumps and checks a store file.
pub mod cache;
pub mod config;
pub mod error;
pub mod field_index;
pub mod hierarchy;
pub mod reader;
pub mod record;
pub mod selection;
pub mod source;
pub mod store;

pub use config::SourceConfig;
pub use error::{Error, Result};
pub use source::{RecordSource, RepeatingSource};
