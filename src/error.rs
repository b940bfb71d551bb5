use std::path::PathBuf;

use thiserror::Error;

use crate::record::FieldId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open record store {path:?}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("end of record store")]
    EndOfStore,

    #[error("record store holds only {available} records, {requested} requested for the cache")]
    CacheUnderfilled { requested: usize, available: usize },

    #[error(
        "cached records span more than one run/lumi: \
         slot {slot} is {found_run}:{found_lumi}, expected {expected_run}:{expected_lumi}"
    )]
    InconsistentRunOrLumi {
        slot: usize,
        expected_run: u32,
        expected_lumi: u32,
        found_run: u32,
        found_lumi: u32,
    },

    #[error("unknown field id {0}")]
    UnknownField(FieldId),

    #[error("stream {stream} out of range ({streams} streams configured)")]
    UnknownStream { stream: usize, streams: usize },

    #[error("CRC mismatch at frame {frame}: file={stored:#x}, calc={computed:#x}")]
    CorruptFrame { frame: u64, stored: u32, computed: u32 },

    #[error("frame {frame} is truncated")]
    TruncatedFrame { frame: u64 },

    #[error("record store does not start with a header frame")]
    MissingHeader,

    #[error("unsupported record store version: {0}")]
    UnsupportedVersion(u16),

    #[error("frame decode error: {0}")]
    Decode(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid field selection rule: {0:?} (expected `keep <glob>` or `drop <glob>`)")]
    InvalidSelectionRule(String),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
