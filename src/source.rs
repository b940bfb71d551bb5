//! The repeating source.
//!
//! On construction the source skips `skip_records` records, reads the next
//! `repeat_count` records into a [`RecordCache`] and lets go of the store.
//! From then on it replays the cached records cyclically to any number of
//! concurrent streams: the `i`-th record delivered overall (counting from 0)
//! is cache slot `i % repeat_count`, whichever stream asked for it.
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{Payload, RecordCache};
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::field_index::FieldIndex;
use crate::hierarchy::{Containment, ItemKind};
use crate::reader::{RecordView, StreamReader};
use crate::record::FieldId;
use crate::store::{FileStore, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunGroup {
    pub run: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumiGroup {
    pub run: u32,
    pub lumi: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId {
    pub run: u32,
    pub lumi: u32,
    pub event: u64,
}

/// A forward-only source of records organised as container, run group, lumi
/// group and records.
pub trait RecordSource: Sync {
    fn next_item_kind(&self, stream: usize) -> ItemKind;

    fn read_run_group(&self) -> RunGroup;

    fn read_lumi_group(&self) -> LumiGroup;

    fn read_record(&self, stream: usize) -> Result<RecordView<'_>>;

    /// Position the source on `id`; `false` if the source cannot seek.
    fn seek_to_record(&self, id: RecordId) -> bool;

    /// Skip `offset` records after construction.
    fn skip(&self, offset: i64);
}

#[derive(Debug)]
pub struct RepeatingSource {
    index: FieldIndex,
    cache: RecordCache,
    readers: Vec<StreamReader>,
    containment: Mutex<Containment>,
    cursor: AtomicU64,
}

impl RepeatingSource {
    /// Open the store named by `config`, fill the cache and close the store.
    pub fn open(config: &SourceConfig) -> Result<Self> {
        let rules = config.validate()?;
        let mut store = FileStore::open(&config.source_path, &rules)?;
        info!("Opened {:?} for repeating", store.path());
        Self::from_store(&mut store, config)
    }

    /// Build a source from an already opened store. Field selection is the
    /// store's business; `config.source_path` and `config.field_rules` are not
    /// consulted here.
    pub fn from_store<S>(store: &mut S, config: &SourceConfig) -> Result<Self>
    where
        S: RecordStore + ?Sized,
    {
        if config.repeat_count == 0 {
            return Err(Error::InvalidConfig("repeat_count must be at least 1".into()));
        }
        if config.streams == 0 {
            return Err(Error::InvalidConfig("streams must be at least 1".into()));
        }

        let index = FieldIndex::build(store.schema());

        let wanted = u64::from(config.skip_records);
        if wanted > 0 {
            let skipped = store.skip(wanted)?;
            if skipped < wanted {
                warn!("Store ended after skipping {} of {} records", skipped, wanted);
            } else {
                info!("Skipped {} records", skipped);
            }
        }

        let cache = RecordCache::populate(store, &index, config.repeat_count as usize)?;
        let readers = (0..config.streams).map(StreamReader::new).collect();

        Ok(Self {
            index,
            cache,
            readers,
            containment: Mutex::new(Containment::new()),
            cursor: AtomicU64::new(0),
        })
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn field_index(&self) -> &FieldIndex {
        &self.index
    }

    pub fn streams(&self) -> usize {
        self.readers.len()
    }

    /// Number of records delivered so far across all streams.
    pub fn delivered(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    fn reader(&self, stream: usize) -> Result<&StreamReader> {
        self.readers.get(stream).ok_or(Error::UnknownStream { stream, streams: self.readers.len() })
    }

    /// Resolve `id` in the record currently assigned to `stream`.
    pub fn get_field(&self, stream: usize, id: FieldId) -> Result<Option<Payload>> {
        self.reader(stream)?.get_field(&self.index, &self.cache, id)
    }
}

impl RecordSource for RepeatingSource {
    fn next_item_kind(&self, _stream: usize) -> ItemKind {
        self.containment.lock().next()
    }

    fn read_run_group(&self) -> RunGroup {
        let meta = self.cache.slot(0).metadata();
        RunGroup { run: meta.run }
    }

    fn read_lumi_group(&self) -> LumiGroup {
        let meta = self.cache.slot(0).metadata();
        LumiGroup { run: meta.run, lumi: meta.lumi }
    }

    fn read_record(&self, stream: usize) -> Result<RecordView<'_>> {
        let reader = self.reader(stream)?;
        let logical_index = self.cursor.fetch_add(1, Ordering::Relaxed);
        let slot = (logical_index % self.cache.len() as u64) as usize;
        reader.assign(slot);
        Ok(RecordView {
            metadata: self.cache.slot(slot).metadata(),
            logical_index,
            slot,
            reader,
            index: &self.index,
            cache: &self.cache,
        })
    }

    fn seek_to_record(&self, id: RecordId) -> bool {
        debug!("Ignoring seek to {:?}: repeating source is forward only", id);
        false
    }

    fn skip(&self, offset: i64) {
        debug!("Ignoring skip of {} records after the cache is built", offset);
    }
}
