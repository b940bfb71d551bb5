//! Read-once record cache.
//!
//! The cache is filled by reading a fixed number of records from a
//! [`RecordStore`] and pulling every selected field eagerly, since the store
//! cannot seek back to a record once its cursor has moved on. After that it
//! is never mutated, so slots are handed out by shared reference and field
//! payloads are shared through `Arc` rather than copied.
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::field_index::FieldIndex;
use crate::record::RecordMetadata;
use crate::store::RecordStore;

/// Opaque field payload shared between the cache and its readers.
pub type Payload = Arc<[u8]>;

#[derive(Debug, Clone)]
pub struct CacheSlot {
    metadata: RecordMetadata,
    fields: Vec<Option<Payload>>, // indexed by FieldIndex slot; None if the record lacked the field
}

impl CacheSlot {
    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    pub fn field(&self, slot: usize) -> Option<&Payload> {
        self.fields.get(slot).and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone)]
pub struct RecordCache {
    slots: Vec<CacheSlot>,
}

impl RecordCache {
    /// Read exactly `cache_size` records from `store`, then rewind it.
    ///
    /// Fails with [`Error::CacheUnderfilled`] if the store runs out first and
    /// with [`Error::InconsistentRunOrLumi`] if any record's run or lumi
    /// differs from the first record's.
    pub fn populate<S>(store: &mut S, index: &FieldIndex, cache_size: usize) -> Result<Self>
    where
        S: RecordStore + ?Sized,
    {
        if cache_size == 0 {
            return Err(Error::InvalidConfig("cache size must be at least 1".into()));
        }
        let mut slots: Vec<CacheSlot> = Vec::with_capacity(cache_size);
        for slot in 0..cache_size {
            let rec = match store.read_next() {
                Ok(rec) => rec,
                Err(Error::EndOfStore) => {
                    return Err(Error::CacheUnderfilled { requested: cache_size, available: slot });
                }
                Err(e) => return Err(e),
            };
            if let Some(first) = slots.first().map(CacheSlot::metadata) {
                if first.run != rec.metadata.run || first.lumi != rec.metadata.lumi {
                    return Err(Error::InconsistentRunOrLumi {
                        slot,
                        expected_run: first.run,
                        expected_lumi: first.lumi,
                        found_run: rec.metadata.run,
                        found_lumi: rec.metadata.lumi,
                    });
                }
            }
            let mut fields = vec![None; index.len()];
            for field in rec.fields {
                // fields outside the record scope have no slot
                if let Ok(i) = index.resolve(field.id) {
                    fields[i] = Some(Payload::from(field.bytes));
                }
            }
            slots.push(CacheSlot { metadata: rec.metadata, fields });
        }
        store.rewind()?;

        let first = slots[0].metadata();
        info!(
            "Cached {} records with {} fields each (run {}, lumi {})",
            slots.len(),
            index.len(),
            first.run,
            first.lumi
        );
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&CacheSlot> {
        self.slots.get(i)
    }

    /// Callers guarantee `i < len()`; the cache is never empty.
    pub(crate) fn slot(&self, i: usize) -> &CacheSlot {
        &self.slots[i]
    }

    pub fn slots(&self) -> &[CacheSlot] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldDescriptor, FieldId, FieldScope, StoredField, StoredRecord};
    use crate::store::MemoryStore;

    fn schema() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor { id: FieldId(10), name: "a".into(), scope: FieldScope::Record },
            FieldDescriptor { id: FieldId(20), name: "b".into(), scope: FieldScope::Record },
            FieldDescriptor {
                id: FieldId(30),
                name: "lumiSummary".into(),
                scope: FieldScope::LumiGroup,
            },
        ]
    }

    fn rec(run: u32, lumi: u32, event: u64) -> StoredRecord {
        StoredRecord {
            metadata: RecordMetadata {
                run,
                lumi,
                event,
                selection_ids: vec![event],
                ..Default::default()
            },
            fields: vec![
                StoredField { id: FieldId(10), bytes: event.to_le_bytes().to_vec() },
                StoredField { id: FieldId(30), bytes: vec![1] },
            ],
        }
    }

    #[test]
    fn populates_in_order_and_rewinds() {
        let mut store = MemoryStore::new(schema(), (0..6).map(|e| rec(1, 2, e)).collect());
        let index = FieldIndex::build(store.schema());
        let cache = RecordCache::populate(&mut store, &index, 4).unwrap();
        assert_eq!(cache.len(), 4);
        assert_eq!(store.reads(), 4);
        assert_eq!(store.rewinds(), 1);
        for (i, slot) in cache.slots().iter().enumerate() {
            assert_eq!(slot.metadata().event, i as u64);
            assert_eq!(slot.metadata().selection_ids, vec![i as u64]);
            assert_eq!(&slot.field(0).unwrap()[..], &(i as u64).to_le_bytes());
            assert!(slot.field(1).is_none(), "field b is absent from every record");
        }
    }

    #[test]
    fn get_is_bounded() {
        let mut store = MemoryStore::new(schema(), (0..3).map(|e| rec(1, 2, e)).collect());
        let index = FieldIndex::build(store.schema());
        let cache = RecordCache::populate(&mut store, &index, 3).unwrap();
        assert_eq!(cache.get(2).map(|s| s.metadata().event), Some(2));
        assert!(cache.get(3).is_none());
    }

    #[test]
    fn too_few_records_is_underfilled() {
        let mut store = MemoryStore::new(schema(), (0..3).map(|e| rec(1, 1, e)).collect());
        let index = FieldIndex::build(store.schema());
        let err = RecordCache::populate(&mut store, &index, 5).unwrap_err();
        assert!(matches!(err, Error::CacheUnderfilled { requested: 5, available: 3 }));
    }

    #[test]
    fn mixed_runs_are_rejected() {
        let mut store = MemoryStore::new(schema(), vec![rec(1, 1, 0), rec(1, 1, 1), rec(2, 1, 2)]);
        let index = FieldIndex::build(store.schema());
        let err = RecordCache::populate(&mut store, &index, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentRunOrLumi { slot: 2, expected_run: 1, found_run: 2, .. }
        ));
    }

    #[test]
    fn mixed_lumis_are_rejected() {
        let mut store = MemoryStore::new(schema(), vec![rec(5, 1, 0), rec(5, 2, 1)]);
        let index = FieldIndex::build(store.schema());
        let err = RecordCache::populate(&mut store, &index, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentRunOrLumi { slot: 1, expected_lumi: 1, found_lumi: 2, .. }
        ));
    }

    #[test]
    fn mismatch_beyond_window_is_ignored() {
        let mut store = MemoryStore::new(schema(), vec![rec(1, 1, 0), rec(1, 1, 1), rec(9, 9, 2)]);
        let index = FieldIndex::build(store.schema());
        assert_eq!(RecordCache::populate(&mut store, &index, 2).unwrap().len(), 2);
    }

    #[test]
    fn zero_size_is_invalid() {
        let mut store = MemoryStore::new(schema(), vec![rec(1, 1, 0)]);
        let index = FieldIndex::build(store.schema());
        let err = RecordCache::populate(&mut store, &index, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
