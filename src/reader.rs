//! Lazy field resolution for delivered records.
//!
//! Each consumer stream owns one [`StreamReader`] entry inside the source. The
//! source is the only writer of a stream's assigned slot and it writes it just
//! before handing that stream a record; the stream is the only reader. A
//! stream therefore has to resolve everything it needs from record `k` before
//! asking for record `k + 1`.
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::{Payload, RecordCache};
use crate::error::Result;
use crate::field_index::FieldIndex;
use crate::record::{FieldId, RecordMetadata};

/// Resolves fields of a delivered record on demand.
pub trait FieldGetter {
    /// `Ok(None)` when the field is known but absent from this record.
    fn get_field(&self, id: FieldId) -> Result<Option<Payload>>;
}

#[derive(Debug)]
pub struct StreamReader {
    stream: usize,
    assigned: AtomicUsize,
}

impl StreamReader {
    pub(crate) fn new(stream: usize) -> Self {
        Self { stream, assigned: AtomicUsize::new(0) }
    }

    pub fn stream(&self) -> usize {
        self.stream
    }

    pub fn assigned_slot(&self) -> usize {
        self.assigned.load(Ordering::Acquire)
    }

    pub(crate) fn assign(&self, slot: usize) {
        self.assigned.store(slot, Ordering::Release);
    }

    pub fn get_field(
        &self,
        index: &FieldIndex,
        cache: &RecordCache,
        id: FieldId,
    ) -> Result<Option<Payload>> {
        let field = index.resolve(id)?;
        Ok(cache.slot(self.assigned_slot()).field(field).cloned())
    }
}

/// A record handed to one stream. Metadata is fixed at delivery, fields go
/// through the stream's reader.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    pub(crate) metadata: &'a RecordMetadata,
    pub(crate) logical_index: u64,
    pub(crate) slot: usize,
    pub(crate) reader: &'a StreamReader,
    pub(crate) index: &'a FieldIndex,
    pub(crate) cache: &'a RecordCache,
}

impl<'a> RecordView<'a> {
    pub fn metadata(&self) -> &'a RecordMetadata {
        self.metadata
    }

    /// Position of this delivery in the source-wide sequence, starting at 0.
    pub fn logical_index(&self) -> u64 {
        self.logical_index
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn stream(&self) -> usize {
        self.reader.stream()
    }
}

impl FieldGetter for RecordView<'_> {
    fn get_field(&self, id: FieldId) -> Result<Option<Payload>> {
        self.reader.get_field(self.index, self.cache, id)
    }
}
