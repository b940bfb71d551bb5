use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::record::{FieldDescriptor, FieldId, FieldScope};

/// Dense slot numbers `0..len()` for every record-scoped field of a schema.
///
/// Immutable once built, so it can be read from any thread without locking.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    slots: BTreeMap<FieldId, usize>,
}

impl FieldIndex {
    /// Index the record-scoped fields of `schema` in schema order. A field id
    /// listed twice keeps its first slot.
    pub fn build(schema: &[FieldDescriptor]) -> Self {
        let mut slots = BTreeMap::new();
        for d in schema.iter().filter(|d| d.scope == FieldScope::Record) {
            let next = slots.len();
            slots.entry(d.id).or_insert(next);
        }
        Self { slots }
    }

    pub fn resolve(&self, id: FieldId) -> Result<usize> {
        self.slots.get(&id).copied().ok_or(Error::UnknownField(id))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, usize)> + '_ {
        self.slots.iter().map(|(id, slot)| (*id, *slot))
    }
}
