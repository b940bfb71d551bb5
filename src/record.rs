use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Current on-disk format version written in [`StoreHeader::version`].
pub const STORE_VERSION: u16 = 1;

/// Identifier of one field (column) within a record; stable across a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldScope {
    Record,
    LumiGroup,
    RunGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub name: String,
    pub scope: FieldScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHeader {
    pub version: u16,
    pub created_unix_ns: u128,
    pub schema: Vec<FieldDescriptor>,
}

impl StoreHeader {
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(self.created_unix_ns as i128).ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub run: u32,
    pub lumi: u32,
    pub event: u64,
    pub process_history: u64,
    pub selection_ids: Vec<u64>,
    pub branch_list_indexes: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredField {
    pub id: FieldId,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub metadata: RecordMetadata,
    pub fields: Vec<StoredField>, // absent fields are simply not listed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreFrame {
    Header(StoreHeader),
    Record(StoredRecord),
}
