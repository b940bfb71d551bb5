#![allow(dead_code)]

use crc32fast::Hasher as Crc32;
use repeat_cache::record::{
    FieldDescriptor, FieldId, FieldScope, RecordMetadata, STORE_VERSION, StoreFrame, StoreHeader,
    StoredField, StoredRecord,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const TRACKS: FieldId = FieldId(101);
pub const MUONS: FieldId = FieldId(102);
pub const DIGIS: FieldId = FieldId(103);
pub const LUMI_SUMMARY: FieldId = FieldId(900);

pub fn write_frame(w: &mut BufWriter<File>, frame: &StoreFrame) {
    let payload = bincode::serialize(frame).unwrap();
    let mut hasher = Crc32::new();
    hasher.update(&payload);
    let crc = hasher.finalize();
    let len = payload.len() as u32;
    w.write_all(&len.to_le_bytes()).unwrap();
    w.write_all(&crc.to_le_bytes()).unwrap();
    w.write_all(&payload).unwrap();
}

pub fn schema() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor { id: TRACKS, name: "recoTracks".into(), scope: FieldScope::Record },
        FieldDescriptor { id: MUONS, name: "recoMuons".into(), scope: FieldScope::Record },
        FieldDescriptor { id: DIGIS, name: "ecalDigis".into(), scope: FieldScope::Record },
        FieldDescriptor {
            id: LUMI_SUMMARY,
            name: "lumiSummary".into(),
            scope: FieldScope::LumiGroup,
        },
    ]
}

/// Record at store position `pos`; its event number is `1000 + pos` and its
/// tracks payload encodes `pos`.
pub fn record(pos: u64, run: u32, lumi: u32) -> StoredRecord {
    StoredRecord {
        metadata: RecordMetadata {
            run,
            lumi,
            event: 1000 + pos,
            process_history: 0xC0FFEE,
            selection_ids: vec![pos],
            branch_list_indexes: vec![0, 1],
        },
        fields: vec![
            StoredField { id: TRACKS, bytes: pos.to_le_bytes().to_vec() },
            StoredField { id: MUONS, bytes: vec![pos as u8; (pos % 4) as usize] },
            StoredField { id: DIGIS, bytes: vec![0xD1; 16] },
        ],
    }
}

/// Write a store holding `records` in order.
pub fn write_store(path: &Path, records: &[StoredRecord]) {
    let mut w = BufWriter::new(File::create(path).unwrap());
    let header = StoreHeader { version: STORE_VERSION, created_unix_ns: 0, schema: schema() };
    write_frame(&mut w, &StoreFrame::Header(header));
    for r in records {
        write_frame(&mut w, &StoreFrame::Record(r.clone()));
    }
    w.flush().unwrap();
}

/// `n` records in run 1, lumi 1.
pub fn single_lumi(n: u64) -> Vec<StoredRecord> {
    (0..n).map(|pos| record(pos, 1, 1)).collect()
}

pub fn position(event: u64) -> u64 {
    event - 1000
}
