//! Sequential record stores.
//!
//! A [`RecordStore`] is a forward-only cursor over one physical resource. It
//! exposes its schema up front, hands out records one at a time and can be
//! rewound to the first record, but it never seeks to an arbitrary position.
//!
//! [`FileStore`] reads the framed capture format: every frame is
//! `[len:u32 LE][crc32:u32 LE][payload]`, the payload being a bincode-encoded
//! [`StoreFrame`]. The first frame is always the header.
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crc32fast::Hasher as Crc32;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{
    FieldDescriptor, FieldId, STORE_VERSION, StoreFrame, StoreHeader, StoredRecord,
};
use crate::selection::SelectionRules;

pub trait RecordStore {
    /// Fields present in this store, after field selection.
    fn schema(&self) -> &[FieldDescriptor];

    /// Read the next record, or fail with [`Error::EndOfStore`].
    fn read_next(&mut self) -> Result<StoredRecord>;

    /// Reset the cursor to the first record without releasing the resource.
    fn rewind(&mut self) -> Result<()>;

    /// Discard up to `n` records; returns how many were actually skipped.
    fn skip(&mut self, n: u64) -> Result<u64> {
        for skipped in 0..n {
            match self.read_next() {
                Ok(_) => {}
                Err(Error::EndOfStore) => return Ok(skipped),
                Err(e) => return Err(e),
            }
        }
        Ok(n)
    }
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub struct FileStore {
    path: PathBuf,
    reader: BufReader<File>,
    header: StoreHeader,
    selected: HashSet<FieldId>,
    first_record_offset: u64,
    file_len: u64,
    frames: u64,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>, rules: &SelectionRules) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .map_err(|source| Error::StoreOpen { path: path.clone(), source })?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut frames = 0;
        let mut header = match read_frame(&mut reader, file_len, &mut frames)? {
            Some(StoreFrame::Header(h)) => h,
            _ => return Err(Error::MissingHeader),
        };
        if header.version != STORE_VERSION {
            return Err(Error::UnsupportedVersion(header.version));
        }
        let total_fields = header.schema.len();
        header.schema = rules.filter_schema(std::mem::take(&mut header.schema));
        let selected = header.schema.iter().map(|d| d.id).collect();
        let first_record_offset = reader.stream_position()?;

        let created = header
            .created_at()
            .and_then(|t| t.format(&Rfc3339).ok())
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            "Opened record store {:?} (created {}, {} of {} fields selected)",
            path,
            created,
            header.schema.len(),
            total_fields
        );

        Ok(Self { path, reader, header, selected, first_record_offset, file_len, frames })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }
}

/// Read one frame; `Ok(None)` at a clean end of file.
///
/// `file_len` bounds the payload length so a corrupt length prefix cannot
/// trigger an oversized allocation.
fn read_frame<R: Read + Seek>(
    r: &mut R,
    file_len: u64,
    frames: &mut u64,
) -> Result<Option<StoreFrame>> {
    let frame = *frames;
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        match r.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => return Ok(None),
        4 => {}
        _ => return Err(Error::TruncatedFrame { frame }),
    }
    let len = u32::from_le_bytes(prefix) as u64;

    let stored = read_u32(r).map_err(|e| truncated(e, frame))?;
    let remaining = file_len.saturating_sub(r.stream_position()?);
    if len > remaining {
        return Err(Error::TruncatedFrame { frame });
    }
    let mut payload = vec![0u8; len as usize];
    r.read_exact(&mut payload).map_err(|e| truncated(e, frame))?;

    let mut hasher = Crc32::new();
    hasher.update(&payload);
    let computed = hasher.finalize();
    if computed != stored {
        return Err(Error::CorruptFrame { frame, stored, computed });
    }
    *frames += 1;
    Ok(Some(bincode::deserialize(&payload)?))
}

fn truncated(e: std::io::Error, frame: u64) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        Error::TruncatedFrame { frame }
    } else {
        e.into()
    }
}

impl RecordStore for FileStore {
    fn schema(&self) -> &[FieldDescriptor] {
        &self.header.schema
    }

    fn read_next(&mut self) -> Result<StoredRecord> {
        match read_frame(&mut self.reader, self.file_len, &mut self.frames)? {
            Some(StoreFrame::Record(mut rec)) => {
                rec.fields.retain(|f| self.selected.contains(&f.id));
                Ok(rec)
            }
            Some(StoreFrame::Header(_)) => Err(Error::MissingHeader),
            None => Err(Error::EndOfStore),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(self.first_record_offset))?;
        self.frames = 1;
        debug!("Rewound record store {:?}", self.path);
        Ok(())
    }
}

/// Store backed by records held in memory. Counts reads so callers can
/// check how often the store was touched.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    schema: Vec<FieldDescriptor>,
    records: Vec<StoredRecord>,
    cursor: usize,
    reads: usize,
    rewinds: usize,
}

impl MemoryStore {
    pub fn new(schema: Vec<FieldDescriptor>, records: Vec<StoredRecord>) -> Self {
        Self { schema, records, ..Default::default() }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn rewinds(&self) -> usize {
        self.rewinds
    }
}

impl RecordStore for MemoryStore {
    fn schema(&self) -> &[FieldDescriptor] {
        &self.schema
    }

    fn read_next(&mut self) -> Result<StoredRecord> {
        let rec = self.records.get(self.cursor).cloned().ok_or(Error::EndOfStore)?;
        self.cursor += 1;
        self.reads += 1;
        Ok(rec)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        self.rewinds += 1;
        Ok(())
    }
}
