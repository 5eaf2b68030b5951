//! Obligation store: memoization plus counterexample trails
//!
//! The store maps (node id, expression id) keys to a status and to the
//! predecessor obligation that first discovered the key. The scheduler
//! is backend-agnostic; the two backends present identical semantics:
//!
//! - [`MemoryStore`]: a hash table, the default
//! - [`DiskStore`]: fixed-width records in an append-mostly file, for
//!   structures with too many (node, expression) pairs to hold in RAM
//!
//! The only mutation permitted per key is the transition from pending
//! to one terminal status. Re-resolving a key to a different terminal
//! status is an internal-consistency error, never silently absorbed.
//!
//! # Disk record format
//!
//! ```text
//! Record (24 bytes, little-endian):
//!   predecessor_offset: u64  - u64::MAX for obligations with no predecessor
//!   node_id:            u32
//!   expr_id:            u32
//!   status:             u8
//!   reserved:           7 bytes, zero
//! ```
//!
//! The file offset of a record identifies it; predecessor links are
//! offsets, walked backward at reconstruction time. Resolving a key
//! rewrites its status byte in place; everything else is append-only.

use crate::error::StoreError;
use crate::index::NodeId;
use crate::intern::ExprId;
use rustc_hash::FxHashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Key of one obligation: an expression pushed onto a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObligationKey {
    pub node: NodeId,
    pub expr: ExprId,
}

impl ObligationKey {
    pub fn new(node: NodeId, expr: ExprId) -> Self {
        ObligationKey { node, expr }
    }
}

impl fmt::Display for ObligationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.node, self.expr)
    }
}

/// Status of a stored obligation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Pending,
    Satisfied,
    Violated,
    ConstraintViolated,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Pending)
    }

    fn code(self) -> u8 {
        match self {
            Status::Pending => 0,
            Status::Satisfied => 1,
            Status::Violated => 2,
            Status::ConstraintViolated => 3,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Status::Pending),
            1 => Some(Status::Satisfied),
            2 => Some(Status::Violated),
            3 => Some(Status::ConstraintViolated),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Satisfied => "satisfied",
            Status::Violated => "violated",
            Status::ConstraintViolated => "constraint-violated",
        };
        f.write_str(s)
    }
}

/// Backend-agnostic store contract
///
/// Methods take `&mut self` because the disk backend interleaves
/// buffered appends with seeking reads; the engine is single-threaded
/// so there is never a second concurrent accessor.
pub trait ObligationStore {
    /// Current status of a key, if it was ever inserted
    fn get(&mut self, key: ObligationKey) -> Result<Option<Status>, StoreError>;

    /// Record the first visit to a key with the obligation that spawned
    /// it. A later insert for an existing key is a no-op; the first
    /// discoverer's predecessor link is the one kept.
    fn insert_pending(
        &mut self,
        key: ObligationKey,
        predecessor: Option<ObligationKey>,
    ) -> Result<(), StoreError>;

    /// Transition a pending key to a terminal status
    ///
    /// Resolving to the same terminal status twice is idempotent;
    /// resolving to a different one fails with
    /// [`StoreError::DoubleResolve`].
    fn resolve(&mut self, key: ObligationKey, status: Status) -> Result<(), StoreError>;

    /// Predecessor link recorded at first insertion
    fn predecessor(&mut self, key: ObligationKey) -> Result<Option<ObligationKey>, StoreError>;

    /// Number of keys ever inserted
    fn len(&mut self) -> Result<usize, StoreError>;

    fn is_empty(&mut self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

// ---------------------------------------------------------------------------
// In-memory backend

#[derive(Debug, Clone, Copy)]
struct MemoryEntry {
    status: Status,
    predecessor: Option<ObligationKey>,
}

/// Hash-table backend, the default
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: FxHashMap<ObligationKey, MemoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObligationStore for MemoryStore {
    fn get(&mut self, key: ObligationKey) -> Result<Option<Status>, StoreError> {
        Ok(self.entries.get(&key).map(|e| e.status))
    }

    fn insert_pending(
        &mut self,
        key: ObligationKey,
        predecessor: Option<ObligationKey>,
    ) -> Result<(), StoreError> {
        self.entries.entry(key).or_insert(MemoryEntry {
            status: Status::Pending,
            predecessor,
        });
        Ok(())
    }

    fn resolve(&mut self, key: ObligationKey, status: Status) -> Result<(), StoreError> {
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| StoreError::MissingPending {
                key: key.to_string(),
            })?;
        check_transition(key, entry.status, status)?;
        entry.status = status;
        Ok(())
    }

    fn predecessor(&mut self, key: ObligationKey) -> Result<Option<ObligationKey>, StoreError> {
        Ok(self.entries.get(&key).and_then(|e| e.predecessor))
    }

    fn len(&mut self) -> Result<usize, StoreError> {
        Ok(self.entries.len())
    }
}

fn check_transition(
    key: ObligationKey,
    previous: Status,
    attempted: Status,
) -> Result<(), StoreError> {
    if previous.is_terminal() && previous != attempted {
        return Err(StoreError::DoubleResolve {
            key: key.to_string(),
            previous: previous.to_string(),
            attempted: attempted.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Disk backend

/// Global counter for unique store file names; combined with the
/// process id so concurrent runs never share a file
static STORE_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sentinel for "no predecessor"; 0 is a valid record offset
const NO_PREDECESSOR: u64 = u64::MAX;

const RECORD_SIZE: u64 = 24;
const STATUS_OFFSET: u64 = 16;

/// Fixed-width-record file backend
///
/// The key-to-offset index stays in memory; node content and statuses
/// live on disk. Not thread-safe.
pub struct DiskStore {
    path: PathBuf,
    /// Appending writer; flushed before any read
    writer: BufWriter<File>,
    /// Next record offset
    write_pos: u64,
    offsets: FxHashMap<ObligationKey, u64>,
}

impl DiskStore {
    /// Create a store file, truncating any existing file at the path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(DiskStore {
            path,
            writer: BufWriter::new(file),
            write_pos: 0,
            offsets: FxHashMap::default(),
        })
    }

    /// Create a store file under the system temp directory with a
    /// unique name
    pub fn create_temp() -> Result<Self, StoreError> {
        let counter = STORE_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let filename = format!("kripke_store_{}_{}.ob", std::process::id(), counter);
        Self::create(std::env::temp_dir().join(filename))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_record(
        &mut self,
        key: ObligationKey,
        predecessor_offset: u64,
    ) -> Result<u64, StoreError> {
        let offset = self.write_pos;
        let mut record = [0u8; RECORD_SIZE as usize];
        record[0..8].copy_from_slice(&predecessor_offset.to_le_bytes());
        record[8..12].copy_from_slice(&key.node.0.to_le_bytes());
        record[12..16].copy_from_slice(&key.expr.0.to_le_bytes());
        record[STATUS_OFFSET as usize] = Status::Pending.code();
        self.writer.write_all(&record)?;
        self.write_pos += RECORD_SIZE;
        self.offsets.insert(key, offset);
        Ok(offset)
    }

    fn read_record(&mut self, offset: u64) -> Result<(u64, ObligationKey, Status), StoreError> {
        self.writer.flush()?;
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; RECORD_SIZE as usize];
        reader.read_exact(&mut buf)?;
        parse_record(offset, &buf)
    }

    fn write_status(&mut self, offset: u64, status: Status) -> Result<(), StoreError> {
        self.writer.flush()?;
        // Separate handle so the appending writer's cursor is untouched
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset + STATUS_OFFSET))?;
        file.write_all(&[status.code()])?;
        Ok(())
    }
}

fn parse_record(offset: u64, buf: &[u8; 24]) -> Result<(u64, ObligationKey, Status), StoreError> {
    let predecessor = u64::from_le_bytes(buf[0..8].try_into().unwrap_or([0; 8]));
    let node = u32::from_le_bytes(buf[8..12].try_into().unwrap_or([0; 4]));
    let expr = u32::from_le_bytes(buf[12..16].try_into().unwrap_or([0; 4]));
    let status = Status::from_code(buf[16]).ok_or_else(|| StoreError::Corrupt {
        offset,
        reason: format!("unknown status code {}", buf[16]),
    })?;
    Ok((
        predecessor,
        ObligationKey::new(NodeId(node), ExprId(expr)),
        status,
    ))
}

impl ObligationStore for DiskStore {
    fn get(&mut self, key: ObligationKey) -> Result<Option<Status>, StoreError> {
        match self.offsets.get(&key).copied() {
            Some(offset) => {
                let (_, _, status) = self.read_record(offset)?;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    fn insert_pending(
        &mut self,
        key: ObligationKey,
        predecessor: Option<ObligationKey>,
    ) -> Result<(), StoreError> {
        if self.offsets.contains_key(&key) {
            return Ok(());
        }
        let predecessor_offset = match predecessor {
            Some(pred) => self.offsets.get(&pred).copied().unwrap_or(NO_PREDECESSOR),
            None => NO_PREDECESSOR,
        };
        self.append_record(key, predecessor_offset)?;
        Ok(())
    }

    fn resolve(&mut self, key: ObligationKey, status: Status) -> Result<(), StoreError> {
        let offset = self
            .offsets
            .get(&key)
            .copied()
            .ok_or_else(|| StoreError::MissingPending {
                key: key.to_string(),
            })?;
        let (_, _, previous) = self.read_record(offset)?;
        check_transition(key, previous, status)?;
        self.write_status(offset, status)
    }

    fn predecessor(&mut self, key: ObligationKey) -> Result<Option<ObligationKey>, StoreError> {
        let Some(offset) = self.offsets.get(&key).copied() else {
            return Ok(None);
        };
        let (predecessor_offset, _, _) = self.read_record(offset)?;
        if predecessor_offset == NO_PREDECESSOR {
            return Ok(None);
        }
        let (_, pred_key, _) = self.read_record(predecessor_offset)?;
        Ok(Some(pred_key))
    }

    fn len(&mut self) -> Result<usize, StoreError> {
        Ok(self.offsets.len())
    }
}

impl Drop for DiskStore {
    fn drop(&mut self) {
        // Best-effort flush on drop
        let _ = self.writer.flush();
    }
}
