//! Content-addressed record of produced outputs
//!
//! Keyed by the SHA-256 of the framed payload. A record whose output file has
//! gone missing is stale; the encoder removes it and synthesizes afresh.

use crate::error::{GhostlinkError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tempfile::NamedTempFile;

const LOCK_POLL: Duration = Duration::from_millis(10);

/// Key locks are held across synthesis, which can take a while for long payloads
const KEY_LOCK_WAIT: Duration = Duration::from_secs(600);

/// The store lock only covers one read-modify-write of the table
const STORE_LOCK_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupRecord {
    /// Hex SHA-256 of the framed payload
    pub hash: String,
    /// Unix seconds
    pub created_at: u64,
    pub mode: String,
    pub input_ref: String,
    pub byte_len: usize,
    pub sample_rate: u32,
    pub baud: f64,
    pub amplitude: f64,
    pub dense: bool,
    pub mix_profile: String,
    /// Comma-separated carrier list, e.g. "1500.00,2000.00"
    pub frequencies: String,
    pub output_path: PathBuf,
    /// CRC-32 of the raw payload, 8 lowercase hex digits
    pub checksum_hex: String,
}

impl DedupRecord {
    /// The referenced output still exists on disk
    pub fn is_live(&self) -> bool {
        self.output_path.is_file()
    }
}

/// Unique-key lookup/insert/remove over dedup records
///
/// `insert` and `remove` are each atomic against the backing store.
/// `lock_key` serializes a whole lookup -> remove/insert sequence for one
/// hash so racing encoders of identical content cannot both believe they
/// came first.
pub trait DedupStore: Send + Sync {
    fn lookup(&self, hash: &str) -> Result<Option<DedupRecord>>;

    /// Fails if a record with the same hash exists
    fn insert(&self, record: &DedupRecord) -> Result<()>;

    /// Returns whether a record was removed
    fn remove(&self, hash: &str) -> Result<bool>;

    fn lock_key(&self, hash: &str) -> Result<KeyLock>;
}

fn store_err(context: &str, err: impl Display) -> GhostlinkError {
    GhostlinkError::DedupStore(format!("{}: {}", context, err))
}

fn check_key(hash: &str) -> Result<()> {
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(store_err("invalid key", hash));
    }
    Ok(())
}

/// Exclusive advisory lock on a lock file, released when dropped
///
/// The lock lives on the open handle, so the OS releases it when the holder
/// exits for any reason. A lock file left behind by a dead process is just an
/// unlocked file and is taken over immediately. Lock files are never deleted:
/// unlinking one while another waiter has it open would let two holders in.
#[derive(Debug)]
pub struct KeyLock {
    path: PathBuf,
    file: File,
}

impl KeyLock {
    /// Wait up to `wait_limit` for the lock at `path`
    pub fn acquire(path: PathBuf, wait_limit: Duration) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| store_err(&format!("open lock {}", path.display()), e))?;

        let started = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => break,
                Err(TryLockError::WouldBlock) => {
                    if started.elapsed() > wait_limit {
                        return Err(store_err("timed out waiting for lock", path.display()));
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(TryLockError::Error(e)) => {
                    return Err(store_err(&format!("lock {}", path.display()), e));
                }
            }
        }

        // holder pid is informational only
        if file.set_len(0).is_ok() {
            let _ = writeln!(file, "{}", std::process::id());
        }
        debug!("Acquired {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DedupTable {
    records: BTreeMap<String, DedupRecord>,
}

/// Dedup store persisted as one JSON document
///
/// Every mutation is a read-modify-write under a store-wide lock, landed by
/// atomically renaming a fully written temp file over the old document.
#[derive(Debug, Clone)]
pub struct JsonDedupStore {
    path: PathBuf,
    lock_dir: PathBuf,
}

impl JsonDedupStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .ok_or_else(|| store_err("store path has no file name", path.display()))?
            .to_string_lossy()
            .into_owned();
        let lock_dir = parent_dir(&path).join(format!("{}.locks", file_name));
        fs::create_dir_all(&lock_dir).map_err(|e| store_err("create lock directory", e))?;
        debug!("Dedup store at {}", path.display());
        Ok(Self { path, lock_dir })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, ordered by hash
    pub fn records(&self) -> Result<Vec<DedupRecord>> {
        Ok(self.load()?.records.into_values().collect())
    }

    fn load(&self) -> Result<DedupTable> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DedupTable::default()),
            Err(e) => return Err(store_err("open store", e)),
        };
        serde_json::from_reader(BufReader::new(file)).map_err(|e| store_err("parse store", e))
    }

    fn save(&self, table: &DedupTable) -> Result<()> {
        let tmp = NamedTempFile::new_in(parent_dir(&self.path)).map_err(|e| store_err("create temp file", e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, table).map_err(|e| store_err("serialize store", e))?;
            writer.flush().map_err(|e| store_err("write store", e))?;
        }
        tmp.as_file().sync_all().map_err(|e| store_err("sync store", e))?;
        tmp.persist(&self.path).map_err(|e| store_err("replace store", e.error))?;
        Ok(())
    }

    fn store_lock(&self) -> Result<KeyLock> {
        KeyLock::acquire(self.lock_dir.join("store.lock"), STORE_LOCK_WAIT)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl DedupStore for JsonDedupStore {
    fn lookup(&self, hash: &str) -> Result<Option<DedupRecord>> {
        check_key(hash)?;
        // renames are atomic, so an unlocked read sees either the old or new document
        Ok(self.load()?.records.remove(hash))
    }

    fn insert(&self, record: &DedupRecord) -> Result<()> {
        check_key(&record.hash)?;
        let _guard = self.store_lock()?;
        let mut table = self.load()?;
        if table.records.contains_key(&record.hash) {
            return Err(store_err("duplicate hash", &record.hash));
        }
        table.records.insert(record.hash.clone(), record.clone());
        self.save(&table)
    }

    fn remove(&self, hash: &str) -> Result<bool> {
        check_key(hash)?;
        let _guard = self.store_lock()?;
        let mut table = self.load()?;
        if table.records.remove(hash).is_none() {
            return Ok(false);
        }
        self.save(&table)?;
        Ok(true)
    }

    fn lock_key(&self, hash: &str) -> Result<KeyLock> {
        check_key(hash)?;
        KeyLock::acquire(self.lock_dir.join(format!("key-{}.lock", hash)), KEY_LOCK_WAIT)
    }
}

/// Seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
