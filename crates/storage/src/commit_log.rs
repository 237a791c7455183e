//! Commit log: the durable form of a [`Store`](crate::Store)
//!
//! Every committed write set is appended to a single log file and synced
//! before it becomes visible. Opening a store replays the log into memory.
//!
//! ## Record Format
//!
//! ```text
//! [length: u32][type: u8][payload: bytes][crc32: u32]
//! ```
//!
//! - **length**: size of type + payload + crc, not counting itself
//! - **type**: 1 = commit, 2 = checkpoint
//! - **payload**: bincode-encoded `(version, WriteSet)`
//! - **crc32**: checksum over type and payload
//!
//! ## Recovery
//!
//! - An incomplete record at the end of the file is what an interrupted
//!   append leaves behind; replay drops it and truncates the file
//! - A complete record that fails its checksum is corruption and fails the
//!   open
//! - A log holding more than one record is rewritten on open as a single
//!   checkpoint of the whole tree, so the file tracks the data size rather
//!   than the commit history

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use tracing::{debug, warn};

use crate::error::{Result, StorageError};
use crate::snapshot::Node;
use crate::writeset::WriteSet;

/// Name of the log file inside a store directory.
pub const LOG_FILE_NAME: &str = "rowkv.log";

const RECORD_COMMIT: u8 = 1;
const RECORD_CHECKPOINT: u8 = 2;

// type(1) + crc(4)
const MIN_RECORD_LEN: usize = 5;

/// Tree rebuilt from a log.
#[derive(Debug, Default)]
pub(crate) struct Recovered {
    pub(crate) root: Node,
    pub(crate) version: u64,
    pub(crate) records: usize,
}

#[derive(Debug)]
pub(crate) struct CommitLog {
    path: PathBuf,
    file: File,
    size: u64,
}

impl CommitLog {
    /// Open or create the log in `dir` and replay it.
    pub(crate) fn open(dir: &Path) -> Result<(Self, Recovered)> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE_NAME);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let (recovered, valid_len) = replay(&bytes)?;
        if valid_len < bytes.len() {
            warn!(
                target: "rowkv::storage",
                offset = valid_len,
                discarded = bytes.len() - valid_len,
                "discarding incomplete record at end of commit log"
            );
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.set_len(valid_len as u64)?;

        let mut log = Self {
            path,
            file,
            size: valid_len as u64,
        };
        if recovered.records > 1 {
            log.checkpoint(recovered.version, &recovered.root)?;
        }
        Ok((log, recovered))
    }

    /// Append one committed write set and sync it to disk.
    ///
    /// On failure the file is cut back to its previous length so a later
    /// append does not land after a partial record.
    pub(crate) fn append(&mut self, version: u64, writes: &WriteSet) -> Result<()> {
        let record = encode_record(RECORD_COMMIT, version, writes)?;
        let written = self
            .file
            .write_all(&record)
            .and_then(|_| self.file.sync_data());
        if let Err(e) = written {
            let _ = self.file.set_len(self.size);
            return Err(e.into());
        }
        self.size += record.len() as u64;
        Ok(())
    }

    /// Replace the log with one checkpoint record holding `root`.
    fn checkpoint(&mut self, version: u64, root: &Node) -> Result<()> {
        let record = encode_record(RECORD_CHECKPOINT, version, &WriteSet::from_tree(root))?;
        let tmp = self.path.with_extension("log.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&record)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            File::open(dir)?.sync_all()?;
        }

        self.file = OpenOptions::new().append(true).open(&self.path)?;
        debug!(
            target: "rowkv::storage",
            version,
            before = self.size,
            after = record.len(),
            "checkpointed commit log"
        );
        self.size = record.len() as u64;
        Ok(())
    }
}

/// Apply every complete record of `bytes` to a fresh tree.
///
/// Returns the tree and the length of the valid prefix.
fn replay(bytes: &[u8]) -> Result<(Recovered, usize)> {
    let mut recovered = Recovered::default();
    let mut offset = 0;
    while offset < bytes.len() {
        let Some((version, writes, len)) = decode_record(&bytes[offset..], offset as u64)? else {
            break;
        };
        writes.apply(&mut recovered.root);
        recovered.version = version;
        recovered.records += 1;
        offset += len;
    }
    Ok((recovered, offset))
}

fn encode_record(kind: u8, version: u64, writes: &WriteSet) -> Result<Vec<u8>> {
    let payload = bincode::serialize(&(version, writes))
        .map_err(|e| StorageError::Io(format!("failed to encode commit record: {}", e)))?;

    let total_len = 1 + payload.len() + 4;
    let length = u32::try_from(total_len)
        .map_err(|_| StorageError::Io(format!("commit record of {} bytes", total_len)))?;

    let mut hasher = Hasher::new();
    hasher.update(&[kind]);
    hasher.update(&payload);

    let mut buf = Vec::with_capacity(4 + total_len);
    buf.extend_from_slice(&length.to_le_bytes());
    buf.push(kind);
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(&hasher.finalize().to_le_bytes());
    Ok(buf)
}

/// Decode the record at the start of `buf`.
///
/// `Ok(None)` means `buf` ends before the record does.
fn decode_record(buf: &[u8], offset: u64) -> Result<Option<(u64, WriteSet, usize)>> {
    let corrupt = |reason: String| StorageError::Corrupt { offset, reason };

    if buf.len() < 4 {
        return Ok(None);
    }
    let total_len = read_u32(buf, 0) as usize;
    if total_len < MIN_RECORD_LEN {
        return Err(corrupt(format!("record length {}", total_len)));
    }
    if buf.len() < 4 + total_len {
        return Ok(None);
    }

    let kind = buf[4];
    let payload = &buf[5..total_len];
    let expected = read_u32(buf, total_len);

    let mut hasher = Hasher::new();
    hasher.update(&[kind]);
    hasher.update(payload);
    let actual = hasher.finalize();
    if actual != expected {
        return Err(corrupt(format!(
            "CRC mismatch: expected {:08x}, got {:08x}",
            expected, actual
        )));
    }
    if kind != RECORD_COMMIT && kind != RECORD_CHECKPOINT {
        return Err(corrupt(format!("unknown record type {}", kind)));
    }

    let (version, writes): (u64, WriteSet) = bincode::deserialize(payload)
        .map_err(|e| corrupt(format!("undecodable payload: {}", e)))?;
    Ok(Some((version, writes, 4 + total_len)))
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
