use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracemark_types::{ArtifactReference, IssuanceId, IssuanceRecord, PendingIssuance, TrackingCode};
use tracing::{debug, error, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::index::LedgerIndex;
use crate::traits::{LedgerReader, LedgerWriter};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Upper bound on a single encoded record. Appends over the limit are
/// refused; larger length fields found on open are treated as corruption.
const MAX_RECORD_LEN: usize = 64 * 1024;

/// Flush/sync strategy for the ledger log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every append (an issuance is on disk before delivery).
    #[default]
    EveryWrite,
    /// Hand writes to the OS page cache without `fsync`.
    OsDefault,
}

struct LogWriter {
    file: File,
    /// Length of the log after the last complete append.
    offset: u64,
    /// Set when a partial frame could not be cut off.
    failed: bool,
}

/// Durable ledger backed by a single append-only log file.
///
/// On-disk format, one frame per record:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized IssuanceRecord)]
/// ```
///
/// The whole log is replayed into an in-memory index on open. Frames that
/// fail the CRC check are skipped. An incomplete trailing frame (torn write)
/// is copied to a side file and cut off so that later appends stay readable.
pub struct FileLedger {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    index: RwLock<LedgerIndex>,
    sync_mode: SyncMode,
}

impl FileLedger {
    /// Open (or create) a ledger log at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> LedgerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let contents = fs::read(path)?;
        let recovery = recover(&contents);

        if recovery.valid_len < contents.len() {
            let tail = &contents[recovery.valid_len..];
            let side = preserve_torn_tail(path, recovery.valid_len, tail)?;
            file.set_len(recovery.valid_len as u64)?;
            file.sync_all()?;
            warn!(
                offset = recovery.valid_len,
                discarded = tail.len(),
                preserved_at = %side.display(),
                "truncated torn tail of ledger log"
            );
        }

        let mut index = LedgerIndex::default();
        for record in recovery.records {
            let code = record.tracking_code.clone();
            if !index.insert(record) {
                warn!(%code, "duplicate tracking code in ledger log; keeping first record");
            }
        }

        info!(
            path = %path.display(),
            records = index.len(),
            skipped = recovery.skipped,
            "ledger opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter {
                file,
                offset: recovery.valid_len as u64,
                failed: false,
            }),
            index: RwLock::new(index),
            sync_mode,
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_frame(&self, record: &IssuanceRecord) -> LedgerResult<()> {
        let payload =
            bincode::serialize(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        if payload.len() > MAX_RECORD_LEN {
            return Err(LedgerError::RecordTooLarge {
                size: payload.len(),
                max: MAX_RECORD_LEN,
            });
        }
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);

        let mut w = self.writer.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let start = w.offset;
        if w.failed {
            return Err(LedgerError::WriterFailed { offset: start });
        }

        if let Err(e) = write_and_sync(&mut w.file, &frame, self.sync_mode) {
            // Cut any partial frame so the log stays well-formed.
            if let Err(trunc) = w.file.set_len(start) {
                w.failed = true;
                error!(
                    offset = start,
                    error = %trunc,
                    "failed to roll back partial ledger write; refusing further appends"
                );
            }
            return Err(e.into());
        }

        w.offset = start + frame.len() as u64;
        debug!(offset = start, len = payload.len(), "ledger frame written");
        Ok(())
    }
}

impl LedgerWriter for FileLedger {
    fn append(&self, issuance: &PendingIssuance) -> LedgerResult<IssuanceId> {
        // The index write lock is held across the disk write so that the
        // uniqueness check and the append are one atomic step.
        let mut index = self.index.write().map_err(|_| LedgerError::LockPoisoned)?;
        if index.contains(&issuance.tracking_code) {
            return Err(LedgerError::DuplicateCode(issuance.tracking_code.clone()));
        }

        let id = index.next_id();
        let record = issuance.clone().into_record(id);
        self.write_frame(&record)?;
        index.insert(record);
        Ok(id)
    }
}

impl LedgerReader for FileLedger {
    fn lookup_by_code(&self, code: &TrackingCode) -> LedgerResult<Option<IssuanceRecord>> {
        let index = self.index.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.get(code).cloned())
    }

    fn lookup_by_artifact(
        &self,
        artifact: &ArtifactReference,
        limit: usize,
        newest_first: bool,
    ) -> LedgerResult<Vec<IssuanceRecord>> {
        let index = self.index.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.select(|r| &r.artifact == artifact, limit, newest_first))
    }

    fn lookup_by_post(
        &self,
        post: &str,
        limit: usize,
        newest_first: bool,
    ) -> LedgerResult<Vec<IssuanceRecord>> {
        let index = self.index.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.select(|r| r.artifact.post == post, limit, newest_first))
    }

    fn len(&self) -> LedgerResult<u64> {
        let index = self.index.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.len())
    }
}

fn write_and_sync(file: &mut File, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    file.write_all(frame)?;
    match sync_mode {
        SyncMode::EveryWrite => file.sync_all(),
        SyncMode::OsDefault => file.flush(),
    }
}

struct Recovery {
    records: Vec<IssuanceRecord>,
    /// Bytes covered by complete frames (valid or CRC-skipped).
    valid_len: usize,
    skipped: usize,
}

/// Replay the log front-to-back.
fn recover(contents: &[u8]) -> Recovery {
    let mut records = Vec::new();
    let mut skipped = 0;
    let mut offset = 0usize;

    while offset + HEADER_SIZE <= contents.len() {
        let header = &contents[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let end = offset + HEADER_SIZE + length;
        if length == 0 || length > MAX_RECORD_LEN || end > contents.len() {
            warn!(offset, length, "invalid ledger frame length; stopping recovery");
            break;
        }

        let payload = &contents[offset + HEADER_SIZE..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping ledger frame"
            );
            skipped += 1;
        } else {
            match bincode::deserialize::<IssuanceRecord>(payload) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(offset, error = %e, "failed to decode ledger frame; skipping");
                    skipped += 1;
                }
            }
        }
        offset = end;
    }

    debug!(recovered = records.len(), skipped, "ledger recovery complete");
    Recovery {
        records,
        valid_len: offset,
        skipped,
    }
}

/// Copy discarded bytes next to the log before truncating it.
fn preserve_torn_tail(path: &Path, offset: usize, tail: &[u8]) -> LedgerResult<PathBuf> {
    let mut side = path.as_os_str().to_owned();
    side.push(format!(".torn-{offset}"));
    let side = PathBuf::from(side);
    fs::write(&side, tail)?;
    Ok(side)
}
