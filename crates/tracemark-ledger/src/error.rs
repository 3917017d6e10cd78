use std::io;

use tracemark_types::TrackingCode;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The code is already recorded; the caller must generate another.
    #[error("tracking code {0} already issued")]
    DuplicateCode(TrackingCode),

    /// I/O error from the backing log.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An encoded record is larger than a log frame may hold.
    #[error("record of {size} bytes exceeds the {max}-byte frame limit")]
    RecordTooLarge { size: usize, max: usize },

    /// An earlier write could not be rolled back; the log refuses appends
    /// until it is reopened.
    #[error("ledger writer failed at offset {offset}; reopen to recover")]
    WriterFailed { offset: u64 },

    /// A thread panicked while holding the ledger lock.
    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
