//! Append-only issuance ledger for tracemark.
//!
//! The ledger is the sole arbiter of tracking-code uniqueness. It provides:
//! - `LedgerWriter` / `LedgerReader` trait boundaries (together [`TrackingLedger`])
//! - [`InMemoryLedger`] for tests and embedding
//! - [`FileLedger`], a CRC-framed append-only log that is durable before
//!   `append` returns
//!
//! Records are never mutated or deleted once appended.

pub mod error;
pub mod file;
mod index;
pub mod memory;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use file::{FileLedger, SyncMode};
pub use memory::InMemoryLedger;
pub use traits::{LedgerReader, LedgerWriter, TrackingLedger};
