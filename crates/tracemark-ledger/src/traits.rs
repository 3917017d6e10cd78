use tracemark_types::{ArtifactReference, IssuanceId, IssuanceRecord, PendingIssuance, TrackingCode};

use crate::error::LedgerResult;

/// Write boundary for issuance records.
pub trait LedgerWriter: Send + Sync {
    /// Record an issuance and return its assigned id.
    ///
    /// Fails with [`crate::LedgerError::DuplicateCode`] if the code was
    /// issued before. On success the record is durable (as far as the
    /// backend allows) before this returns.
    fn append(&self, issuance: &PendingIssuance) -> LedgerResult<IssuanceId>;
}

/// Read boundary for issuance records. No method has side effects.
pub trait LedgerReader: Send + Sync {
    fn lookup_by_code(&self, code: &TrackingCode) -> LedgerResult<Option<IssuanceRecord>>;

    fn contains(&self, code: &TrackingCode) -> LedgerResult<bool> {
        Ok(self.lookup_by_code(code)?.is_some())
    }

    /// Issuances of exactly this artifact, ordered by issuance time.
    fn lookup_by_artifact(
        &self,
        artifact: &ArtifactReference,
        limit: usize,
        newest_first: bool,
    ) -> LedgerResult<Vec<IssuanceRecord>>;

    /// Issuances of any file or version under a post, ordered by issuance time.
    fn lookup_by_post(
        &self,
        post: &str,
        limit: usize,
        newest_first: bool,
    ) -> LedgerResult<Vec<IssuanceRecord>>;

    /// Total number of records.
    fn len(&self) -> LedgerResult<u64>;

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// A complete ledger: both boundaries behind one handle.
pub trait TrackingLedger: LedgerWriter + LedgerReader {}

impl<T: LedgerWriter + LedgerReader + ?Sized> TrackingLedger for T {}
