use std::sync::RwLock;

use tracemark_types::{ArtifactReference, IssuanceId, IssuanceRecord, PendingIssuance, TrackingCode};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::index::LedgerIndex;
use crate::traits::{LedgerReader, LedgerWriter};

/// In-memory ledger for tests, local demos, and embedding.
///
/// Not durable: records live only as long as the value.
#[derive(Default)]
pub struct InMemoryLedger {
    inner: RwLock<LedgerIndex>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerWriter for InMemoryLedger {
    fn append(&self, issuance: &PendingIssuance) -> LedgerResult<IssuanceId> {
        let mut index = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        if index.contains(&issuance.tracking_code) {
            return Err(LedgerError::DuplicateCode(issuance.tracking_code.clone()));
        }

        let id = index.next_id();
        index.insert(issuance.clone().into_record(id));
        debug!(%id, code = %issuance.tracking_code, "ledger append");
        Ok(id)
    }
}

impl LedgerReader for InMemoryLedger {
    fn lookup_by_code(&self, code: &TrackingCode) -> LedgerResult<Option<IssuanceRecord>> {
        let index = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.get(code).cloned())
    }

    fn lookup_by_artifact(
        &self,
        artifact: &ArtifactReference,
        limit: usize,
        newest_first: bool,
    ) -> LedgerResult<Vec<IssuanceRecord>> {
        let index = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.select(|r| &r.artifact == artifact, limit, newest_first))
    }

    fn lookup_by_post(
        &self,
        post: &str,
        limit: usize,
        newest_first: bool,
    ) -> LedgerResult<Vec<IssuanceRecord>> {
        let index = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.select(|r| r.artifact.post == post, limit, newest_first))
    }

    fn len(&self) -> LedgerResult<u64> {
        let index = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(index.len())
    }
}
