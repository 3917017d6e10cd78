use std::collections::HashMap;

use tracemark_types::{IssuanceId, IssuanceRecord, TrackingCode};

/// In-memory view of all records, shared by every ledger backend.
#[derive(Default)]
pub(crate) struct LedgerIndex {
    records: Vec<IssuanceRecord>,
    by_code: HashMap<TrackingCode, usize>,
    last_id: u64,
}

impl LedgerIndex {
    pub(crate) fn next_id(&self) -> IssuanceId {
        IssuanceId(self.last_id + 1)
    }

    pub(crate) fn contains(&self, code: &TrackingCode) -> bool {
        self.by_code.contains_key(code)
    }

    /// Insert a record. Returns `false` (and keeps the existing record) if
    /// the code is already present.
    pub(crate) fn insert(&mut self, record: IssuanceRecord) -> bool {
        if self.by_code.contains_key(&record.tracking_code) {
            return false;
        }
        self.last_id = self.last_id.max(record.id.0);
        self.by_code
            .insert(record.tracking_code.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub(crate) fn get(&self, code: &TrackingCode) -> Option<&IssuanceRecord> {
        self.by_code.get(code).and_then(|&i| self.records.get(i))
    }

    pub(crate) fn len(&self) -> u64 {
        self.records.len() as u64
    }

    /// Matching records ordered by `(issued_at, id)`, truncated to `limit`.
    pub(crate) fn select<F>(&self, filter: F, limit: usize, newest_first: bool) -> Vec<IssuanceRecord>
    where
        F: Fn(&IssuanceRecord) -> bool,
    {
        let mut matched: Vec<&IssuanceRecord> = self.records.iter().filter(|r| filter(r)).collect();
        matched.sort_by(|a, b| (a.issued_at, a.id).cmp(&(b.issued_at, b.id)));
        if newest_first {
            matched.reverse();
        }
        matched.into_iter().take(limit).cloned().collect()
    }
}
