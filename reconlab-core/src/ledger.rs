//! Ledger store — the single mutation point of the pipeline.
//!
//! An owned, addressable collection keyed by transaction id. Uniqueness is
//! structural (the map key), upserts are idempotent, and iteration order is
//! deterministic, so a store built from the same inputs always serializes
//! byte-for-byte identically.

use crate::domain::{TransactionId, TransactionRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("unknown transaction id '{0}'")]
    UnknownId(TransactionId),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStore {
    records: BTreeMap<TransactionId, TransactionRecord>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace by key. Re-applying an identical record produces
    /// no observable change.
    pub fn upsert(&mut self, record: TransactionRecord) {
        self.records.insert(record.transaction_id.clone(), record);
    }

    pub fn get(&self, id: &TransactionId) -> Option<&TransactionRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.records.contains_key(id)
    }

    /// Supersede path: the record stored under `old_id` is replaced in
    /// place by `record`, which may carry a different (authoritative) id.
    pub fn replace(
        &mut self,
        old_id: &TransactionId,
        record: TransactionRecord,
    ) -> Result<(), LedgerError> {
        if self.records.remove(old_id).is_none() {
            return Err(LedgerError::UnknownId(old_id.clone()));
        }
        self.upsert(record);
        Ok(())
    }

    /// All records, in key order.
    pub fn records(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.values()
    }

    pub fn into_records(self) -> impl Iterator<Item = TransactionRecord> {
        self.records.into_values()
    }

    /// Records ordered by (datetime, transaction id) — the shape consumers
    /// iterate for bookkeeping and position tracking.
    pub fn iter_chronological(&self) -> Vec<&TransactionRecord> {
        let mut out: Vec<&TransactionRecord> = self.records.values().collect();
        out.sort_by(|a, b| {
            (a.datetime, &a.transaction_id).cmp(&(b.datetime, &b.transaction_id))
        });
        out
    }

    /// Deterministic JSON export: a chronologically ordered array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.iter_chronological())
    }
}
