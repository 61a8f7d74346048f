//! Accumulated reconciliation report.
//!
//! Per-row structural failures and matching ambiguities are collected here
//! rather than thrown: the batch proceeds past them, and repeated runs over
//! the same inputs surface the same items until new data resolves them.

use crate::domain::{SourceKind, TransactionId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A row that could not be normalized. Fatal for the row only; the rest of
/// the batch proceeds, and no other account is affected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIssue {
    pub source: SourceKind,
    pub account: String,
    pub datetime: Option<NaiveDateTime>,
    pub message: String,
}

/// A matching decision that was declined rather than guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ambiguity {
    /// Multiple candidate order-id groups at one timestamp; the rows are
    /// kept ungrouped.
    OrderCluster {
        account: String,
        datetime: NaiveDateTime,
        order_ids: Vec<i64>,
    },
    /// Zero or several balance rows qualified for a fee join; the trade
    /// legs are kept without fees.
    UnresolvedFeeJoin {
        account: String,
        datetime: NaiveDateTime,
        transaction_ids: Vec<TransactionId>,
        candidates: usize,
    },
    /// Several ledger records qualified for a late-feed merge; the merge is
    /// withheld for manual review.
    AmbiguousLateMatch {
        account: String,
        feed_transaction_id: String,
        candidates: Vec<TransactionId>,
    },
    /// Informational: a late-feed record matched nothing and was inserted
    /// as a new event the earlier sources missed.
    LateRecordInserted {
        account: String,
        transaction_id: TransactionId,
    },
}

impl Ambiguity {
    /// Informational entries don't block anything; the rest want a human or
    /// a better-informed later pass.
    pub fn is_informational(&self) -> bool {
        matches!(self, Ambiguity::LateRecordInserted { .. })
    }
}

/// Side output of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub row_errors: Vec<RowIssue>,
    pub ambiguities: Vec<Ambiguity>,
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, issue: RowIssue) {
        self.row_errors.push(issue);
    }

    pub fn push_ambiguity(&mut self, ambiguity: Ambiguity) {
        self.ambiguities.push(ambiguity);
    }

    pub fn merge(&mut self, other: ReconcileReport) {
        self.row_errors.extend(other.row_errors);
        self.ambiguities.extend(other.ambiguities);
    }

    /// True when nothing needs human attention.
    pub fn is_clean(&self) -> bool {
        self.row_errors.is_empty() && self.ambiguities.iter().all(Ambiguity::is_informational)
    }

    /// Canonical ordering so repeated runs serialize identically regardless
    /// of per-account processing order.
    pub fn sort(&mut self) {
        self.row_errors
            .sort_by_key(|e| serde_json::to_string(e).unwrap_or_default());
        self.ambiguities
            .sort_by_key(|a| serde_json::to_string(a).unwrap_or_default());
    }
}
