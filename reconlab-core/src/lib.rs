//! ReconLab Core — brokerage transaction reconciliation engine.
//!
//! Fragmented inputs (an end-of-day bulk export with several sub-tables and
//! a delayed, more detailed transaction feed) are reconciled into one
//! canonical, deduplicated transaction log:
//! - Domain types (canonical records, instruments, raw source rows)
//! - Symbol grammars and contract-size lookup
//! - Per-source normalizers
//! - Identity resolution and order-id clustering
//! - Cross-source fee join and late-feed merge
//! - Ledger store with idempotent keyed upserts
//!
//! Everything is a deterministic, batch transformation: re-running over the
//! same inputs produces the same ledger and the same ambiguity report.

pub mod config;
pub mod domain;
pub mod identity;
pub mod joining;
pub mod ledger;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod symbology;

pub use config::{ConfigError, ReconcileConfig, SourceToggles};
pub use ledger::{LedgerError, LedgerStore};
pub use pipeline::{reconcile, ReconcileInputs, ReconcileOutput};
pub use report::{Ambiguity, ReconcileReport, RowIssue};
