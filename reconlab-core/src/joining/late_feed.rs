//! Late-feed merge.
//!
//! The API feed arrives one to two days after the fact, settlement-final,
//! with real transaction ids and per-leg fees — and it supersedes whatever
//! the trade-history+balance join built earlier. Grouping metadata that only
//! the earlier join can supply (order grouping from the statement combos)
//! must survive the overwrite. Ambiguous matches are withheld: guessing
//! here could silently double a position.

use crate::config::ReconcileConfig;
use crate::domain::{TransactionId, TransactionRecord};
use crate::ledger::LedgerStore;
use crate::report::Ambiguity;
use tracing::debug;

/// Merge normalized feed records into the ledger.
pub fn merge_late_feed(
    ledger: &mut LedgerStore,
    feed: Vec<TransactionRecord>,
    config: &ReconcileConfig,
) -> Vec<Ambiguity> {
    let tolerance = config.late_match_tolerance();
    let mut ambiguities = Vec::new();

    // Deterministic application order regardless of feed file order.
    let mut feed = feed;
    feed.sort_by(|a, b| {
        (a.datetime, &a.transaction_id).cmp(&(b.datetime, &b.transaction_id))
    });

    for incoming in feed {
        let candidates: Vec<TransactionId> = ledger
            .records()
            .filter(|existing| {
                existing.account == incoming.account
                    && existing.rowtype == incoming.rowtype
                    && existing.instrument.underlying() == incoming.instrument.underlying()
                    && existing.quantity == incoming.quantity
                    && existing.instruction == incoming.instruction
                    && (existing.datetime - incoming.datetime).abs() <= tolerance
            })
            .map(|existing| existing.transaction_id.clone())
            .collect();

        match candidates.len() {
            1 => {
                let old_id = candidates.into_iter().next().expect("one candidate");
                let existing = ledger
                    .get(&old_id)
                    .expect("candidate id came from the store")
                    .clone();
                let merged = supersede(existing, incoming);
                debug!(old = %old_id, new = %merged.transaction_id, "late feed supersede");
                ledger
                    .replace(&old_id, merged)
                    .expect("old id present in the store");
            }
            0 => {
                // An event the earlier sources missed entirely.
                ambiguities.push(Ambiguity::LateRecordInserted {
                    account: incoming.account.clone(),
                    transaction_id: incoming.transaction_id.clone(),
                });
                ledger.upsert(incoming);
            }
            _ => {
                ambiguities.push(Ambiguity::AmbiguousLateMatch {
                    account: incoming.account.clone(),
                    feed_transaction_id: incoming.transaction_id.0.clone(),
                    candidates,
                });
            }
        }
    }
    ambiguities
}

/// Build the superseding record: feed fields are authoritative, but
/// grouping metadata and anything the feed left blank survives from the
/// earlier record.
fn supersede(existing: TransactionRecord, incoming: TransactionRecord) -> TransactionRecord {
    let mut merged = incoming;
    merged.order_id = merged.order_id.or(existing.order_id);
    merged.trade_id = merged.trade_id.or(existing.trade_id);
    merged.match_id = merged.match_id.or(existing.match_id);
    merged.effect = merged.effect.or(existing.effect);
    if merged.description.is_none() {
        merged.description = existing.description;
    }
    merged.recompute_cost();
    merged
}
