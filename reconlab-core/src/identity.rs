//! Transaction identity and order grouping.
//!
//! Identifiers must be stable across re-imports: the bulk export carries no
//! transaction ids at all, so ids are synthesized as a digest over the
//! fields that define the economic event. The late feed carries real ids,
//! which take precedence wherever present.

use crate::domain::{Instruction, Instrument, OrderId, TransactionId, TransactionRecord};
use crate::report::Ambiguity;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// A source-provided id is usable if it is non-empty and free of
/// whitespace. Anything else falls back to synthesis.
pub fn well_formed(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

/// Return the source-provided id when usable, otherwise a deterministic
/// digest over the defining fields. Identical inputs always produce the
/// same id, which makes re-imports idempotent.
pub fn resolve_transaction_id(
    source_id: Option<&str>,
    account: &str,
    datetime: NaiveDateTime,
    instrument: &Instrument,
    quantity: Decimal,
    price: Decimal,
    instruction: Option<Instruction>,
) -> TransactionId {
    if let Some(id) = source_id {
        if well_formed(id) {
            return TransactionId::new(id);
        }
    }
    let instruction = match instruction {
        Some(Instruction::Buy) => "BUY",
        Some(Instruction::Sell) => "SELL",
        None => "",
    };
    // Normalized decimals so 2.50 and 2.5 digest identically.
    let canonical = format!(
        "{account}|{datetime}|{symbol}|{quantity}|{price}|{instruction}",
        symbol = instrument,
        quantity = quantity.normalize(),
        price = price.normalize(),
    );
    TransactionId::synthesized(canonical.as_bytes())
}

/// Group transactions issued as one order.
///
/// The upstream system assigns distinct-but-consecutive order ids to the
/// legs of one multi-leg order. Records from the same account with an
/// identical timestamp whose order ids differ by at most `delta` are
/// squashed onto the smallest id of the run. A gap larger than `delta` at
/// the same timestamp means several candidate groups — that is reported and
/// left ungrouped, never resolved by guessing.
pub fn cluster_order_ids(records: &mut [TransactionRecord], delta: i64) -> Vec<Ambiguity> {
    let mut by_moment: BTreeMap<(String, NaiveDateTime), Vec<usize>> = BTreeMap::new();
    for (idx, rec) in records.iter().enumerate() {
        if rec.order_id.is_some() {
            by_moment
                .entry((rec.account.clone(), rec.datetime))
                .or_default()
                .push(idx);
        }
    }

    let mut ambiguities = Vec::new();
    for ((account, datetime), indices) in by_moment {
        let mut ids: Vec<i64> = indices
            .iter()
            .filter_map(|&i| records[i].order_id.map(|o| o.0))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() < 2 {
            continue;
        }

        // Partition the sorted ids into runs of consecutive-within-delta.
        let mut clusters: Vec<Vec<i64>> = vec![vec![ids[0]]];
        for window in ids.windows(2) {
            if window[1] - window[0] <= delta {
                clusters.last_mut().expect("nonempty").push(window[1]);
            } else {
                clusters.push(vec![window[1]]);
            }
        }

        if clusters.len() > 1 {
            ambiguities.push(Ambiguity::OrderCluster {
                account,
                datetime,
                order_ids: ids,
            });
            continue;
        }

        let head = clusters[0][0];
        debug!(account = %account, datetime = %datetime, head, squashed = ids.len() - 1, "order cluster");
        for &i in &indices {
            records[i].order_id = Some(OrderId(head));
        }
    }
    ambiguities
}
