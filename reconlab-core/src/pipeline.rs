//! Pipeline driver.
//!
//! Orchestrates normalize → cluster → fee-join → ledger, then the late
//! feed, one account partition at a time. Account partitions never
//! interact, so they run in parallel; outputs are folded back together in
//! sorted account order, which keeps the whole run deterministic.

use crate::config::ReconcileConfig;
use crate::domain::{
    ApiFeedRow, CashBalanceRow, FuturesStatementRow, SourceKind, TradeHistoryRow,
    TransactionRecord,
};
use crate::identity::cluster_order_ids;
use crate::joining::{join_fees, merge_late_feed};
use crate::ledger::LedgerStore;
use crate::normalize::{
    normalize_api_feed, normalize_cash_balance, normalize_futures_statements,
    normalize_trade_history, NonTradeRow, StatementBatch,
};
use crate::report::{ReconcileReport, RowIssue};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Raw row sets, as handed over by the external format parsers.
#[derive(Debug, Clone, Default)]
pub struct ReconcileInputs {
    pub trade_history: Vec<TradeHistoryRow>,
    pub cash_balance: Vec<CashBalanceRow>,
    pub futures_statements: Vec<FuturesStatementRow>,
    pub api_feed: Vec<ApiFeedRow>,
}

/// Everything a run produces: the canonical ledger, the untouched non-trade
/// stream, and the accumulated report.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutput {
    pub ledger: LedgerStore,
    pub nontrade: Vec<NonTradeRow>,
    pub report: ReconcileReport,
}

/// Run the full reconciliation. Pure function of the inputs: re-running
/// over the same (possibly extended) row sets yields the same ledger and
/// the same report.
pub fn reconcile(inputs: &ReconcileInputs, config: &ReconcileConfig) -> ReconcileOutput {
    let accounts: BTreeSet<String> = inputs
        .trade_history
        .iter()
        .map(|r| r.account.clone())
        .chain(inputs.cash_balance.iter().map(|r| r.account.clone()))
        .chain(inputs.futures_statements.iter().map(|r| r.account.clone()))
        .chain(inputs.api_feed.iter().map(|r| r.account.clone()))
        .collect();

    info!(accounts = accounts.len(), "reconcile start");

    let partitions: Vec<ReconcileInputs> = accounts
        .iter()
        .map(|account| ReconcileInputs {
            trade_history: filter_rows(&inputs.trade_history, |r| &r.account, account),
            cash_balance: filter_rows(&inputs.cash_balance, |r| &r.account, account),
            futures_statements: filter_rows(&inputs.futures_statements, |r| &r.account, account),
            api_feed: filter_rows(&inputs.api_feed, |r| &r.account, account),
        })
        .collect();

    let results: Vec<ReconcileOutput> = partitions
        .into_par_iter()
        .map(|partition| reconcile_account(&partition, config))
        .collect();

    let mut output = ReconcileOutput::default();
    for part in results {
        for record in part.ledger.into_records() {
            output.ledger.upsert(record);
        }
        output.nontrade.extend(part.nontrade);
        output.report.merge(part.report);
    }
    output.report.sort();
    output
        .nontrade
        .sort_by_key(|n| serde_json::to_string(n).unwrap_or_default());

    info!(
        records = output.ledger.len(),
        nontrade = output.nontrade.len(),
        errors = output.report.row_errors.len(),
        ambiguities = output.report.ambiguities.len(),
        "reconcile done"
    );
    output
}

fn filter_rows<T: Clone>(rows: &[T], account_of: impl Fn(&T) -> &String, account: &str) -> Vec<T> {
    rows.iter()
        .filter(|r| account_of(r) == account)
        .cloned()
        .collect()
}

/// One account partition, start to finish.
fn reconcile_account(inputs: &ReconcileInputs, config: &ReconcileConfig) -> ReconcileOutput {
    let mut output = ReconcileOutput::default();

    // Trade history → canonical records (fee-less), order ids clustered.
    let mut records: Vec<TransactionRecord> = Vec::new();
    if config.sources.trade_history {
        for row in &inputs.trade_history {
            match normalize_trade_history(row, config) {
                Ok(record) => records.push(record),
                Err(err) => output.report.push_error(RowIssue {
                    source: SourceKind::TradeHistory,
                    account: row.account.clone(),
                    datetime: Some(row.exec_time),
                    message: err.to_string(),
                }),
            }
        }
        for ambiguity in cluster_order_ids(&mut records, config.order_id_delta) {
            output.report.push_ambiguity(ambiguity);
        }
    }

    // Balance statements → fee-bearing trade rows, expirations, non-trade.
    let mut statements = StatementBatch::default();
    if config.sources.cash_balance {
        let (batch, issues) = normalize_cash_balance(&inputs.cash_balance, config);
        merge_batch(&mut statements, batch);
        output.report.row_errors.extend(issues);
    }
    if config.sources.futures_statements {
        let (batch, issues) = normalize_futures_statements(&inputs.futures_statements, config);
        merge_batch(&mut statements, batch);
        output.report.row_errors.extend(issues);
    }

    // Backfill fees from the statements onto the trade-history legs.
    let (unconsumed, ambiguities) = join_fees(&mut records, statements.trades, config);
    for ambiguity in ambiguities {
        output.report.push_ambiguity(ambiguity);
    }
    // Statement trade rows nobody claimed stay visible as ordinary events;
    // nothing is dropped silently.
    for row in unconsumed {
        output.nontrade.push(NonTradeRow {
            source: row.source,
            account: row.account,
            datetime: row.datetime,
            type_code: "TRD".to_string(),
            description: row.description,
            amount: row.amount,
        });
    }
    output.nontrade.extend(statements.nontrade);

    // Commit this account's records.
    for record in statements.expirations.into_iter().chain(records) {
        match record.validate() {
            Ok(()) => output.ledger.upsert(record),
            Err(err) => output.report.push_error(RowIssue {
                source: SourceKind::TradeHistory,
                account: record.account.clone(),
                datetime: Some(record.datetime),
                message: err.to_string(),
            }),
        }
    }

    // The late feed reads from and writes back into the ledger.
    if config.sources.api_feed {
        let mut feed_records = Vec::new();
        for row in &inputs.api_feed {
            match normalize_api_feed(row, config) {
                Ok(Some(record)) => feed_records.push(record),
                Ok(None) => output.nontrade.push(NonTradeRow {
                    source: SourceKind::ApiFeed,
                    account: row.account.clone(),
                    datetime: row.datetime,
                    type_code: row.type_code.clone(),
                    description: row.description.clone(),
                    amount: row.quantity * row.price,
                }),
                Err(err) => output.report.push_error(RowIssue {
                    source: SourceKind::ApiFeed,
                    account: row.account.clone(),
                    datetime: Some(row.datetime),
                    message: err.to_string(),
                }),
            }
        }
        debug!(feed = feed_records.len(), "merging late feed");
        for ambiguity in merge_late_feed(&mut output.ledger, feed_records, config) {
            output.report.push_ambiguity(ambiguity);
        }
    }

    output
}

fn merge_batch(into: &mut StatementBatch, from: StatementBatch) {
    into.trades.extend(from.trades);
    into.expirations.extend(from.expirations);
    into.nontrade.extend(from.nontrade);
}
