//! Futures-statement mapping.
//!
//! Same role as the cash balance, for the futures side of the account. This
//! export is friendlier: it carries a misc-fees column directly, and its
//! `ref` column is present on exactly the trading rows, which makes the
//! trade/non-trade split trivial.

use crate::config::ReconcileConfig;
use crate::domain::{FuturesStatementRow, SourceKind};
use crate::report::RowIssue;
use tracing::warn;

use super::cash_balance::expiration_record;
use super::description::{clean_prefixes, parse_description, ParsedDescription};
use super::{NonTradeRow, StatementBatch, StatementRow};

pub fn normalize_futures_statements(
    rows: &[FuturesStatementRow],
    config: &ReconcileConfig,
) -> (StatementBatch, Vec<RowIssue>) {
    let mut batch = StatementBatch::default();
    let mut issues = Vec::new();

    for row in rows {
        let description = clean_prefixes(&row.description);

        if row.ref_id.is_none() {
            batch.nontrade.push(NonTradeRow {
                source: SourceKind::FuturesStatements,
                account: row.account.clone(),
                datetime: row.datetime,
                type_code: row.type_code.clone(),
                description,
                amount: row.amount,
            });
            continue;
        }

        match parse_description(&row.type_code, &description) {
            Ok(ParsedDescription::Trade(trade)) => batch.trades.push(StatementRow {
                source: SourceKind::FuturesStatements,
                account: row.account.clone(),
                datetime: row.datetime,
                strategy: trade.strategy,
                underlying: config.rename(&trade.underlying).to_string(),
                quantity: trade.quantity,
                commissions: row.commissions_fees,
                fees: row.misc_fees,
                amount: row.amount,
                description,
            }),
            Ok(ParsedDescription::Expiration(exp)) => {
                match expiration_record(
                    &row.account,
                    row.datetime,
                    row.commissions_fees,
                    &description,
                    &exp,
                ) {
                    Ok(record) => batch.expirations.push(record),
                    Err(err) => issues.push(RowIssue {
                        source: SourceKind::FuturesStatements,
                        account: row.account.clone(),
                        datetime: Some(row.datetime),
                        message: err.to_string(),
                    }),
                }
            }
            Ok(ParsedDescription::Dividend(_)) | Ok(ParsedDescription::Other) => {
                batch.nontrade.push(NonTradeRow {
                    source: SourceKind::FuturesStatements,
                    account: row.account.clone(),
                    datetime: row.datetime,
                    type_code: row.type_code.clone(),
                    description,
                    amount: row.amount,
                });
            }
            Err(err) => {
                warn!(account = %row.account, datetime = %row.datetime, %err, "futures row rejected");
                issues.push(RowIssue {
                    source: SourceKind::FuturesStatements,
                    account: row.account.clone(),
                    datetime: Some(row.datetime),
                    message: err.to_string(),
                });
            }
        }
    }

    (batch, issues)
}
