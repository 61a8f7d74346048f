//! Cash-balance mapping.
//!
//! The cash statement is the fee authority for equities and equity options:
//! each trading row aggregates a whole order's cash effect plus its
//! commissions. The export has no misc-fees column — it is backed out from
//! consecutive balances. Expirations appear here too, as removal rows, and
//! are synthesized into full canonical records.

use crate::config::ReconcileConfig;
use crate::domain::{
    CashBalanceRow, Effect, Instrument, RowType, SourceKind, TransactionId, TransactionRecord,
};
use crate::report::RowIssue;
use crate::symbology::option_contract_size;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::warn;

use super::description::{
    clean_prefixes, parse_description, ExpirationDescription, ParsedDescription,
};
use super::{NonTradeRow, NormalizeError, StatementBatch, StatementRow};

pub fn normalize_cash_balance(
    rows: &[CashBalanceRow],
    config: &ReconcileConfig,
) -> (StatementBatch, Vec<RowIssue>) {
    let mut batch = StatementBatch::default();
    let mut issues = Vec::new();

    let mut prev_balance: Option<Decimal> = None;
    for row in rows {
        // The misc-fees column is missing from this export; each row's
        // balance delta not explained by amount + commissions is the fee.
        let misc_fees = match prev_balance {
            Some(prev) => (row.balance - prev) - (row.amount + row.commissions_fees),
            None => Decimal::ZERO,
        };
        prev_balance = Some(row.balance);

        let description = clean_prefixes(&row.description);
        match parse_description(&row.type_code, &description) {
            Ok(ParsedDescription::Trade(trade)) => batch.trades.push(StatementRow {
                source: SourceKind::CashBalance,
                account: row.account.clone(),
                datetime: row.datetime,
                strategy: trade.strategy,
                underlying: config.rename(&trade.underlying).to_string(),
                quantity: trade.quantity,
                commissions: row.commissions_fees,
                fees: misc_fees,
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
                    Err(err) => issues.push(issue(row, Some(err.to_string()))),
                }
            }
            Ok(ParsedDescription::Dividend(_)) | Ok(ParsedDescription::Other) => {
                batch.nontrade.push(NonTradeRow {
                    source: SourceKind::CashBalance,
                    account: row.account.clone(),
                    datetime: row.datetime,
                    type_code: row.type_code.clone(),
                    description,
                    amount: row.amount,
                });
            }
            Err(err) => {
                warn!(account = %row.account, datetime = %row.datetime, %err, "cash row rejected");
                issues.push(issue(row, Some(err.to_string())));
            }
        }
    }

    (batch, issues)
}

fn issue(row: &CashBalanceRow, message: Option<String>) -> RowIssue {
    RowIssue {
        source: SourceKind::CashBalance,
        account: row.account.clone(),
        datetime: Some(row.datetime),
        message: message.unwrap_or_default(),
    }
}

/// Synthesize a canonical record for an option removal.
///
/// The removal description fully identifies equity options. Futures-option
/// removals name only the root — the series code needed to identify the
/// contract is absent, so they are reported rather than reconstructed.
pub(super) fn expiration_record(
    account: &str,
    datetime: NaiveDateTime,
    commissions_fees: Decimal,
    description: &str,
    exp: &ExpirationDescription,
) -> Result<TransactionRecord, NormalizeError> {
    if exp.underlying.starts_with('/') {
        return Err(NormalizeError::Unsupported(format!(
            "futures option removal for '{}' carries no series code",
            exp.underlying
        )));
    }

    let instrument = Instrument::EquityOption {
        underlying: exp.underlying.clone(),
        expiration: exp.expiration,
        side: exp.side,
        strike: exp.strike,
    };
    // Removal descriptions restate the contract size; anything else would
    // be a nonstandard deliverable this engine must not price.
    if exp.multiplier != option_contract_size() {
        return Err(NormalizeError::Unsupported(format!(
            "nonstandard option contract size {}",
            exp.multiplier
        )));
    }

    let quantity = exp.quantity.abs();
    let transaction_id = TransactionId::synthesized(
        format!(
            "{account}|{datetime}|{instrument}|{}|expiration",
            quantity.normalize()
        )
        .as_bytes(),
    );

    let mut record = TransactionRecord {
        account: account.to_string(),
        transaction_id,
        datetime,
        rowtype: RowType::Expiration,
        order_id: None,
        match_id: None,
        trade_id: None,
        instrument,
        multiplier: exp.multiplier,
        effect: Some(Effect::Closing),
        instruction: None,
        quantity,
        price: Decimal::ZERO,
        cost: Decimal::ZERO,
        commissions: Decimal::ZERO,
        fees: commissions_fees,
        description: Some(description.to_string()),
    };
    record.recompute_cost();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 4, 16)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn trd_row(balance: Decimal) -> CashBalanceRow {
        CashBalanceRow {
            account: "x1234".into(),
            datetime: at(10, 30),
            type_code: "TRD".into(),
            description: "SOLD -1 SPX 100 16 APR 21 4200 CALL @2.50".into(),
            commissions_fees: dec!(-0.65),
            amount: dec!(250.00),
            balance,
        }
    }

    #[test]
    fn trade_rows_become_statement_rows() {
        let (batch, issues) =
            normalize_cash_balance(&[trd_row(dec!(10000))], &ReconcileConfig::default());
        assert!(issues.is_empty());
        assert_eq!(batch.trades.len(), 1);
        let row = &batch.trades[0];
        assert_eq!(row.strategy, "SINGLE");
        assert_eq!(row.underlying, "SPX");
        assert_eq!(row.commissions, dec!(-0.65));
        // First row has no previous balance to back fees out of.
        assert_eq!(row.fees, dec!(0));
    }

    #[test]
    fn misc_fees_are_backed_out_of_balance_deltas() {
        let mut first = trd_row(dec!(10000));
        first.datetime = at(9, 40);
        let mut second = trd_row(dec!(10249.05));
        // Delta 249.05 = amount 250.00 + commissions -0.65 + fees -0.30.
        let (batch, issues) =
            normalize_cash_balance(&[first, second], &ReconcileConfig::default());
        assert!(issues.is_empty());
        assert_eq!(batch.trades[1].fees, dec!(-0.30));
    }

    #[test]
    fn expiration_removal_synthesizes_a_record() {
        let row = CashBalanceRow {
            account: "x1234".into(),
            datetime: at(16, 0),
            type_code: "RAD".into(),
            description: "REMOVAL OF OPTION DUE TO EXPIRATION -1 SPY 100 16 APR 21 350 PUT".into(),
            commissions_fees: dec!(0),
            amount: dec!(0),
            balance: dec!(10000),
        };
        let (batch, issues) = normalize_cash_balance(&[row], &ReconcileConfig::default());
        assert!(issues.is_empty());
        assert_eq!(batch.expirations.len(), 1);
        let rec = &batch.expirations[0];
        assert_eq!(rec.rowtype, RowType::Expiration);
        assert_eq!(rec.instruction, None);
        assert_eq!(rec.quantity, dec!(1));
        assert_eq!(rec.instrument.to_string(), "SPY_210416_P350");
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn nontrade_rows_pass_through() {
        let row = CashBalanceRow {
            account: "x1234".into(),
            datetime: at(12, 0),
            type_code: "DOI".into(),
            description: "ORDINARY DIVIDEND~SPY".into(),
            commissions_fees: dec!(0),
            amount: dec!(13.20),
            balance: dec!(10013.20),
        };
        let (batch, issues) = normalize_cash_balance(&[row], &ReconcileConfig::default());
        assert!(issues.is_empty());
        assert!(batch.trades.is_empty());
        assert_eq!(batch.nontrade.len(), 1);
        assert_eq!(batch.nontrade[0].type_code, "DOI");
    }

    #[test]
    fn garbled_trade_description_is_collected_not_fatal() {
        let mut bad = trd_row(dec!(10000));
        bad.description = "???".into();
        let good = {
            let mut r = trd_row(dec!(10249.05));
            r.datetime = at(11, 0);
            r
        };
        let (batch, issues) = normalize_cash_balance(&[bad, good], &ReconcileConfig::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(batch.trades.len(), 1);
    }
}
