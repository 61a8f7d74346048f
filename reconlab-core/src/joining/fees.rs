//! Cross-source fee join.
//!
//! Trade-history rows arrive without fees; balance-statement rows carry the
//! aggregate fee deltas but merge a whole multi-leg order into one line.
//! The join generates candidate statement rows per trade group and requires
//! a unique match — zero or several candidates is a first-class outcome
//! that leaves the group without fees and flags it, never a guess.

use crate::config::ReconcileConfig;
use crate::domain::{RowType, TransactionRecord};
use crate::normalize::StatementRow;
use crate::report::Ambiguity;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Join statement fees onto the trade records.
///
/// Returns the statement rows that were not consumed (they remain ordinary
/// non-trade events) plus the unresolved-join flags.
pub fn join_fees(
    records: &mut [TransactionRecord],
    statements: Vec<StatementRow>,
    config: &ReconcileConfig,
) -> (Vec<StatementRow>, Vec<Ambiguity>) {
    let mut consumed = vec![false; statements.len()];
    let mut ambiguities = Vec::new();

    for (account, datetime, leg_indices) in trade_groups(records) {
        let expected_cash: Decimal = leg_indices.iter().map(|&i| records[i].gross_cost()).sum();
        let total_quantity: Decimal = leg_indices.iter().map(|&i| records[i].quantity).sum();
        let all_futures_outright = leg_indices
            .iter()
            .all(|&i| matches!(records[i].instrument, crate::domain::Instrument::Future { .. }));

        let window = config.fee_join_window();
        let tolerance = config.fee_join_notional_tolerance;
        let candidates: Vec<usize> = statements
            .iter()
            .enumerate()
            .filter(|(i, s)| {
                if consumed[*i] || s.account != account {
                    return false;
                }
                let dt = (s.datetime - datetime).abs();
                if dt > window {
                    return false;
                }
                if all_futures_outright {
                    // Futures outrights have no cash notional; statement
                    // amounts carry realized P/L instead. Quantity at the
                    // exact execution time is the discriminator.
                    s.datetime == datetime && s.quantity == total_quantity
                } else {
                    (s.amount - expected_cash).abs() <= tolerance
                }
            })
            .map(|(i, _)| i)
            .collect();

        if candidates.len() != 1 {
            debug!(
                account = %account,
                datetime = %datetime,
                candidates = candidates.len(),
                "fee join unresolved"
            );
            ambiguities.push(Ambiguity::UnresolvedFeeJoin {
                account: account.clone(),
                datetime,
                transaction_ids: leg_indices
                    .iter()
                    .map(|&i| records[i].transaction_id.clone())
                    .collect(),
                candidates: candidates.len(),
            });
            continue;
        }

        let statement_idx = candidates[0];
        consumed[statement_idx] = true;
        let statement = &statements[statement_idx];
        distribute_group(records, &leg_indices, statement);
    }

    let remaining = statements
        .into_iter()
        .zip(consumed)
        .filter_map(|(s, used)| (!used).then_some(s))
        .collect();
    (remaining, ambiguities)
}

/// Group the fee-less trade records into orders: legs share an account, a
/// timestamp, and (after clustering) an order id. Records without an order
/// id stand alone, keyed by their own transaction id. Distinct orders at
/// the same timestamp stay distinct groups.
fn trade_groups(records: &[TransactionRecord]) -> Vec<(String, NaiveDateTime, Vec<usize>)> {
    let mut groups: BTreeMap<(String, NaiveDateTime, String), Vec<usize>> = BTreeMap::new();
    for (idx, rec) in records.iter().enumerate() {
        if rec.rowtype != RowType::Trade || rec.has_fee_data() {
            continue;
        }
        let subkey = match rec.order_id {
            Some(order_id) => format!("order-{order_id}"),
            None => format!("txn-{}", rec.transaction_id),
        };
        groups
            .entry((rec.account.clone(), rec.datetime, subkey))
            .or_default()
            .push(idx);
    }
    groups
        .into_iter()
        .map(|((account, datetime, _), indices)| (account, datetime, indices))
        .collect()
}

/// Spread the statement's commissions and fees across the legs in
/// proportion to each leg's absolute notional. Shares are rounded to cents;
/// the final leg takes the residue so the totals are conserved exactly.
fn distribute_group(records: &mut [TransactionRecord], legs: &[usize], statement: &StatementRow) {
    let weights: Vec<Decimal> = legs.iter().map(|&i| records[i].notional()).collect();
    let commissions = distribute_proportional(statement.commissions, &weights);
    let fees = distribute_proportional(statement.fees, &weights);

    for (slot, &leg_idx) in legs.iter().enumerate() {
        let rec = &mut records[leg_idx];
        rec.commissions = commissions[slot];
        rec.fees = fees[slot];
        rec.description = Some(if legs.len() > 1 {
            format!("{}  [{}/{}]", statement.description, slot + 1, legs.len())
        } else {
            statement.description.clone()
        });
        rec.recompute_cost();
    }
}

/// Proportional split of `total` by `weights`. Shares are rounded to
/// cents; the final slot takes the residue, so the returned shares always
/// sum to `total` exactly.
pub fn distribute_proportional(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    let weight_sum: Decimal = weights.iter().sum();
    if weights.len() == 1 || weight_sum.is_zero() {
        // Degenerate weights: everything on the first leg.
        let mut out = vec![Decimal::ZERO; weights.len()];
        if let Some(first) = out.first_mut() {
            *first = total;
        }
        return out;
    }
    let mut out = Vec::with_capacity(weights.len());
    let mut assigned = Decimal::ZERO;
    for (i, weight) in weights.iter().enumerate() {
        let share = if i + 1 == weights.len() {
            total - assigned
        } else {
            (total * weight / weight_sum).round_dp(2)
        };
        assigned += share;
        out.push(share);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Effect, Instruction, Instrument, OptionSide, OrderId, SourceKind, TransactionId,
    };
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 4, 16)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn leg(
        id: &str,
        order_id: i64,
        datetime: NaiveDateTime,
        strike: Decimal,
        quantity: Decimal,
        price: Decimal,
    ) -> TransactionRecord {
        let mut rec = TransactionRecord {
            account: "x1234".into(),
            transaction_id: TransactionId::new(id),
            datetime,
            rowtype: RowType::Trade,
            order_id: Some(OrderId(order_id)),
            match_id: None,
            trade_id: None,
            instrument: Instrument::EquityOption {
                underlying: "SPX".into(),
                expiration: NaiveDate::from_ymd_opt(2021, 4, 16).unwrap(),
                side: OptionSide::Call,
                strike,
            },
            multiplier: dec!(100),
            effect: Some(Effect::Opening),
            instruction: Some(Instruction::Buy),
            quantity,
            price,
            cost: Decimal::ZERO,
            commissions: Decimal::ZERO,
            fees: Decimal::ZERO,
            description: None,
        };
        rec.recompute_cost();
        rec
    }

    fn statement(datetime: NaiveDateTime, amount: Decimal, fees: Decimal) -> StatementRow {
        StatementRow {
            source: SourceKind::CashBalance,
            account: "x1234".into(),
            datetime,
            strategy: "VERTICAL".into(),
            underlying: "SPX".into(),
            quantity: dec!(1),
            commissions: dec!(0),
            fees,
            amount,
            description: "BOT +1 VERTICAL SPX 100 16 APR 21 4200/4210 CALL @7.50".into(),
        }
    }

    #[test]
    fn two_legs_split_fees_proportionally_to_notional() {
        // Leg notionals 250 and 500; statement carries the combined cash
        // outflow of -750 and a 1.30 fee.
        let mut records = vec![
            leg("^a", 1001, at(10, 30), dec!(4200), dec!(1), dec!(2.50)),
            leg("^b", 1001, at(10, 30), dec!(4210), dec!(1), dec!(5.00)),
        ];
        let statements = vec![statement(at(10, 30), dec!(-750.00), dec!(-1.30))];

        let (remaining, ambiguities) =
            join_fees(&mut records, statements, &ReconcileConfig::default());
        assert!(ambiguities.is_empty());
        assert!(remaining.is_empty(), "the statement row must be consumed");

        assert_eq!(records[0].fees, dec!(-0.43));
        assert_eq!(records[1].fees, dec!(-0.87));
        // Conservation, exactly.
        assert_eq!(records[0].fees + records[1].fees, dec!(-1.30));
        assert!(records[0]
            .description
            .as_deref()
            .unwrap()
            .ends_with("[1/2]"));
    }

    #[test]
    fn zero_candidates_is_flagged_not_guessed() {
        let mut records = vec![leg("^a", 1001, at(10, 30), dec!(4200), dec!(1), dec!(2.50))];
        // Amount off by far more than the tolerance.
        let statements = vec![statement(at(10, 30), dec!(-999.00), dec!(-1.30))];

        let (remaining, ambiguities) =
            join_fees(&mut records, statements, &ReconcileConfig::default());
        assert_eq!(remaining.len(), 1);
        assert_eq!(ambiguities.len(), 1);
        assert!(matches!(
            &ambiguities[0],
            Ambiguity::UnresolvedFeeJoin { candidates: 0, .. }
        ));
        assert_eq!(records[0].fees, dec!(0));
    }

    #[test]
    fn multiple_candidates_are_flagged_not_guessed() {
        let mut records = vec![leg("^a", 1001, at(10, 30), dec!(4200), dec!(1), dec!(2.50))];
        let statements = vec![
            statement(at(10, 30), dec!(-250.00), dec!(-1.30)),
            statement(at(11, 0), dec!(-250.00), dec!(-0.70)),
        ];

        let (remaining, ambiguities) =
            join_fees(&mut records, statements, &ReconcileConfig::default());
        assert_eq!(remaining.len(), 2);
        assert!(matches!(
            &ambiguities[0],
            Ambiguity::UnresolvedFeeJoin { candidates: 2, .. }
        ));
    }

    #[test]
    fn single_leg_takes_the_whole_fee() {
        let mut records = vec![leg("^a", 1001, at(10, 30), dec!(4200), dec!(1), dec!(2.50))];
        let statements = vec![statement(at(10, 30), dec!(-250.00), dec!(-0.65))];

        let (remaining, ambiguities) =
            join_fees(&mut records, statements, &ReconcileConfig::default());
        assert!(remaining.is_empty());
        assert!(ambiguities.is_empty());
        assert_eq!(records[0].fees, dec!(-0.65));
        // Cost folds the joined fees in.
        assert_eq!(records[0].cost, dec!(-250.65));
    }

    #[test]
    fn different_accounts_never_match() {
        let mut records = vec![leg("^a", 1001, at(10, 30), dec!(4200), dec!(1), dec!(2.50))];
        let mut s = statement(at(10, 30), dec!(-250.00), dec!(-0.65));
        s.account = "other".into();

        let (remaining, ambiguities) = join_fees(&mut records, vec![s], &ReconcileConfig::default());
        assert_eq!(remaining.len(), 1);
        assert_eq!(ambiguities.len(), 1);
    }

    #[test]
    fn distribution_conserves_total_under_uneven_weights() {
        let shares = distribute_proportional(dec!(-1.00), &[dec!(1), dec!(1), dec!(1)]);
        assert_eq!(shares.iter().sum::<Decimal>(), dec!(-1.00));
        assert_eq!(shares, vec![dec!(-0.33), dec!(-0.33), dec!(-0.34)]);
    }
}
