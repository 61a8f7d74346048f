//! Property tests for the reconciliation invariants.
//!
//! Uses proptest to verify:
//! 1. Identity determinism — same defining fields, same id
//! 2. Upsert idempotence — re-applying a record never changes the store
//! 3. Fee conservation — proportional distribution sums to the total
//! 4. Clustering — within-delta ids group, wider gaps report

use chrono::NaiveDate;
use proptest::prelude::*;
use reconlab_core::domain::{
    Effect, Instruction, Instrument, OrderId, RowType, TransactionRecord,
};
use reconlab_core::identity::{cluster_order_ids, resolve_transaction_id};
use reconlab_core::joining::distribute_proportional;
use reconlab_core::LedgerStore;
use rust_decimal::Decimal;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_account() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{3,7}"
}

fn arb_cents() -> impl Strategy<Value = Decimal> {
    // Two-decimal amounts in ±10000.00, never zero.
    (-1_000_000i64..1_000_000i64)
        .prop_filter("nonzero", |c| *c != 0)
        .prop_map(|c| Decimal::new(c, 2))
}

fn arb_positive_cents() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2))
}

fn arb_record() -> impl Strategy<Value = TransactionRecord> {
    (
        arb_account(),
        0u32..24,
        0u32..60,
        arb_positive_cents(),
        arb_positive_cents(),
        prop::bool::ANY,
    )
        .prop_map(|(account, hour, minute, quantity, price, is_buy)| {
            let datetime = NaiveDate::from_ymd_opt(2021, 4, 16)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap();
            let instrument = Instrument::Equity {
                underlying: "EWW".into(),
            };
            let instruction = if is_buy {
                Instruction::Buy
            } else {
                Instruction::Sell
            };
            let transaction_id = resolve_transaction_id(
                None,
                &account,
                datetime,
                &instrument,
                quantity,
                price,
                Some(instruction),
            );
            let mut rec = TransactionRecord {
                account,
                transaction_id,
                datetime,
                rowtype: RowType::Trade,
                order_id: Some(OrderId(1)),
                match_id: None,
                trade_id: None,
                instrument,
                multiplier: Decimal::ONE,
                effect: Some(Effect::Opening),
                instruction: Some(instruction),
                quantity,
                price,
                cost: Decimal::ZERO,
                commissions: Decimal::ZERO,
                fees: Decimal::ZERO,
                description: None,
            };
            rec.recompute_cost();
            rec
        })
}

// ── 1. Identity determinism ──────────────────────────────────────────

proptest! {
    #[test]
    fn same_fields_same_id(
        account in arb_account(),
        quantity in arb_positive_cents(),
        price in arb_cents(),
    ) {
        let datetime = NaiveDate::from_ymd_opt(2021, 4, 16)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let instrument = Instrument::Equity { underlying: "SPY".into() };
        let make = || resolve_transaction_id(
            None, &account, datetime, &instrument, quantity, price, Some(Instruction::Buy),
        );
        prop_assert_eq!(make(), make());
    }

    #[test]
    fn different_price_different_id(
        account in arb_account(),
        quantity in arb_positive_cents(),
        price in arb_positive_cents(),
    ) {
        let datetime = NaiveDate::from_ymd_opt(2021, 4, 16)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let instrument = Instrument::Equity { underlying: "SPY".into() };
        let id1 = resolve_transaction_id(
            None, &account, datetime, &instrument, quantity, price, Some(Instruction::Buy),
        );
        let id2 = resolve_transaction_id(
            None, &account, datetime, &instrument, quantity, price + Decimal::ONE,
            Some(Instruction::Buy),
        );
        prop_assert_ne!(id1, id2);
    }
}

// ── 2. Upsert idempotence ────────────────────────────────────────────

proptest! {
    #[test]
    fn upsert_twice_is_once(rec in arb_record()) {
        let mut store = LedgerStore::new();
        store.upsert(rec.clone());
        let first = store.to_json().unwrap();

        store.upsert(rec);
        prop_assert_eq!(store.len(), 1);
        prop_assert_eq!(store.to_json().unwrap(), first);
    }

    #[test]
    fn reapplying_a_record_set_changes_nothing(records in prop::collection::vec(arb_record(), 1..8)) {
        let mut store = LedgerStore::new();
        for rec in &records {
            store.upsert(rec.clone());
        }
        let first = store.to_json().unwrap();

        for rec in &records {
            store.upsert(rec.clone());
        }
        prop_assert_eq!(store.to_json().unwrap(), first);
    }
}

// ── 3. Fee conservation ──────────────────────────────────────────────

proptest! {
    #[test]
    fn distribution_sums_to_total(
        total_cents in -100_000i64..100_000,
        weights in prop::collection::vec(1i64..1_000_000, 1..6),
    ) {
        let total = Decimal::new(total_cents, 2);
        let weights: Vec<Decimal> = weights.into_iter().map(Decimal::from).collect();
        let shares = distribute_proportional(total, &weights);

        prop_assert_eq!(shares.len(), weights.len());
        prop_assert_eq!(shares.iter().sum::<Decimal>(), total);
    }

    #[test]
    fn distribution_is_proportional_within_a_cent(
        total_cents in 1i64..100_000,
        w1 in 1i64..10_000,
        w2 in 1i64..10_000,
    ) {
        let total = Decimal::new(total_cents, 2);
        let weights = [Decimal::from(w1), Decimal::from(w2)];
        let shares = distribute_proportional(total, &weights);

        let exact = total * weights[0] / (weights[0] + weights[1]);
        prop_assert!((shares[0] - exact).abs() <= Decimal::new(1, 2));
    }
}

// ── 4. Clustering ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn within_delta_groups_to_the_smallest_id(
        base in 1i64..1_000_000,
        gap in 1i64..5,
    ) {
        let mut records = vec![clustered_pair(base), clustered_pair(base + gap)];
        let ambiguities = cluster_order_ids(&mut records, 5);
        prop_assert!(ambiguities.is_empty());
        prop_assert_eq!(records[0].order_id, Some(OrderId(base)));
        prop_assert_eq!(records[1].order_id, Some(OrderId(base)));
    }

    #[test]
    fn beyond_delta_reports_and_leaves_ids(
        base in 1i64..1_000_000,
        gap in 6i64..2_000,
    ) {
        let mut records = vec![clustered_pair(base), clustered_pair(base + gap)];
        let ambiguities = cluster_order_ids(&mut records, 5);
        prop_assert_eq!(ambiguities.len(), 1);
        prop_assert_eq!(records[0].order_id, Some(OrderId(base)));
        prop_assert_eq!(records[1].order_id, Some(OrderId(base + gap)));
    }
}

fn clustered_pair(order_id: i64) -> TransactionRecord {
    let datetime = NaiveDate::from_ymd_opt(2021, 4, 16)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    let instrument = Instrument::Equity {
        underlying: "EWW".into(),
    };
    let transaction_id = resolve_transaction_id(
        None,
        "x1",
        datetime,
        &instrument,
        Decimal::ONE,
        Decimal::from(order_id),
        Some(Instruction::Buy),
    );
    TransactionRecord {
        account: "x1".into(),
        transaction_id,
        datetime,
        rowtype: RowType::Trade,
        order_id: Some(OrderId(order_id)),
        match_id: None,
        trade_id: None,
        instrument,
        multiplier: Decimal::ONE,
        effect: Some(Effect::Opening),
        instruction: Some(Instruction::Buy),
        quantity: Decimal::ONE,
        price: Decimal::TEN,
        cost: Decimal::ZERO,
        commissions: Decimal::ZERO,
        fees: Decimal::ZERO,
        description: None,
    }
}
