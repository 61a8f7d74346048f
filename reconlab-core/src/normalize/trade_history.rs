//! Trade-history mapping.
//!
//! The trade-history sub-table has the best execution detail — per-leg
//! rows, exact times, position effects — and no fee data at all. Fees are
//! joined in later from the balance statements.

use crate::config::ReconcileConfig;
use crate::domain::{
    Effect, Instruction, Instrument, OptionSide, OrderId, RowType, TradeHistoryRow,
    TransactionRecord,
};
use crate::identity;
use crate::symbology::{multiplier_for, split_futures_code, split_option_series_code};
use rust_decimal::Decimal;

use super::description::parse_dmy;
use super::numbers::parse_price;
use super::NormalizeError;

pub fn normalize_trade_history(
    row: &TradeHistoryRow,
    config: &ReconcileConfig,
) -> Result<TransactionRecord, NormalizeError> {
    // The symbol column repeats the multiplier and month in words
    // ("/CLK21 1/1000 MAY 21"); only the first token identifies anything.
    let symbol = row.symbol.split_whitespace().next().unwrap_or("");
    let symbol = config.rename(symbol);

    let instrument = decode_instrument(row, symbol)?;
    let multiplier = multiplier_for(&instrument, &config.multiplier_overrides)?;

    let instruction = match row.side.as_str() {
        "BOT" => Instruction::Buy,
        "SOLD" => Instruction::Sell,
        other => return Err(NormalizeError::Unsupported(format!("side '{other}'"))),
    };
    let effect = match row.pos_effect.as_str() {
        "TO OPEN" => Some(Effect::Opening),
        "TO CLOSE" => Some(Effect::Closing),
        _ => None,
    };

    let quantity = row.quantity.abs();
    if quantity.is_zero() {
        return Err(NormalizeError::MissingField("quantity"));
    }
    let price = parse_price(&row.price, row.type_code == "FUTURE")?;

    let transaction_id = identity::resolve_transaction_id(
        None,
        &row.account,
        row.exec_time,
        &instrument,
        quantity,
        price,
        Some(instruction),
    );

    let mut record = TransactionRecord {
        account: row.account.clone(),
        transaction_id,
        datetime: row.exec_time,
        rowtype: RowType::Trade,
        order_id: Some(OrderId(row.order_id)),
        match_id: None,
        trade_id: None,
        instrument,
        multiplier,
        effect,
        instruction: Some(instruction),
        quantity,
        price,
        cost: Decimal::ZERO,
        commissions: Decimal::ZERO,
        fees: Decimal::ZERO,
        description: None,
    };
    record.recompute_cost();
    Ok(record)
}

fn decode_instrument(row: &TradeHistoryRow, symbol: &str) -> Result<Instrument, NormalizeError> {
    match row.type_code.as_str() {
        "STOCK" | "ETF" => Ok(Instrument::Equity {
            underlying: symbol.to_string(),
        }),
        "FUTURE" => {
            let (underlying, calendar) = split_futures_code(symbol)?;
            Ok(Instrument::Future {
                underlying,
                calendar,
            })
        }
        "CALL" | "PUT" => {
            let side = if row.type_code == "CALL" {
                OptionSide::Call
            } else {
                OptionSide::Put
            };
            let strike = row.strike.ok_or(NormalizeError::MissingField("strike"))?;
            if row.exp.starts_with('/') {
                // Option on a future: the exp column carries the option
                // series code, not a date.
                let (underlying, calendar) = split_futures_code(symbol)?;
                let (optcontract, optcalendar) = split_option_series_code(&row.exp)?;
                Ok(Instrument::FutureOption {
                    underlying,
                    calendar,
                    optcontract: Some(optcontract),
                    optcalendar: Some(optcalendar),
                    expiration: None,
                    side,
                    strike,
                })
            } else {
                let expiration = parse_dmy(&row.exp.to_uppercase())
                    .ok_or_else(|| NormalizeError::BadDescription(row.exp.clone()))?;
                Ok(Instrument::EquityOption {
                    underlying: symbol.to_string(),
                    expiration,
                    side,
                    strike,
                })
            }
        }
        other => Err(NormalizeError::Unsupported(format!("type code '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstrumentKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn row() -> TradeHistoryRow {
        TradeHistoryRow {
            account: "x1234".into(),
            exec_time: NaiveDate::from_ymd_opt(2021, 4, 16)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            spread: "SINGLE".into(),
            side: "SOLD".into(),
            quantity: dec!(-1),
            pos_effect: "TO OPEN".into(),
            symbol: "SPX".into(),
            exp: "16 APR 21".into(),
            strike: Some(dec!(4200)),
            type_code: "CALL".into(),
            price: "2.50".into(),
            order_id: 1001,
        }
    }

    #[test]
    fn equity_option_row() {
        let rec = normalize_trade_history(&row(), &ReconcileConfig::default()).unwrap();
        assert_eq!(rec.instrument.kind(), InstrumentKind::EquityOption);
        assert_eq!(rec.instrument.to_string(), "SPX_210416_C4200");
        assert_eq!(rec.multiplier, dec!(100));
        assert_eq!(rec.instruction, Some(Instruction::Sell));
        assert_eq!(rec.effect, Some(Effect::Opening));
        assert_eq!(rec.quantity, dec!(1));
        // Sell of 1 × 2.50 × 100, no fees joined yet.
        assert_eq!(rec.cost, dec!(250));
        assert!(rec.transaction_id.as_str().starts_with('^'));
    }

    #[test]
    fn futures_row_parses_bond_quotes() {
        let mut r = row();
        r.symbol = "/ZNM21".into();
        r.exp = String::new();
        r.strike = None;
        r.type_code = "FUTURE".into();
        r.side = "BOT".into();
        r.quantity = dec!(1);
        r.price = "131'16".into();
        let rec = normalize_trade_history(&r, &ReconcileConfig::default()).unwrap();
        assert_eq!(rec.instrument.dated_underlying(), "/ZNM21");
        assert_eq!(rec.price, dec!(131.5));
        assert_eq!(rec.multiplier, dec!(1000));
        // Futures outrights settle through margin.
        assert_eq!(rec.cost, dec!(0));
    }

    #[test]
    fn futures_option_row() {
        let mut r = row();
        r.symbol = "/CLM21".into();
        r.exp = "/LOMK21".into();
        r.strike = Some(dec!(42.5));
        r.type_code = "CALL".into();
        let rec = normalize_trade_history(&r, &ReconcileConfig::default()).unwrap();
        assert_eq!(rec.instrument.to_string(), "/CLM21_LOMK21_C42.5");
        assert_eq!(rec.instrument.expcode().as_deref(), Some("LOMK21"));
        assert_eq!(rec.multiplier, dec!(1000));
    }

    #[test]
    fn symbol_renames_apply_before_decoding() {
        let mut config = ReconcileConfig::default();
        config
            .symbol_renames
            .insert("CHPT".into(), "SBE".into());
        let mut r = row();
        r.symbol = "CHPT".into();
        r.exp = String::new();
        r.strike = None;
        r.type_code = "STOCK".into();
        r.spread = "STOCK".into();
        let rec = normalize_trade_history(&r, &config).unwrap();
        assert_eq!(rec.instrument.underlying(), "SBE");
    }

    #[test]
    fn unknown_futures_root_is_fatal_for_the_row() {
        let mut r = row();
        r.symbol = "/XXK21".into();
        r.exp = String::new();
        r.strike = None;
        r.type_code = "FUTURE".into();
        let err = normalize_trade_history(&r, &ReconcileConfig::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::Symbol(_)));
    }

    #[test]
    fn unknown_type_code_is_rejected() {
        let mut r = row();
        r.type_code = "FOREX".into();
        assert!(matches!(
            normalize_trade_history(&r, &ReconcileConfig::default()),
            Err(NormalizeError::Unsupported(_))
        ));
    }
}
