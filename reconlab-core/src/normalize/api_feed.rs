//! API transaction-feed mapping.
//!
//! The feed is the late authority: settlement-final values, per-leg fee
//! breakdowns, and real transaction ids. It supplies instrument fields
//! already broken out, so no symbol grammar is involved. It knows nothing
//! about futures.

use crate::config::ReconcileConfig;
use crate::domain::{ApiFeedRow, Instrument, RowType, TransactionRecord};
use crate::identity;
use crate::symbology::multiplier_for;
use rust_decimal::Decimal;

use super::NormalizeError;

/// Map one feed row. `Ok(None)` means the row is non-trade content and is
/// not this engine's to handle.
pub fn normalize_api_feed(
    row: &ApiFeedRow,
    config: &ReconcileConfig,
) -> Result<Option<TransactionRecord>, NormalizeError> {
    let rowtype = match row.type_code.as_str() {
        "TRADE" => RowType::Trade,
        "RECEIVE_AND_DELIVER" => RowType::Expiration,
        _ => return Ok(None),
    };

    let underlying = config.rename(&row.underlying).to_string();
    let instrument = match (row.putcall, row.strike, row.expiration) {
        (Some(side), Some(strike), Some(expiration)) => Instrument::EquityOption {
            underlying,
            expiration,
            side,
            strike,
        },
        (None, None, None) => Instrument::Equity { underlying },
        _ => return Err(NormalizeError::MissingField("putcall/strike/expiration")),
    };
    let multiplier = multiplier_for(&instrument, &config.multiplier_overrides)?;

    // Expirations carry no instruction on the canonical record.
    let instruction = match rowtype {
        RowType::Trade => Some(
            row.instruction
                .ok_or(NormalizeError::MissingField("instruction"))?,
        ),
        _ => None,
    };

    if row.quantity <= Decimal::ZERO {
        return Err(NormalizeError::MissingField("quantity"));
    }

    let transaction_id = identity::resolve_transaction_id(
        Some(row.transaction_id.as_str()),
        &row.account,
        row.datetime,
        &instrument,
        row.quantity,
        row.price,
        instruction,
    );

    let mut record = TransactionRecord {
        account: row.account.clone(),
        transaction_id,
        datetime: row.datetime,
        rowtype,
        order_id: row.order_id.map(crate::domain::OrderId),
        match_id: None,
        trade_id: None,
        instrument,
        multiplier,
        effect: row.effect,
        instruction,
        quantity: row.quantity,
        price: row.price,
        cost: Decimal::ZERO,
        commissions: row.commissions,
        fees: row.fees,
        description: if row.description.is_empty() {
            None
        } else {
            Some(row.description.clone())
        },
    };
    record.recompute_cost();
    Ok(Some(record))
}
