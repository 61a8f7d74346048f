//! TransactionRecord — the canonical unit of the reconciled log.

use super::ids::{OrderId, TransactionId};
use super::instrument::Instrument;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Row kind. `Mark` is never produced by this engine; it is reserved so a
/// downstream position monitor can interleave mark-to-market rows without a
/// schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowType {
    Trade,
    Expiration,
    Mark,
}

/// Whether the transaction opens or closes a position. Unknown for futures
/// until a downstream pass infers it from starting inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Opening,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Buy,
    Sell,
}

/// One reconciled economic event.
///
/// Created by the normalizer from a single raw row (or synthesized for an
/// expiration). Mutated only by the fee joiner (fills `commissions`/`fees`/
/// `description`) and the late-feed merger (overwrites non-authoritative
/// fields). Never deleted once committed to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub account: String,
    pub transaction_id: TransactionId,
    pub datetime: NaiveDateTime,
    pub rowtype: RowType,

    /// Links transactions issued as one order (e.g. the legs of a spread).
    pub order_id: Option<OrderId>,
    /// Links a closing transaction to the opening(s) it closes. Assigned by
    /// a downstream matcher; always `None` from this engine.
    pub match_id: Option<String>,
    /// Strategy/chain grouping over time. Assigned downstream.
    pub trade_id: Option<String>,

    pub instrument: Instrument,
    /// Contract size. Derivable from the instrument kind and underlying
    /// root, but carried so consumers never need the lookup table.
    pub multiplier: Decimal,

    pub effect: Option<Effect>,
    /// Unset for expirations.
    pub instruction: Option<Instruction>,

    pub quantity: Decimal,
    /// Per-contract price.
    pub price: Decimal,
    /// quantity × price × multiplier, signed by instruction, net of
    /// commissions and fees.
    pub cost: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,

    pub description: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("expiration rows must not carry an instruction")]
    InstructionOnExpiration,

    #[error("trade rows must carry an instruction")]
    MissingInstruction,

    #[error("empty account")]
    EmptyAccount,

    #[error("empty transaction id")]
    EmptyTransactionId,
}

impl TransactionRecord {
    /// Unsigned notional value of the event: quantity × price × multiplier.
    pub fn notional(&self) -> Decimal {
        (self.quantity * self.price * self.multiplier).abs()
    }

    /// Signed cash effect of the traded amount, before commissions/fees.
    /// Buys consume cash. Futures outrights settle through margin, not
    /// cash, so their gross cost is zero.
    pub fn gross_cost(&self) -> Decimal {
        if matches!(self.instrument, Instrument::Future { .. }) {
            return Decimal::ZERO;
        }
        let sign = match self.instruction {
            Some(Instruction::Buy) => Decimal::NEGATIVE_ONE,
            Some(Instruction::Sell) => Decimal::ONE,
            None => return Decimal::ZERO,
        };
        sign * self.quantity * self.price * self.multiplier
    }

    /// Recompute `cost` from the current price/quantity/fee fields. Called
    /// after the fee joiner or late-feed merger touches the record.
    pub fn recompute_cost(&mut self) {
        self.cost = self.gross_cost() + self.commissions + self.fees;
    }

    /// Whether fee data has been joined in yet.
    pub fn has_fee_data(&self) -> bool {
        !self.commissions.is_zero() || !self.fees.is_zero()
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.account.is_empty() {
            return Err(RecordError::EmptyAccount);
        }
        if self.transaction_id.as_str().is_empty() {
            return Err(RecordError::EmptyTransactionId);
        }
        if self.quantity <= Decimal::ZERO {
            return Err(RecordError::NonPositiveQuantity(self.quantity));
        }
        match self.rowtype {
            RowType::Expiration if self.instruction.is_some() => {
                Err(RecordError::InstructionOnExpiration)
            }
            RowType::Trade if self.instruction.is_none() => Err(RecordError::MissingInstruction),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::OptionSide;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_trade() -> TransactionRecord {
        TransactionRecord {
            account: "x1234".into(),
            transaction_id: TransactionId::new("^abc123def456"),
            datetime: NaiveDate::from_ymd_opt(2021, 4, 16)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            rowtype: RowType::Trade,
            order_id: Some(OrderId(1001)),
            match_id: None,
            trade_id: None,
            instrument: Instrument::EquityOption {
                underlying: "SPX".into(),
                expiration: NaiveDate::from_ymd_opt(2021, 4, 16).unwrap(),
                side: OptionSide::Call,
                strike: dec!(4200),
            },
            multiplier: dec!(100),
            effect: Some(Effect::Opening),
            instruction: Some(Instruction::Buy),
            quantity: dec!(1),
            price: dec!(2.50),
            cost: Decimal::ZERO,
            commissions: Decimal::ZERO,
            fees: Decimal::ZERO,
            description: None,
        }
    }

    #[test]
    fn cost_is_signed_and_net_of_fees() {
        let mut rec = sample_trade();
        rec.commissions = dec!(-0.65);
        rec.fees = dec!(-0.13);
        rec.recompute_cost();
        // Buy of 1 × 2.50 × 100 consumes 250, plus fee drag.
        assert_eq!(rec.cost, dec!(-250.78));

        rec.instruction = Some(Instruction::Sell);
        rec.recompute_cost();
        assert_eq!(rec.cost, dec!(249.22));
    }

    #[test]
    fn futures_outrights_have_zero_gross_cost() {
        let mut rec = sample_trade();
        rec.instrument = Instrument::Future {
            underlying: "/CL".into(),
            calendar: "K21".into(),
        };
        rec.multiplier = dec!(1000);
        assert_eq!(rec.gross_cost(), Decimal::ZERO);
    }

    #[test]
    fn validate_rejects_instruction_on_expiration() {
        let mut rec = sample_trade();
        rec.rowtype = RowType::Expiration;
        assert_eq!(rec.validate(), Err(RecordError::InstructionOnExpiration));
        rec.instruction = None;
        assert_eq!(rec.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_nonpositive_quantity() {
        let mut rec = sample_trade();
        rec.quantity = dec!(0);
        assert!(matches!(
            rec.validate(),
            Err(RecordError::NonPositiveQuantity(_))
        ));
    }

    #[test]
    fn serialization_roundtrip() {
        let rec = sample_trade();
        let json = serde_json::to_string(&rec).unwrap();
        let deser: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, deser);
    }
}
