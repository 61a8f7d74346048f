//! Raw row shapes — one tagged variant per source kind.
//!
//! These are the hand-off types from the external format parsers: rows are
//! already split into columns and basic types, but all source-specific codes
//! (type codes, position effects, symbol strings, quoted prices) are kept
//! verbatim for the normalizer to interpret. Adding a source means adding a
//! variant here plus one mapping function in `normalize`, never branching on
//! ad hoc field presence.

use super::instrument::OptionSide;
use super::transaction::{Effect, Instruction};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which upstream source a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    TradeHistory,
    CashBalance,
    FuturesStatements,
    ApiFeed,
}

/// One row from any source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawRecord {
    TradeHistory(TradeHistoryRow),
    CashBalance(CashBalanceRow),
    FuturesStatement(FuturesStatementRow),
    ApiFeed(ApiFeedRow),
}

impl RawRecord {
    pub fn source(&self) -> SourceKind {
        match self {
            RawRecord::TradeHistory(_) => SourceKind::TradeHistory,
            RawRecord::CashBalance(_) => SourceKind::CashBalance,
            RawRecord::FuturesStatement(_) => SourceKind::FuturesStatements,
            RawRecord::ApiFeed(_) => SourceKind::ApiFeed,
        }
    }

    pub fn account(&self) -> &str {
        match self {
            RawRecord::TradeHistory(r) => &r.account,
            RawRecord::CashBalance(r) => &r.account,
            RawRecord::FuturesStatement(r) => &r.account,
            RawRecord::ApiFeed(r) => &r.account,
        }
    }
}

/// Trade-history sub-table of the bulk export. Carries execution detail for
/// every instrument but no fee information whatsoever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeHistoryRow {
    pub account: String,
    pub exec_time: NaiveDateTime,
    /// Spread shape as reported ("STOCK", "SINGLE", "VERTICAL", …).
    pub spread: String,
    /// "BOT" or "SOLD".
    pub side: String,
    /// Signed at the source; negative for sells.
    pub quantity: Decimal,
    /// "TO OPEN" or "TO CLOSE".
    pub pos_effect: String,
    /// Raw symbol column; futures carry the month code (`/CLK21`).
    pub symbol: String,
    /// Expiration column: a date string for equity options, the option
    /// series code (`/LOMK21`) for futures options, empty otherwise.
    pub exp: String,
    pub strike: Option<Decimal>,
    /// "STOCK", "ETF", "FUTURE", "CALL" or "PUT".
    pub type_code: String,
    /// Kept as text: treasury contracts quote in 32nds/64ths (`129'16`).
    pub price: String,
    pub order_id: i64,
}

/// Cash-balance sub-table. Rows merge multi-leg transactions into one line
/// and carry the fees the trade history omits. The export has no misc-fees
/// column; it is backed out from consecutive balances during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashBalanceRow {
    pub account: String,
    pub datetime: NaiveDateTime,
    /// Three-letter code: "TRD", "RAD", "DOI", "EFN", "JRN", …
    pub type_code: String,
    pub description: String,
    pub commissions_fees: Decimal,
    pub amount: Decimal,
    pub balance: Decimal,
}

/// Futures-statements sub-table. Same role as the cash balance for the
/// futures account; the `ref_id` column is present exactly on trading rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesStatementRow {
    pub account: String,
    pub trade_date: NaiveDate,
    pub datetime: NaiveDateTime,
    pub ref_id: Option<i64>,
    pub type_code: String,
    pub description: String,
    pub commissions_fees: Decimal,
    pub misc_fees: Decimal,
    pub amount: Decimal,
    pub balance: Decimal,
}

/// Delayed API transaction feed. Settlement-final, per-leg fee breakdown,
/// proper transaction ids — and blind to futures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFeedRow {
    pub account: String,
    pub transaction_id: String,
    pub order_id: Option<i64>,
    pub datetime: NaiveDateTime,
    /// "TRADE" or "RECEIVE_AND_DELIVER"; anything else is non-trade.
    pub type_code: String,
    pub description: String,
    pub underlying: String,
    pub expiration: Option<NaiveDate>,
    pub putcall: Option<OptionSide>,
    pub strike: Option<Decimal>,
    pub instruction: Option<Instruction>,
    pub effect: Option<Effect>,
    /// Positive.
    pub quantity: Decimal,
    pub price: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
}
