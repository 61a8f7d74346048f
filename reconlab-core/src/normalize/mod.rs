//! Source normalization — one mapping per source kind.
//!
//! Each mapping takes a source-specific raw row and produces the canonical
//! record shape with every field the row can supply populated, and nothing
//! guessed. Symbol decomposition is delegated to `symbology`; transaction
//! ids come from `identity` when the source supplies none.

pub mod api_feed;
pub mod cash_balance;
pub mod description;
pub mod futures_statements;
pub mod numbers;
pub mod trade_history;

use crate::domain::{SourceKind, TransactionRecord};
use crate::symbology::SymbolError;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use api_feed::normalize_api_feed;
pub use cash_balance::normalize_cash_balance;
pub use futures_statements::normalize_futures_statements;
pub use trade_history::normalize_trade_history;

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("invalid price '{0}'")]
    BadPrice(String),

    #[error("unrecognized description: '{0}'")]
    BadDescription(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unsupported row: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

/// A trading row from a balance statement, normalized and kept around for
/// the fee joiner. These rows aggregate the legs of a multi-leg order into
/// one line and carry the fees the trade history lacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub source: SourceKind,
    pub account: String,
    pub datetime: NaiveDateTime,
    /// Combo strategy named in the description ("VERTICAL", "SINGLE", …).
    pub strategy: String,
    pub underlying: String,
    pub quantity: Decimal,
    pub commissions: Decimal,
    pub fees: Decimal,
    /// Net cash amount of the whole aggregate row.
    pub amount: Decimal,
    pub description: String,
}

/// A statement row with no trade content, passed through to the caller
/// (deposits, sweeps, journal entries, dividends — handled elsewhere).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonTradeRow {
    pub source: SourceKind,
    pub account: String,
    pub datetime: NaiveDateTime,
    pub type_code: String,
    pub description: String,
    pub amount: Decimal,
}

/// Output of normalizing one statement sub-table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementBatch {
    pub trades: Vec<StatementRow>,
    pub expirations: Vec<TransactionRecord>,
    pub nontrade: Vec<NonTradeRow>,
}
