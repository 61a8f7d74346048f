//! Domain types for the canonical transaction log.

pub mod ids;
pub mod instrument;
pub mod raw;
pub mod transaction;

pub use ids::{OrderId, TransactionId};
pub use instrument::{Instrument, InstrumentKind, OptionSide};
pub use raw::{
    ApiFeedRow, CashBalanceRow, FuturesStatementRow, RawRecord, SourceKind, TradeHistoryRow,
};
pub use transaction::{Effect, Instruction, RecordError, RowType, TransactionRecord};

/// Account identifier type alias.
pub type Account = String;
