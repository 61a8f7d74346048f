//! Instrument symbology: symbol grammars and contract-size lookup.

pub mod multipliers;
pub mod parse;

pub use multipliers::{builtin_multiplier, multiplier_for, option_contract_size};
pub use parse::{
    parse_symbol, split_futures_code, split_option_series_code, SymbolError, MONTH_CODES,
};
