//! Contract-size multipliers.
//!
//! Silent defaults would corrupt every downstream cost derivation, so
//! unknown futures roots are an error, not a 1.

use crate::domain::{Instrument, InstrumentKind};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::SymbolError;

/// Standard equity option contract size.
pub fn option_contract_size() -> Decimal {
    Decimal::ONE_HUNDRED
}

/// Built-in contract sizes, keyed by futures root.
///
/// Index roots (SPX, NDX, …) appear without the slash: their options clear
/// like equity options but the roots also show up in statement descriptions.
pub fn builtin_multiplier(root: &str) -> Option<Decimal> {
    let m: i64 = match root {
        // Indices: S&P 500
        "/ES" => 50,
        "/MES" => 5,
        "SPX" => 100,

        // Indices: Nasdaq 100
        "/NQ" => 20,
        "/MNQ" => 2,
        "NDX" => 100,

        // Indices: Russell 2000
        "/RTY" => 50,
        "/M2K" => 5,
        "RUT" => 100,

        // Indices: Dow Jones
        "/YM" => 5,
        "/MYM" => return Some(Decimal::new(5, 1)),
        "DJI" => 100,

        // FX
        "/6E" => 125_000,
        "/6J" => 12_500_000,
        "/6A" => 100_000,
        "/6C" => 100_000,

        // Energy
        "/CL" => 1000,
        "/NG" => 10_000,

        // Metals
        "/GC" => 100,
        "/SI" => 5000,
        "/HG" => 25_000,

        // Rates
        "/ZQ" => 4167,
        "/GE" => 2500,
        "/ZT" => 2000,
        "/ZF" => 1000,
        "/ZN" => 1000,
        "/ZB" => 1000,

        // Agricultural
        "/ZC" => 50,
        "/ZS" => 50,
        "/ZW" => 50,

        // Livestock
        "/HE" => 400,
        "/LE" => 400,

        _ => return None,
    };
    Some(Decimal::from(m))
}

/// Resolve the multiplier for a decoded instrument. `overrides` come from
/// configuration and shadow the built-in table.
pub fn multiplier_for(
    instrument: &Instrument,
    overrides: &BTreeMap<String, Decimal>,
) -> Result<Decimal, SymbolError> {
    match instrument.kind() {
        InstrumentKind::Equity => Ok(Decimal::ONE),
        InstrumentKind::EquityOption => Ok(option_contract_size()),
        InstrumentKind::Future | InstrumentKind::FutureOption => {
            let root = instrument.underlying();
            overrides
                .get(root)
                .copied()
                .or_else(|| builtin_multiplier(root))
                .ok_or_else(|| SymbolError::UnknownMultiplier {
                    kind: instrument.kind(),
                    root: root.to_string(),
                })
        }
    }
}
