//! Symbol grammars.
//!
//! Four forms are recognized:
//! - equity tickers: `EWW`, `BRK.B`
//! - OCC-style equity option codes: `SPY 210416C00360000` (padded root,
//!   yymmdd, side letter, strike × 1000)
//! - futures codes: `/CLK21` (root, month letter, decade-qualified year)
//! - futures option codes in the normalized form this crate emits:
//!   `/CLM21_LOMK21_C42.5`
//!
//! The kind hint narrows the dispatch when the caller knows what the source
//! claims the row is; a hint that contradicts the grammar is an error.

use crate::domain::{Instrument, InstrumentKind, OptionSide};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SymbolError {
    #[error("unrecognized instrument symbol '{0}'")]
    Unparseable(String),

    #[error("no contract multiplier for {kind:?} root '{root}'")]
    UnknownMultiplier { kind: InstrumentKind, root: String },
}

/// Futures month letters, January through December.
pub const MONTH_CODES: &str = "FGHJKMNQUVXZ";

static EQUITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9]*(?:\.[A-Z])?$").expect("equity grammar"));

static OCC_OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][A-Z0-9]*)\s*(\d{6})([CP])(\d{8})$").expect("OCC option grammar")
});

static FUTURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(/[A-Z0-9]+?)([FGHJKMNQUVXZ]\d{2})$").expect("futures grammar")
});

static FUTURE_OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(/[A-Z0-9]+?)([FGHJKMNQUVXZ]\d{2})_([A-Z0-9]+?)([FGHJKMNQUVXZ]\d{2})_([CP])([0-9.]+)$",
    )
    .expect("futures option grammar")
});

/// Decode a raw symbol string into a structured instrument.
pub fn parse_symbol(raw: &str, hint: Option<InstrumentKind>) -> Result<Instrument, SymbolError> {
    let raw = raw.trim();
    let parsed = match hint {
        Some(InstrumentKind::Equity) => parse_equity(raw),
        Some(InstrumentKind::EquityOption) => parse_occ_option(raw),
        Some(InstrumentKind::Future) => parse_future(raw),
        Some(InstrumentKind::FutureOption) => parse_future_option(raw),
        None => parse_future_option(raw)
            .or_else(|| parse_future(raw))
            .or_else(|| parse_occ_option(raw))
            .or_else(|| parse_equity(raw)),
    };
    parsed.ok_or_else(|| SymbolError::Unparseable(raw.to_string()))
}

/// Split a dated futures code into (root, calendar): `/CLK21` → (`/CL`, `K21`).
pub fn split_futures_code(symbol: &str) -> Result<(String, String), SymbolError> {
    let caps = FUTURE_RE
        .captures(symbol.trim())
        .ok_or_else(|| SymbolError::Unparseable(symbol.to_string()))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

/// Split a futures option series code into (contract, calendar):
/// `/LOMK21` → (`LOM`, `K21`). The leading slash is optional.
pub fn split_option_series_code(code: &str) -> Result<(String, String), SymbolError> {
    static SERIES_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^/?([A-Z0-9]+?)([FGHJKMNQUVXZ]\d{2})$").expect("option series grammar")
    });
    let caps = SERIES_RE
        .captures(code.trim())
        .ok_or_else(|| SymbolError::Unparseable(code.to_string()))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

fn parse_equity(raw: &str) -> Option<Instrument> {
    if !EQUITY_RE.is_match(raw) {
        return None;
    }
    Some(Instrument::Equity {
        underlying: raw.to_string(),
    })
}

fn parse_occ_option(raw: &str) -> Option<Instrument> {
    let caps = OCC_OPTION_RE.captures(raw)?;
    let expiration = NaiveDate::parse_from_str(&caps[2], "%y%m%d").ok()?;
    let side = if &caps[3] == "C" {
        OptionSide::Call
    } else {
        OptionSide::Put
    };
    // OCC strikes are fixed-point with three decimal places.
    let strike = Decimal::new(caps[4].parse::<i64>().ok()?, 3).normalize();
    Some(Instrument::EquityOption {
        underlying: caps[1].to_string(),
        expiration,
        side,
        strike,
    })
}

fn parse_future(raw: &str) -> Option<Instrument> {
    let caps = FUTURE_RE.captures(raw)?;
    Some(Instrument::Future {
        underlying: caps[1].to_string(),
        calendar: caps[2].to_string(),
    })
}

fn parse_future_option(raw: &str) -> Option<Instrument> {
    let caps = FUTURE_OPTION_RE.captures(raw)?;
    let side = if &caps[5] == "C" {
        OptionSide::Call
    } else {
        OptionSide::Put
    };
    let strike = caps[6].parse::<Decimal>().ok()?;
    Some(Instrument::FutureOption {
        underlying: caps[1].to_string(),
        calendar: caps[2].to_string(),
        optcontract: Some(caps[3].to_string()),
        optcalendar: Some(caps[4].to_string()),
        expiration: None,
        side,
        strike,
    })
}
