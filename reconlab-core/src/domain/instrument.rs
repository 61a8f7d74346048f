//! Instrument — structured identity of the thing traded.
//!
//! One variant per instrument kind, each carrying exactly the fields that
//! kind requires. Futures calendars are decade-qualified month-year codes
//! (`K21`); options on futures may lack an expiration date upstream, in
//! which case the option contract code stands in for it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call/put side of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    pub fn letter(&self) -> char {
        match self {
            OptionSide::Call => 'C',
            OptionSide::Put => 'P',
        }
    }
}

/// Instrument kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Equity,
    EquityOption,
    Future,
    FutureOption,
}

/// A fully decoded instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instrument {
    Equity {
        underlying: String,
    },
    EquityOption {
        underlying: String,
        expiration: NaiveDate,
        side: OptionSide,
        strike: Decimal,
    },
    /// `calendar` is the month-year code of the contract, e.g. `K21`.
    Future {
        underlying: String,
        calendar: String,
    },
    /// `optcontract`/`optcalendar` identify the option series on the
    /// underlying future (e.g. `LOM`/`K21` on `/CL`). The bulk export
    /// provides the series code but not the expiration date; either one
    /// identifies the contract.
    FutureOption {
        underlying: String,
        calendar: String,
        optcontract: Option<String>,
        optcalendar: Option<String>,
        expiration: Option<NaiveDate>,
        side: OptionSide,
        strike: Decimal,
    },
}

impl Instrument {
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Instrument::Equity { .. } => InstrumentKind::Equity,
            Instrument::EquityOption { .. } => InstrumentKind::EquityOption,
            Instrument::Future { .. } => InstrumentKind::Future,
            Instrument::FutureOption { .. } => InstrumentKind::FutureOption,
        }
    }

    /// The underlying root, without any calendar qualification.
    pub fn underlying(&self) -> &str {
        match self {
            Instrument::Equity { underlying }
            | Instrument::EquityOption { underlying, .. }
            | Instrument::Future { underlying, .. }
            | Instrument::FutureOption { underlying, .. } => underlying,
        }
    }

    /// Underlying with the month-year code appended for futures
    /// (`/CLK21`); the plain underlying otherwise.
    pub fn dated_underlying(&self) -> String {
        match self {
            Instrument::Future {
                underlying,
                calendar,
            }
            | Instrument::FutureOption {
                underlying,
                calendar,
                ..
            } => format!("{underlying}{calendar}"),
            _ => self.underlying().to_string(),
        }
    }

    pub fn expiration(&self) -> Option<NaiveDate> {
        match self {
            Instrument::EquityOption { expiration, .. } => Some(*expiration),
            Instrument::FutureOption { expiration, .. } => *expiration,
            _ => None,
        }
    }

    /// Option-series expiration code for futures options (`LOMK21`),
    /// standing in when no expiration date is available.
    pub fn expcode(&self) -> Option<String> {
        match self {
            Instrument::FutureOption {
                optcontract: Some(contract),
                optcalendar: Some(calendar),
                ..
            } => Some(format!("{contract}{calendar}")),
            _ => None,
        }
    }

    pub fn side(&self) -> Option<OptionSide> {
        match self {
            Instrument::EquityOption { side, .. } | Instrument::FutureOption { side, .. } => {
                Some(*side)
            }
            _ => None,
        }
    }

    pub fn strike(&self) -> Option<Decimal> {
        match self {
            Instrument::EquityOption { strike, .. } | Instrument::FutureOption { strike, .. } => {
                Some(*strike)
            }
            _ => None,
        }
    }

    pub fn is_futures(&self) -> bool {
        matches!(
            self,
            Instrument::Future { .. } | Instrument::FutureOption { .. }
        )
    }

    pub fn is_option(&self) -> bool {
        matches!(
            self,
            Instrument::EquityOption { .. } | Instrument::FutureOption { .. }
        )
    }
}

impl fmt::Display for Instrument {
    /// Normalized symbol code. These forms are stable and round-trip
    /// through `symbology::parse_symbol`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Equity { underlying } => write!(f, "{underlying}"),
            Instrument::EquityOption {
                underlying,
                expiration,
                side,
                strike,
            } => write!(
                f,
                "{underlying}_{}_{}{}",
                expiration.format("%y%m%d"),
                side.letter(),
                strike.normalize()
            ),
            Instrument::Future {
                underlying,
                calendar,
            } => write!(f, "{underlying}{calendar}"),
            Instrument::FutureOption {
                underlying,
                calendar,
                optcontract,
                optcalendar,
                expiration,
                side,
                strike,
            } => {
                // The series code is the preferred form; the export that
                // produces these rows supplies it but not the date.
                if let (Some(contract), Some(optcal)) = (optcontract, optcalendar) {
                    write!(
                        f,
                        "{underlying}{calendar}_{contract}{optcal}_{}{}",
                        side.letter(),
                        strike.normalize()
                    )
                } else if let Some(expiration) = expiration {
                    write!(
                        f,
                        "{underlying}{calendar}_{}_{}{}",
                        expiration.format("%y%m%d"),
                        side.letter(),
                        strike.normalize()
                    )
                } else {
                    write!(
                        f,
                        "{underlying}{calendar}_{}{}",
                        side.letter(),
                        strike.normalize()
                    )
                }
            }
        }
    }
}
