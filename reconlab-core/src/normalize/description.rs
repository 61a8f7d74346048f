//! Statement description grammars.
//!
//! The cash and futures statements carry their economic detail only inside
//! the free-text description column: the traded strategy, the underlying,
//! quantities, and — for expirations — the full option identity. These
//! grammars recover that structure. The strategy name doubles as the
//! trading/non-trading discriminator for statement rows and is the
//! options-combo grouping later passes must preserve.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::domain::{Instruction, OptionSide};

use super::NormalizeError;

/// Structured form of a statement description.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDescription {
    Trade(TradeDescription),
    Expiration(ExpirationDescription),
    Dividend(DividendDescription),
    /// Recognized row type but no trade content (sweeps, journal entries…).
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeDescription {
    pub instruction: Instruction,
    pub quantity: Decimal,
    /// "VERTICAL", "IRON CONDOR", "SINGLE", "OUTRIGHT", …
    pub strategy: String,
    pub underlying: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpirationDescription {
    /// Signed: negative when a short position was removed.
    pub quantity: Decimal,
    pub underlying: String,
    pub multiplier: Decimal,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub side: OptionSide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DividendDescription {
    pub underlying: String,
}

/// Strip platform noise the web/mobile frontends prepend.
pub fn clean_prefixes(description: &str) -> String {
    static PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(WEB:(AA_[A-Z]+|WEB_GRID_SNAP)|tAndroid) ").expect("prefix grammar")
    });
    PREFIX_RE.replace_all(description, "").into_owned()
}

/// Dispatch on the row's three-letter type code.
pub fn parse_description(
    type_code: &str,
    description: &str,
) -> Result<ParsedDescription, NormalizeError> {
    match type_code {
        "TRD" => parse_trade_description(description).map(ParsedDescription::Trade),
        "RAD" if description.starts_with("REMOVAL OF OPTION") => {
            parse_expiration_description(description).map(ParsedDescription::Expiration)
        }
        "DOI" if description.contains("DIVIDEND") => {
            parse_dividend_description(description).map(ParsedDescription::Dividend)
        }
        _ => Ok(ParsedDescription::Other),
    }
}

static TRADE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<side>BOT|SOLD) (?P<quantity>[+-]?[0-9.,]+) (?P<rest>.*?)(?P<price> @-?[0-9.]+)?(?P<venue> [A-Z]+(?: GEMINI)?)?$",
    )
    .expect("trade grammar")
});

const UNDERLYING: &str = r"(?P<underlying>/?[A-Z0-9]+)(?::[A-Z]+)?";

static NAMED_STRATEGY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<strategy>COVERED|VERTICAL|BUTTERFLY|VERT ROLL|DIAGONAL|CALENDAR|STRANGLE|CONDOR|IRON CONDOR) {UNDERLYING} .+$"
    ))
    .expect("named strategy grammar")
});

static CUSTOM_STRATEGY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:-?\d+(?:/-?\d+)*) (?P<strategy>~IRON CONDOR|CUSTOM) {UNDERLYING} .+$"
    ))
    .expect("custom strategy grammar")
});

static FUT_CALENDAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<strategy>FUT CALENDAR) {UNDERLYING}-(?:/?[A-Z0-9]+)(?::[A-Z]+)?$"
    ))
    .expect("futures calendar grammar")
});

static SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{UNDERLYING} .+$")).expect("single option grammar"));

static OUTRIGHT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{UNDERLYING}$")).expect("outright grammar"));

/// `BOT +1 VERTICAL SPY 100 (Weeklys) 8 JAN 21 355/350 PUT @-0.71`
pub fn parse_trade_description(description: &str) -> Result<TradeDescription, NormalizeError> {
    let caps = TRADE_RE
        .captures(description)
        .ok_or_else(|| NormalizeError::BadDescription(description.to_string()))?;

    let instruction = if &caps["side"] == "BOT" {
        Instruction::Buy
    } else {
        Instruction::Sell
    };
    let quantity: Decimal = caps["quantity"]
        .replace(',', "")
        .parse::<Decimal>()
        .map_err(|_| NormalizeError::BadDescription(description.to_string()))?
        .abs();
    let price = caps.name("price").and_then(|m| {
        m.as_str()
            .trim_start_matches(|c| c == ' ' || c == '@')
            .parse::<Decimal>()
            .ok()
    });
    let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");

    let (strategy, underlying) = if let Some(c) = NAMED_STRATEGY_RE.captures(rest) {
        (c["strategy"].to_string(), c["underlying"].to_string())
    } else if let Some(c) = CUSTOM_STRATEGY_RE.captures(rest) {
        (c["strategy"].to_string(), c["underlying"].to_string())
    } else if let Some(c) = FUT_CALENDAR_RE.captures(rest) {
        // Front-month instrument is the representative underlying.
        (c["strategy"].to_string(), c["underlying"].to_string())
    } else if let Some(c) = SINGLE_RE.captures(rest) {
        ("SINGLE".to_string(), c["underlying"].to_string())
    } else if let Some(c) = OUTRIGHT_RE.captures(rest) {
        ("OUTRIGHT".to_string(), c["underlying"].to_string())
    } else {
        return Err(NormalizeError::BadDescription(description.to_string()));
    };

    Ok(TradeDescription {
        instruction,
        quantity,
        strategy,
        underlying,
        price,
    })
}

static EXPIRATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^REMOVAL OF OPTION DUE TO (?:EXPIRATION|ASSIGNMENT) (?P<quantity>[+-]?[0-9.]+) (?P<underlying>[A-Z/:]+) (?P<multiplier>\d+) (?:\(.*\) )?(?P<expiration>\d+ [A-Z]{3} \d+) (?P<strike>[0-9.]+) (?P<side>PUT|CALL)$",
    )
    .expect("expiration grammar")
});

/// `REMOVAL OF OPTION DUE TO EXPIRATION -1 SPY 100 16 APR 21 350 PUT`
pub fn parse_expiration_description(
    description: &str,
) -> Result<ExpirationDescription, NormalizeError> {
    let caps = EXPIRATION_RE
        .captures(description)
        .ok_or_else(|| NormalizeError::BadDescription(description.to_string()))?;
    let bad = || NormalizeError::BadDescription(description.to_string());

    Ok(ExpirationDescription {
        quantity: caps["quantity"].parse().map_err(|_| bad())?,
        underlying: caps["underlying"].to_string(),
        multiplier: caps["multiplier"].parse().map_err(|_| bad())?,
        expiration: parse_dmy(&caps["expiration"]).ok_or_else(bad)?,
        strike: caps["strike"].parse().map_err(|_| bad())?,
        side: if &caps["side"] == "CALL" {
            OptionSide::Call
        } else {
            OptionSide::Put
        },
    })
}

static DIVIDEND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"DIVIDEND~(?P<underlying>[A-Z0-9]+)$").expect("dividend grammar")
});

/// `ORDINARY DIVIDEND~SPY`
pub fn parse_dividend_description(
    description: &str,
) -> Result<DividendDescription, NormalizeError> {
    let caps = DIVIDEND_RE
        .captures(description)
        .ok_or_else(|| NormalizeError::BadDescription(description.to_string()))?;
    Ok(DividendDescription {
        underlying: caps["underlying"].to_string(),
    })
}

/// Parse dates of the form `16 APR 21`.
pub fn parse_dmy(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = match parts.next()? {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    let year: i32 = parts.next()?.parse().ok()?;
    let year = if year < 100 { 2000 + year } else { year };
    NaiveDate::from_ymd_opt(year, month, day)
}
