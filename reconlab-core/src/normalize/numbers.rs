//! Number forms peculiar to the statement exports.

use rust_decimal::Decimal;

use super::NormalizeError;

/// Parse a price column value.
///
/// Treasury contracts quote fractionally: `129'16` means 129 + 16/32 for
/// futures outrights, while options on treasuries quote in 64ths. Everything
/// else is a plain decimal, possibly with thousands separators. Empty values
/// are zero (the export leaves non-priced rows blank).
pub fn parse_price(value: &str, is_outright: bool) -> Result<Decimal, NormalizeError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    if let Some((whole, frac)) = value.split_once('\'') {
        let frac = frac.trim_start_matches('\'');
        let divisor = if is_outright { 32 } else { 64 };
        let whole: Decimal = whole
            .parse()
            .map_err(|_| NormalizeError::BadPrice(value.to_string()))?;
        let frac: Decimal = frac
            .parse()
            .map_err(|_| NormalizeError::BadPrice(value.to_string()))?;
        return Ok(whole + frac / Decimal::from(divisor));
    }
    value
        .replace(',', "")
        .parse()
        .map_err(|_| NormalizeError::BadPrice(value.to_string()))
}

/// The export writes `--` for empty numeric cells.
pub fn dash_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value == "--" {
        None
    } else {
        Some(value)
    }
}
