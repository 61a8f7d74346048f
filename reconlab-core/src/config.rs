//! Reconciliation configuration.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Tunable knobs for the matching heuristics plus per-source switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Fee-join search window around a trade group's timestamp. The
    /// default covers the whole trading day: statements timestamp
    /// aggregate rows loosely.
    pub fee_join_window_minutes: i64,

    /// Maximum notional mismatch for a balance row to qualify as a fee-join
    /// candidate.
    pub fee_join_notional_tolerance: Decimal,

    /// Late-feed matching window; the feed carries settlement-exact
    /// timestamps that drift a few minutes from execution time.
    pub late_match_tolerance_minutes: i64,

    /// Maximum order-id gap squashed into one order group.
    pub order_id_delta: i64,

    /// Contract-size overrides, merged over the built-in table.
    pub multiplier_overrides: BTreeMap<String, Decimal>,

    /// Ticker renames that occur out of sync between sub-tables (one table
    /// carries the old symbol, another the new one).
    pub symbol_renames: BTreeMap<String, String>,

    pub sources: SourceToggles,
}

/// Per-source enable/disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceToggles {
    pub trade_history: bool,
    pub cash_balance: bool,
    pub futures_statements: bool,
    pub api_feed: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            trade_history: true,
            cash_balance: true,
            futures_statements: true,
            api_feed: true,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            fee_join_window_minutes: 24 * 60,
            fee_join_notional_tolerance: Decimal::new(1, 2),
            late_match_tolerance_minutes: 5,
            order_id_delta: 5,
            multiplier_overrides: BTreeMap::new(),
            symbol_renames: BTreeMap::new(),
            sources: SourceToggles::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ReconcileConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn fee_join_window(&self) -> Duration {
        Duration::minutes(self.fee_join_window_minutes)
    }

    pub fn late_match_tolerance(&self) -> Duration {
        Duration::minutes(self.late_match_tolerance_minutes)
    }

    /// Apply the ticker rename map.
    pub fn rename<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.symbol_renames
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.fee_join_window_minutes, 1440);
        assert_eq!(config.fee_join_notional_tolerance, dec!(0.01));
        assert_eq!(config.late_match_tolerance_minutes, 5);
        assert_eq!(config.order_id_delta, 5);
        assert!(config.sources.api_feed);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ReconcileConfig::from_toml(
            r#"
            order_id_delta = 2

            [symbol_renames]
            CHPT = "SBE"

            [sources]
            futures_statements = false
            "#,
        )
        .unwrap();
        assert_eq!(config.order_id_delta, 2);
        assert_eq!(config.fee_join_window_minutes, 1440);
        assert!(!config.sources.futures_statements);
        assert!(config.sources.trade_history);
        assert_eq!(config.rename("CHPT"), "SBE");
        assert_eq!(config.rename("SPY"), "SPY");
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(ReconcileConfig::from_toml("order_id_delta = \"many\"").is_err());
    }
}
