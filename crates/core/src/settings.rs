//! Runtime-tunable bot settings.
//!
//! [`BotConfig`] is what the engine reads at the start of every tick. The control
//! surface changes it through [`ConfigPatch`], which is merged field by field and
//! validated as a whole before it replaces the current settings.

use crate::{Exchange, Symbol};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("trade_amount must be a positive number, got {0}")]
    InvalidTradeAmount(f64),
    #[error("min_profit must be a finite number, got {0}")]
    InvalidMinProfit(f64),
    #[error("check_interval_seconds must be at least 1")]
    InvalidInterval,
    #[error("duplicate entry in {field}: {value}")]
    Duplicate { field: &'static str, value: String },
    #[error("invalid triangle {0}: base, quote and intermediate must all differ")]
    InvalidTriangle(String),
}

/// Three assets scanned for triangular mispricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleSettings {
    /// Restrict the scan to one exchange; `None` scans every connected gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Exchange>,
    pub base: String,
    pub quote: String,
    pub intermediate: String,
}

impl TriangleSettings {
    pub fn new(base: &str, quote: &str, intermediate: &str) -> Self {
        Self {
            exchange: None,
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
            intermediate: intermediate.to_ascii_uppercase(),
        }
    }

    /// The three legs: base/quote, intermediate/quote, base/intermediate.
    pub fn legs(&self) -> Result<(Symbol, Symbol, Symbol), ConfigError> {
        let invalid = |_| ConfigError::InvalidTriangle(self.to_string());
        Ok((
            Symbol::new(&self.base, &self.quote).map_err(invalid)?,
            Symbol::new(&self.intermediate, &self.quote).map_err(invalid)?,
            Symbol::new(&self.base, &self.intermediate).map_err(invalid)?,
        ))
    }
}

impl std::fmt::Display for TriangleSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} via {}", self.base, self.quote, self.intermediate)
    }
}

/// Settings the engine reads once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Record trades without placing orders.
    pub simulation_mode: bool,
    /// Order size in base asset units.
    pub trade_amount: f64,
    /// Minimum gross spread (quote currency) before an opportunity is considered.
    pub min_profit: f64,
    pub symbols: Vec<Symbol>,
    pub exchanges: Vec<Exchange>,
    pub check_interval_seconds: u64,
    pub triangles: Vec<TriangleSettings>,
}

impl Default for BotConfig {
    fn default() -> Self {
        let symbol = |s: &str| s.parse::<Symbol>().ok();
        Self {
            simulation_mode: true,
            trade_amount: 0.001,
            min_profit: 1.0,
            symbols: ["BTC/USDT", "ETH/USDT", "ADA/USDT"]
                .into_iter()
                .filter_map(symbol)
                .collect(),
            exchanges: vec![Exchange::Binance, Exchange::Kucoin, Exchange::Kraken],
            check_interval_seconds: 10,
            triangles: Vec::new(),
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.trade_amount.is_finite() || self.trade_amount <= 0.0 {
            return Err(ConfigError::InvalidTradeAmount(self.trade_amount));
        }
        if !self.min_profit.is_finite() {
            return Err(ConfigError::InvalidMinProfit(self.min_profit));
        }
        if self.check_interval_seconds == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        for (i, symbol) in self.symbols.iter().enumerate() {
            if self.symbols[..i].contains(symbol) {
                return Err(ConfigError::Duplicate {
                    field: "symbols",
                    value: symbol.to_string(),
                });
            }
        }
        for (i, exchange) in self.exchanges.iter().enumerate() {
            if self.exchanges[..i].contains(exchange) {
                return Err(ConfigError::Duplicate {
                    field: "exchanges",
                    value: exchange.to_string(),
                });
            }
        }
        for triangle in &self.triangles {
            triangle.legs()?;
        }
        Ok(())
    }

    /// Apply `patch` on top of a copy of `self` and validate the result.
    /// `self` is left untouched when validation fails.
    pub fn merged(&self, patch: ConfigPatch) -> Result<BotConfig, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = patch.simulation_mode {
            next.simulation_mode = v;
        }
        if let Some(v) = patch.trade_amount {
            next.trade_amount = v;
        }
        if let Some(v) = patch.min_profit {
            next.min_profit = v;
        }
        if let Some(v) = patch.symbols {
            next.symbols = v;
        }
        if let Some(v) = patch.exchanges {
            next.exchanges = v;
        }
        if let Some(v) = patch.check_interval_seconds {
            next.check_interval_seconds = v;
        }
        if let Some(v) = patch.triangles {
            next.triangles = v;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Partial update for [`BotConfig`]; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPatch {
    pub simulation_mode: Option<bool>,
    pub trade_amount: Option<f64>,
    pub min_profit: Option<f64>,
    pub symbols: Option<Vec<Symbol>>,
    pub exchanges: Option<Vec<Exchange>>,
    pub check_interval_seconds: Option<u64>,
    pub triangles: Option<Vec<TriangleSettings>>,
}
