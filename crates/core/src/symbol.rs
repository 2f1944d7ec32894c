//! Trading pair symbols.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol must look like BASE/QUOTE: {0:?}")]
    Malformed(String),
    #[error("symbol has identical base and quote: {0:?}")]
    SameAsset(String),
}

/// Trading pair identifier such as `BTC/USDT`.
///
/// Assets are stored upper-cased so `btc/usdt` and `BTC/USDT` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    base: CompactString,
    quote: CompactString,
}

impl Symbol {
    pub fn new(base: &str, quote: &str) -> Result<Self, SymbolError> {
        let base = base.trim();
        let quote = quote.trim();
        let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(base) || !valid(quote) {
            return Err(SymbolError::Malformed(format!("{}/{}", base, quote)));
        }
        if base.eq_ignore_ascii_case(quote) {
            return Err(SymbolError::SameAsset(format!("{}/{}", base, quote)));
        }
        Ok(Self {
            base: CompactString::new(base.to_ascii_uppercase()),
            quote: CompactString::new(quote.to_ascii_uppercase()),
        })
    }

    #[inline]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[inline]
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Symbol with no separator, e.g. `BTCUSDT`.
    pub fn concat(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Symbol joined with a custom separator, e.g. `BTC-USDT`.
    pub fn joined(&self, sep: &str) -> String {
        format!("{}{}{}", self.base, sep, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) => Symbol::new(base, quote),
            _ => Err(SymbolError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_parse_normalises_case() {
        let sym: Symbol = "btc/usdt".parse().unwrap();
        assert_eq!(sym.base(), "BTC");
        assert_eq!(sym.quote(), "USDT");
        assert_eq!(sym.to_string(), "BTC/USDT");
        assert_eq!(sym, "BTC/USDT".parse().unwrap());
    }

    #[test]
    fn test_symbol_rejects_malformed() {
        assert!("BTCUSDT".parse::<Symbol>().is_err());
        assert!("BTC/".parse::<Symbol>().is_err());
        assert!("BTC/USDT/ETH".parse::<Symbol>().is_err());
        assert!("BT C/USDT".parse::<Symbol>().is_err());
        assert_eq!(
            "ETH/eth".parse::<Symbol>(),
            Err(SymbolError::SameAsset("ETH/eth".to_string()))
        );
    }

    #[test]
    fn test_symbol_venue_formats() {
        let sym = Symbol::new("eth", "btc").unwrap();
        assert_eq!(sym.concat(), "ETHBTC");
        assert_eq!(sym.joined("-"), "ETH-BTC");
    }

    #[test]
    fn test_symbol_serializes_as_string() {
        let sym = Symbol::new("ADA", "USDT").unwrap();
        let json = serde_json::to_string(&sym).unwrap();
        assert_eq!(json, "\"ADA/USDT\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sym);
        assert!(serde_json::from_str::<Symbol>("\"ADAUSDT\"").is_err());
    }
}
