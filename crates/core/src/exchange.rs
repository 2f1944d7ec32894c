//! Exchange identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Centralized exchange the bot can be configured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
    Kucoin,
    Kraken,
    Coinbase,
    Okx,
    Bybit,
    #[serde(rename = "gateio")]
    GateIO,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown exchange: {0}")]
pub struct UnknownExchange(pub String);

impl Exchange {
    /// Lowercase identifier used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Kucoin => "kucoin",
            Exchange::Kraken => "kraken",
            Exchange::Coinbase => "coinbase",
            Exchange::Okx => "okx",
            Exchange::Bybit => "bybit",
            Exchange::GateIO => "gateio",
        }
    }

    /// Human readable venue name.
    pub fn display_name(self) -> &'static str {
        match self {
            Exchange::Binance => "Binance",
            Exchange::Kucoin => "KuCoin",
            Exchange::Kraken => "Kraken",
            Exchange::Coinbase => "Coinbase",
            Exchange::Okx => "OKX",
            Exchange::Bybit => "Bybit",
            Exchange::GateIO => "Gate.io",
        }
    }

    pub fn all() -> &'static [Exchange] {
        &[
            Exchange::Binance,
            Exchange::Kucoin,
            Exchange::Kraken,
            Exchange::Coinbase,
            Exchange::Okx,
            Exchange::Bybit,
            Exchange::GateIO,
        ]
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = UnknownExchange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Exchange::all()
            .iter()
            .copied()
            .find(|ex| ex.as_str() == needle || (needle == "gate.io" && *ex == Exchange::GateIO))
            .ok_or_else(|| UnknownExchange(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_from_str() {
        assert_eq!("binance".parse::<Exchange>(), Ok(Exchange::Binance));
        assert_eq!(" KuCoin ".parse::<Exchange>(), Ok(Exchange::Kucoin));
        assert_eq!("gate.io".parse::<Exchange>(), Ok(Exchange::GateIO));
        assert!("mtgox".parse::<Exchange>().is_err());
    }

    #[test]
    fn test_exchange_round_trips_through_as_str() {
        for &ex in Exchange::all() {
            assert_eq!(ex.as_str().parse::<Exchange>(), Ok(ex));
        }
    }

    #[test]
    fn test_exchange_serde_lowercase() {
        let json = serde_json::to_string(&Exchange::GateIO).unwrap();
        assert_eq!(json, "\"gateio\"");
        let parsed: Exchange = serde_json::from_str("\"kraken\"").unwrap();
        assert_eq!(parsed, Exchange::Kraken);
    }

    #[test]
    fn test_exchange_display_name() {
        assert_eq!(Exchange::Okx.display_name(), "OKX");
        assert_eq!(Exchange::Kucoin.to_string(), "kucoin");
    }
}
