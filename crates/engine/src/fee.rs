//! Trading fee resolution.
//!
//! Fees are per-unit taker fractions (0.001 = 0.1%) looked up from the
//! gateway for each exchange, symbol and side. A failed lookup falls back to
//! [`DEFAULT_TAKER_FEE`] so a flaky fee endpoint never hides an opportunity.

use tickarb_core::{Symbol, TradeSide};
use tickarb_feeds::ExchangeGateway;
use tracing::warn;

/// Fallback taker fee (0.1%).
pub const DEFAULT_TAKER_FEE: f64 = 0.001;

/// A resolved fee rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRate {
    pub rate: f64,
    /// True when the lookup failed and [`DEFAULT_TAKER_FEE`] was used.
    pub defaulted: bool,
}

impl FeeRate {
    pub fn fetched(rate: f64) -> Self {
        Self {
            rate,
            defaulted: false,
        }
    }

    pub fn fallback() -> Self {
        Self {
            rate: DEFAULT_TAKER_FEE,
            defaulted: true,
        }
    }
}

fn is_plausible(rate: f64) -> bool {
    rate.is_finite() && (0.0..1.0).contains(&rate)
}

/// Fetch the taker fee for one side of a trade.
pub async fn resolve_fee(gateway: &dyn ExchangeGateway, symbol: &Symbol, side: TradeSide) -> FeeRate {
    match gateway.fetch_fee(symbol, side).await {
        Ok(rate) if is_plausible(rate) => FeeRate::fetched(rate),
        Ok(rate) => {
            warn!(
                exchange = %gateway.exchange(),
                symbol = %symbol,
                rate,
                default = DEFAULT_TAKER_FEE,
                "Implausible fee rate, using default"
            );
            FeeRate::fallback()
        }
        Err(e) => {
            warn!(
                exchange = %gateway.exchange(),
                symbol = %symbol,
                error = %e,
                default = DEFAULT_TAKER_FEE,
                "Fee lookup failed, using default"
            );
            FeeRate::fallback()
        }
    }
}
