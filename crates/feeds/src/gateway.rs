//! Uniform capability surface over a remote exchange.

use crate::GatewayResult;
use async_trait::async_trait;
use std::sync::Arc;
use tickarb_core::{Exchange, OrderBook, OrderResult, Symbol, TradeSide};

/// Operations the engine needs from an exchange.
///
/// Every call may fail independently. Callers treat a failure as "unknown",
/// never as a zero price or an empty book. Timeouts are enforced by the
/// implementation.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Exchange this gateway talks to.
    fn exchange(&self) -> Exchange;

    /// Last traded price.
    async fn fetch_ticker(&self, symbol: &Symbol) -> GatewayResult<f64>;

    /// Taker fee as a fraction of notional (0.001 = 0.1%).
    async fn fetch_fee(&self, symbol: &Symbol, side: TradeSide) -> GatewayResult<f64>;

    /// Current order book depth.
    async fn fetch_order_book(&self, symbol: &Symbol) -> GatewayResult<OrderBook>;

    /// Place a market order for `amount` units of the base asset.
    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: TradeSide,
        amount: f64,
    ) -> GatewayResult<OrderResult>;
}

/// Shared handle to a gateway.
pub type SharedGateway = Arc<dyn ExchangeGateway>;

/// Builds gateways for the configured exchanges when the engine starts.
#[async_trait]
pub trait GatewayProvider: Send + Sync {
    /// Connect to `exchanges`. Returned gateways follow the requested order.
    /// An error here aborts the run.
    async fn connect(&self, exchanges: &[Exchange]) -> GatewayResult<Vec<SharedGateway>>;
}
