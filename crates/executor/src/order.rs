//! Two-legged market order placement.

use tickarb_core::{OrderResult, Symbol, TradeSide};
use tickarb_feeds::{ExchangeGateway, GatewayResult};
use tracing::{error, info};

/// Results of both legs of a spatial trade.
#[derive(Debug)]
pub struct LegResults {
    pub buy: GatewayResult<OrderResult>,
    pub sell: GatewayResult<OrderResult>,
}

impl LegResults {
    /// Successful orders; a failed leg becomes `None`.
    pub fn into_orders(self) -> (Option<OrderResult>, Option<OrderResult>) {
        (self.buy.ok(), self.sell.ok())
    }
}

/// Market-buy on `buy_gateway` and market-sell on `sell_gateway`, concurrently.
///
/// Both legs always run to completion; a failure on one side does not cancel
/// the other and nothing is retried.
pub async fn place_legs(
    buy_gateway: &dyn ExchangeGateway,
    sell_gateway: &dyn ExchangeGateway,
    symbol: &Symbol,
    amount: f64,
) -> LegResults {
    let (buy, sell) = tokio::join!(
        buy_gateway.place_market_order(symbol, TradeSide::Buy, amount),
        sell_gateway.place_market_order(symbol, TradeSide::Sell, amount),
    );

    for (gateway, side, result) in [
        (buy_gateway, TradeSide::Buy, &buy),
        (sell_gateway, TradeSide::Sell, &sell),
    ] {
        match result {
            Ok(order) => info!(
                exchange = %gateway.exchange(),
                symbol = %symbol,
                side = %side,
                order_id = %order.order_id,
                status = ?order.status,
                "Order placed"
            ),
            Err(e) => error!(
                exchange = %gateway.exchange(),
                symbol = %symbol,
                side = %side,
                error = %e,
                transient = e.is_transient(),
                "Order placement failed"
            ),
        }
    }

    LegResults { buy, sell }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickarb_core::Exchange;
    use tickarb_feeds::{GatewayError, MockGateway};

    fn btc() -> Symbol {
        Symbol::new("BTC", "USDT").unwrap()
    }

    #[tokio::test]
    async fn test_both_legs_placed() {
        let buy = MockGateway::new(Exchange::Kucoin).with_price(&btc(), 98.0);
        let sell = MockGateway::new(Exchange::Kraken).with_price(&btc(), 105.0);

        let legs = place_legs(&buy, &sell, &btc(), 0.5).await;
        assert!(legs.buy.is_ok() && legs.sell.is_ok());
        assert_eq!(buy.placed_orders()[0].side, TradeSide::Buy);
        assert_eq!(sell.placed_orders()[0].side, TradeSide::Sell);
    }

    #[tokio::test]
    async fn test_failed_leg_does_not_stop_the_other() {
        let buy = MockGateway::new(Exchange::Kucoin);
        let sell = MockGateway::new(Exchange::Kraken);
        buy.set_fail_orders(true);

        let legs = place_legs(&buy, &sell, &btc(), 0.5).await;
        assert!(matches!(legs.buy, Err(GatewayError::OrderRejected(_))));
        let (buy_order, sell_order) = legs.into_orders();
        assert!(buy_order.is_none());
        assert!(sell_order.is_some());
        assert_eq!(sell.placed_orders().len(), 1);
    }
}
