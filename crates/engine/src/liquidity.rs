//! Top-of-book liquidity check.
//!
//! Before committing capital, each side of a trade is checked against the
//! exchange's order book: a buy walks the asks, a sell walks the bids.

use tickarb_core::{Symbol, TradeSide};
use tickarb_feeds::ExchangeGateway;
use tracing::{debug, warn};

/// Outcome of a liquidity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liquidity {
    Sufficient,
    Insufficient,
    /// The order book could not be fetched.
    Unavailable,
}

impl Liquidity {
    /// Unavailable books count as insufficient.
    pub fn is_sufficient(self) -> bool {
        matches!(self, Liquidity::Sufficient)
    }
}

/// Walk `levels` in book order and report whether their cumulative volume
/// reaches `amount` before the book runs out.
pub fn depth_covers(levels: &[(f64, f64)], amount: f64) -> bool {
    let mut cumulative = 0.0;
    for &(_, volume) in levels {
        if cumulative >= amount {
            return true;
        }
        cumulative += volume;
    }
    cumulative >= amount
}

/// Check whether `gateway` can absorb `amount` units on `side` of `symbol`.
pub async fn has_liquidity(
    gateway: &dyn ExchangeGateway,
    symbol: &Symbol,
    amount: f64,
    side: TradeSide,
) -> Liquidity {
    let book = match gateway.fetch_order_book(symbol).await {
        Ok(book) => book,
        Err(e) => {
            warn!(
                exchange = %gateway.exchange(),
                symbol = %symbol,
                error = %e,
                "Order book unavailable, treating as illiquid"
            );
            return Liquidity::Unavailable;
        }
    };

    if depth_covers(book.levels_for(side), amount) {
        Liquidity::Sufficient
    } else {
        debug!(
            exchange = %gateway.exchange(),
            symbol = %symbol,
            side = %side,
            amount,
            "Insufficient depth"
        );
        Liquidity::Insufficient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tickarb_core::{Exchange, OrderBook};
    use tickarb_feeds::MockGateway;

    fn btc() -> Symbol {
        Symbol::new("BTC", "USDT").unwrap()
    }

    #[test]
    fn test_depth_covers() {
        assert!(depth_covers(&[(100.0, 2.0), (101.0, 2.0), (102.0, 2.0)], 5.0));
        assert!(!depth_covers(&[(100.0, 1.0), (101.0, 1.0)], 5.0));
        assert!(depth_covers(&[(100.0, 2.5), (101.0, 2.5)], 5.0));
        assert!(!depth_covers(&[], 0.001));
    }

    #[tokio::test]
    async fn test_buy_walks_asks_and_sell_walks_bids() {
        let gateway = MockGateway::new(Exchange::Binance);
        gateway.set_order_book(
            &btc(),
            OrderBook::new(
                vec![(100.0, 2.0), (101.0, 2.0), (102.0, 2.0)],
                vec![(99.0, 1.0), (98.0, 1.0)],
            ),
        );

        assert_eq!(
            has_liquidity(&gateway, &btc(), 5.0, TradeSide::Buy).await,
            Liquidity::Sufficient
        );
        assert_eq!(
            has_liquidity(&gateway, &btc(), 5.0, TradeSide::Sell).await,
            Liquidity::Insufficient
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_liquid() {
        let gateway = MockGateway::new(Exchange::Binance).with_market(&btc(), 100.0, 10.0);
        gateway.set_fail_order_books(true);

        let liquidity = has_liquidity(&gateway, &btc(), 1.0, TradeSide::Buy).await;
        assert_eq!(liquidity, Liquidity::Unavailable);
        assert!(!liquidity.is_sufficient());
    }
}
