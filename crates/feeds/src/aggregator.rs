//! Price aggregation across exchanges.
//!
//! Fetches the last price of one symbol from every gateway concurrently and
//! collects the answers into a [`PriceSnapshot`]. A gateway that fails or
//! returns a nonsensical price is left out of the snapshot; it is never
//! reported as a zero price.

use crate::{GatewayError, SharedGateway};
use chrono::Utc;
use futures_util::future::join_all;
use tickarb_core::{Exchange, PriceSnapshot, Symbol};
use tracing::{debug, error, warn};

/// A gateway that did not contribute to a snapshot.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub exchange: Exchange,
    pub error: GatewayError,
}

/// Outcome of one aggregation round.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub snapshot: PriceSnapshot,
    pub failures: Vec<FetchFailure>,
}

/// Fans price requests out over a set of gateways.
#[derive(Clone, Default)]
pub struct PriceAggregator {
    gateways: Vec<SharedGateway>,
}

impl PriceAggregator {
    pub fn new(gateways: Vec<SharedGateway>) -> Self {
        Self { gateways }
    }

    pub fn gateways(&self) -> &[SharedGateway] {
        &self.gateways
    }

    /// Fetch `symbol` from every gateway. Quotes keep gateway order.
    pub async fn aggregate(&self, symbol: &Symbol) -> Aggregation {
        let results = join_all(self.gateways.iter().map(|gateway| async move {
            (gateway.exchange(), gateway.fetch_ticker(symbol).await)
        }))
        .await;

        let observed_at = Utc::now();
        let mut snapshot = PriceSnapshot::new(symbol.clone());
        let mut failures = Vec::new();

        for (exchange, result) in results {
            let error = match result {
                Ok(price) if price.is_finite() && price > 0.0 => {
                    debug!(exchange = %exchange, symbol = %symbol, price, "Price fetched");
                    snapshot.insert(exchange, price, observed_at);
                    continue;
                }
                Ok(price) => GatewayError::InvalidPrice(price),
                Err(e) => e,
            };
            if error.is_permanent() {
                error!(
                    exchange = %exchange,
                    symbol = %symbol,
                    error = %error,
                    "Price fetch failed, check gateway settings"
                );
            } else {
                warn!(
                    exchange = %exchange,
                    symbol = %symbol,
                    error = %error,
                    transient = error.is_transient(),
                    "Price fetch failed"
                );
            }
            failures.push(FetchFailure { exchange, error });
        }

        Aggregation { snapshot, failures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockGateway;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn btc() -> Symbol {
        Symbol::new("BTC", "USDT").unwrap()
    }

    #[tokio::test]
    async fn test_aggregate_collects_all_prices() {
        let aggregator = PriceAggregator::new(vec![
            Arc::new(MockGateway::new(Exchange::Binance).with_price(&btc(), 100.0)),
            Arc::new(MockGateway::new(Exchange::Kucoin).with_price(&btc(), 98.0)),
            Arc::new(MockGateway::new(Exchange::Kraken).with_price(&btc(), 105.0)),
        ]);

        let aggregation = aggregator.aggregate(&btc()).await;
        assert!(aggregation.failures.is_empty());
        let prices: Vec<(Exchange, f64)> = aggregation
            .snapshot
            .quotes()
            .iter()
            .map(|q| (q.exchange, q.price))
            .collect();
        assert_eq!(
            prices,
            vec![
                (Exchange::Binance, 100.0),
                (Exchange::Kucoin, 98.0),
                (Exchange::Kraken, 105.0)
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_gateway_is_omitted() {
        let failing = Arc::new(MockGateway::new(Exchange::Kraken).with_price(&btc(), 105.0));
        failing.set_fail_tickers(true);
        let aggregator = PriceAggregator::new(vec![
            Arc::new(MockGateway::new(Exchange::Binance).with_price(&btc(), 100.0)),
            failing,
        ]);

        let aggregation = aggregator.aggregate(&btc()).await;
        assert_eq!(aggregation.snapshot.len(), 1);
        assert!(aggregation.snapshot.get(Exchange::Kraken).is_none());
        assert_eq!(aggregation.failures.len(), 1);
        assert_eq!(aggregation.failures[0].exchange, Exchange::Kraken);
    }

    #[tokio::test]
    async fn test_non_positive_price_is_a_failure() {
        let aggregator = PriceAggregator::new(vec![
            Arc::new(MockGateway::new(Exchange::Binance).with_price(&btc(), 0.0)),
            Arc::new(MockGateway::new(Exchange::Kucoin).with_price(&btc(), f64::NAN)),
        ]);

        let aggregation = aggregator.aggregate(&btc()).await;
        assert!(aggregation.snapshot.is_empty());
        assert_eq!(aggregation.failures.len(), 2);
        assert!(matches!(aggregation.failures[0].error, GatewayError::InvalidPrice(_)));
    }

    #[tokio::test]
    async fn test_no_gateways_gives_empty_snapshot() {
        let aggregation = PriceAggregator::default().aggregate(&btc()).await;
        assert!(aggregation.snapshot.is_empty());
        assert!(aggregation.failures.is_empty());
    }
}
