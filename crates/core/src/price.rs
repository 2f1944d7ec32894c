//! Price observations and order book snapshots.

use crate::{Exchange, Symbol, TradeSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last traded price of a symbol on one exchange at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub exchange: Exchange,
    pub symbol: Symbol,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Prices for one symbol across exchanges, gathered during a single tick.
///
/// Holds at most one quote per exchange. Quotes keep the order in which they
/// were first inserted, which makes tie-breaking downstream deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    symbol: Symbol,
    quotes: Vec<PriceQuote>,
}

impl PriceSnapshot {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quotes: Vec::new(),
        }
    }

    /// Build a snapshot from `(exchange, price)` pairs, stamped with the current time.
    pub fn from_prices(symbol: Symbol, prices: &[(Exchange, f64)]) -> Self {
        let now = Utc::now();
        let mut snapshot = Self::new(symbol);
        for &(exchange, price) in prices {
            snapshot.insert(exchange, price, now);
        }
        snapshot
    }

    /// Record a quote. A second quote for the same exchange replaces the first
    /// in place and the replaced quote is returned.
    pub fn insert(
        &mut self,
        exchange: Exchange,
        price: f64,
        observed_at: DateTime<Utc>,
    ) -> Option<PriceQuote> {
        let quote = PriceQuote {
            exchange,
            symbol: self.symbol.clone(),
            price,
            observed_at,
        };
        match self.quotes.iter_mut().find(|q| q.exchange == exchange) {
            Some(existing) => Some(std::mem::replace(existing, quote)),
            None => {
                self.quotes.push(quote);
                None
            }
        }
    }

    #[inline]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn get(&self, exchange: Exchange) -> Option<&PriceQuote> {
        self.quotes.iter().find(|q| q.exchange == exchange)
    }

    pub fn quotes(&self) -> &[PriceQuote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Order book depth as `(price, volume)` levels.
///
/// Asks are ordered best (lowest) first, bids best (highest) first, as the
/// exchange returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub asks: Vec<(f64, f64)>,
    pub bids: Vec<(f64, f64)>,
}

impl OrderBook {
    pub fn new(asks: Vec<(f64, f64)>, bids: Vec<(f64, f64)>) -> Self {
        Self { asks, bids }
    }

    /// Levels a taker consumes for the given side: asks when buying, bids when selling.
    pub fn levels_for(&self, side: TradeSide) -> &[(f64, f64)] {
        match side {
            TradeSide::Buy => &self.asks,
            TradeSide::Sell => &self.bids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn btc() -> Symbol {
        Symbol::new("BTC", "USDT").unwrap()
    }

    #[test]
    fn test_snapshot_keeps_one_quote_per_exchange() {
        let now = Utc::now();
        let mut snapshot = PriceSnapshot::new(btc());
        assert!(snapshot.insert(Exchange::Binance, 100.0, now).is_none());
        assert!(snapshot.insert(Exchange::Kraken, 101.0, now).is_none());

        let replaced = snapshot.insert(Exchange::Binance, 102.0, now);
        assert_eq!(replaced.map(|q| q.price), Some(100.0));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(Exchange::Binance).map(|q| q.price), Some(102.0));

        let order: Vec<Exchange> = snapshot.quotes().iter().map(|q| q.exchange).collect();
        assert_eq!(order, vec![Exchange::Binance, Exchange::Kraken]);
    }

    #[test]
    fn test_snapshot_quotes_carry_symbol() {
        let snapshot = PriceSnapshot::from_prices(btc(), &[(Exchange::Kucoin, 98.0)]);
        assert_eq!(snapshot.quotes()[0].symbol, btc());
        assert!(!snapshot.is_empty());
        assert!(PriceSnapshot::new(btc()).is_empty());
    }

    #[test]
    fn test_order_book_levels_for_side() {
        let book = OrderBook::new(vec![(100.0, 1.0), (101.0, 2.0)], vec![(99.0, 3.0)]);
        assert_eq!(book.levels_for(TradeSide::Buy), &[(100.0, 1.0), (101.0, 2.0)]);
        assert_eq!(book.levels_for(TradeSide::Sell), &[(99.0, 3.0)]);
        assert!(OrderBook::default().levels_for(TradeSide::Buy).is_empty());
    }
}
