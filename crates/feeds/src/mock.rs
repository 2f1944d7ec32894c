//! In-memory gateway for tests and dry runs.

use crate::{ExchangeGateway, GatewayError, GatewayProvider, GatewayResult, SharedGateway};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tickarb_core::{Exchange, OrderBook, OrderResult, OrderStatus, Symbol, TradeSide};

/// Gateway backed by in-memory prices, books and fees.
///
/// Unknown symbols fail with [`GatewayError::UnsupportedSymbol`]. Each call
/// kind can be switched to fail independently.
pub struct MockGateway {
    exchange: Exchange,
    prices: DashMap<Symbol, f64>,
    books: DashMap<Symbol, OrderBook>,
    fees: DashMap<Symbol, f64>,
    default_fee: f64,
    fail_tickers: AtomicBool,
    fail_fees: AtomicBool,
    fail_books: AtomicBool,
    fail_orders: AtomicBool,
    ticker_calls: AtomicU64,
    order_seq: AtomicU64,
    orders: DashMap<u64, OrderResult>,
}

impl MockGateway {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            prices: DashMap::new(),
            books: DashMap::new(),
            fees: DashMap::new(),
            default_fee: 0.001,
            fail_tickers: AtomicBool::new(false),
            fail_fees: AtomicBool::new(false),
            fail_books: AtomicBool::new(false),
            fail_orders: AtomicBool::new(false),
            ticker_calls: AtomicU64::new(0),
            order_seq: AtomicU64::new(0),
            orders: DashMap::new(),
        }
    }

    /// Price plus a single-level book of `depth` units on both sides.
    pub fn with_market(self, symbol: &Symbol, price: f64, depth: f64) -> Self {
        self.set_price(symbol, price);
        self.set_order_book(symbol, OrderBook::new(vec![(price, depth)], vec![(price, depth)]));
        self
    }

    pub fn with_price(self, symbol: &Symbol, price: f64) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn with_fee(self, symbol: &Symbol, fee: f64) -> Self {
        self.fees.insert(symbol.clone(), fee);
        self
    }

    pub fn set_price(&self, symbol: &Symbol, price: f64) {
        self.prices.insert(symbol.clone(), price);
    }

    pub fn set_order_book(&self, symbol: &Symbol, book: OrderBook) {
        self.books.insert(symbol.clone(), book);
    }

    pub fn set_fail_tickers(&self, fail: bool) {
        self.fail_tickers.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_fees(&self, fail: bool) {
        self.fail_fees.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_order_books(&self, fail: bool) {
        self.fail_books.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }

    pub fn ticker_calls(&self) -> u64 {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    /// Orders placed so far, oldest first.
    pub fn placed_orders(&self) -> Vec<OrderResult> {
        let mut orders: Vec<(u64, OrderResult)> = self
            .orders
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        orders.sort_by_key(|(seq, _)| *seq);
        orders.into_iter().map(|(_, order)| order).collect()
    }

    fn unavailable(&self, what: &str) -> GatewayError {
        GatewayError::ConnectionFailed(format!("{} {} unavailable", self.exchange, what))
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> GatewayResult<f64> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tickers.load(Ordering::SeqCst) {
            return Err(self.unavailable("ticker"));
        }
        self.prices
            .get(symbol)
            .map(|p| *p)
            .ok_or_else(|| GatewayError::UnsupportedSymbol(symbol.to_string()))
    }

    async fn fetch_fee(&self, symbol: &Symbol, _side: TradeSide) -> GatewayResult<f64> {
        if self.fail_fees.load(Ordering::SeqCst) {
            return Err(self.unavailable("fee schedule"));
        }
        Ok(self.fees.get(symbol).map(|f| *f).unwrap_or(self.default_fee))
    }

    async fn fetch_order_book(&self, symbol: &Symbol) -> GatewayResult<OrderBook> {
        if self.fail_books.load(Ordering::SeqCst) {
            return Err(self.unavailable("order book"));
        }
        self.books
            .get(symbol)
            .map(|b| b.clone())
            .ok_or_else(|| GatewayError::UnsupportedSymbol(symbol.to_string()))
    }

    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: TradeSide,
        amount: f64,
    ) -> GatewayResult<OrderResult> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(GatewayError::OrderRejected(format!(
                "{} rejected {} {}",
                self.exchange, side, symbol
            )));
        }
        let seq = self.order_seq.fetch_add(1, Ordering::SeqCst);
        let order = OrderResult {
            order_id: format!("{}-{}", self.exchange, seq),
            exchange: self.exchange,
            symbol: symbol.clone(),
            side,
            amount,
            average_price: self.prices.get(symbol).map(|p| *p),
            status: OrderStatus::Filled,
        };
        self.orders.insert(seq, order.clone());
        Ok(order)
    }
}

/// Provider handing out pre-built mock gateways.
#[derive(Default)]
pub struct MockProvider {
    gateways: Vec<Arc<MockGateway>>,
    fail: bool,
}

impl MockProvider {
    pub fn new(gateways: Vec<Arc<MockGateway>>) -> Self {
        Self {
            gateways,
            fail: false,
        }
    }

    /// Provider whose `connect` always fails.
    pub fn failing() -> Self {
        Self {
            gateways: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl GatewayProvider for MockProvider {
    async fn connect(&self, exchanges: &[Exchange]) -> GatewayResult<Vec<SharedGateway>> {
        if self.fail {
            return Err(GatewayError::ConnectionFailed("mock provider offline".to_string()));
        }
        let gateways: Vec<SharedGateway> = exchanges
            .iter()
            .filter_map(|exchange| self.gateways.iter().find(|g| g.exchange == *exchange))
            .map(|g| Arc::clone(g) as SharedGateway)
            .collect();
        if gateways.is_empty() {
            return Err(GatewayError::UnsupportedExchange(
                "no mock gateway for the requested exchanges".to_string(),
            ));
        }
        Ok(gateways)
    }
}
