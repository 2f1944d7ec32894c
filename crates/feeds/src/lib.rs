//! Exchange gateways and price collection.
//!
//! ## Architecture
//!
//! - `gateway` - The [`ExchangeGateway`] capability trait and its provider
//! - `adapter/` - Exchange-specific REST gateways (Binance, KuCoin)
//! - `rest` - Shared HTTP client, credentials and request signing
//! - `aggregator` - Concurrent price fetch across gateways
//! - `mock` - In-memory gateway for tests and dry runs

pub mod adapter;
pub mod aggregator;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod rest;

pub use adapter::{BinanceGateway, KucoinGateway};
pub use aggregator::*;
pub use error::*;
pub use gateway::*;
pub use mock::*;
pub use rest::{published_taker_fee, Credentials, RestProvider, DEFAULT_HTTP_TIMEOUT};
