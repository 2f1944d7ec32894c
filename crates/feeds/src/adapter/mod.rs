//! Exchange-specific REST gateways.

mod binance;
mod kucoin;

pub use binance::BinanceGateway;
pub use kucoin::KucoinGateway;
