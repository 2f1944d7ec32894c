//! Arbitrage detection and evaluation.
//!
//! - `detector` - spatial and triangular opportunity detection
//! - `fee` - taker fee resolution with fail-open default
//! - `profit` - net profit after fees
//! - `liquidity` - order book depth check with fail-closed semantics

pub mod detector;
pub mod error;
pub mod fee;
pub mod liquidity;
pub mod profit;

pub use detector::*;
pub use error::*;
pub use fee::*;
pub use liquidity::*;
pub use profit::*;
