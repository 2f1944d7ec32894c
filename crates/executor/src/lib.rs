//! Run/stop lifecycle and trade execution for arbitrage opportunities.
//!
//! [`ExecutionEngine`] owns the background loop. The control surface reads
//! status and settings through [`StatusHandle`] and [`ConfigHandle`].

pub mod engine;
pub mod error;
pub mod order;
pub mod state;

pub use engine::ExecutionEngine;
pub use error::*;
pub use order::{place_legs, LegResults};
pub use state::{ConfigHandle, StatusHandle};
