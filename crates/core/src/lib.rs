//! Core data types for the arbitrage bot.

pub mod exchange;
pub mod execution;
pub mod opportunity;
pub mod price;
pub mod settings;
pub mod status;
pub mod symbol;

pub use exchange::*;
pub use execution::*;
pub use opportunity::*;
pub use price::*;
pub use settings::*;
pub use status::*;
pub use symbol::*;
