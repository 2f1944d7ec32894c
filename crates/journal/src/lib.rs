//! Durable records of what the engine saw and did.
//!
//! - [`OpportunityLog`] keeps the last evaluated opportunities as a JSON array.
//! - [`TradeLog`] appends one JSON trade record per line and is never rewritten.

pub mod error;
pub mod opportunity_log;
pub mod trade_log;

pub use error::{JournalError, JournalResult};
pub use opportunity_log::*;
pub use trade_log::*;
