//! Alert delivery.
//!
//! [`Notifier`] wraps an [`AlertTransport`] and never fails its caller.
//! Transports: [`LogTransport`], [`TelegramTransport`] and the in-memory
//! [`MemoryTransport`].

pub mod config;
pub mod notifier;
pub mod telegram;

pub use config::TelegramConfig;
pub use notifier::*;
pub use telegram::TelegramTransport;
