//! Error types for the execution engine.

use thiserror::Error;
use tickarb_feeds::GatewayError;
use tickarb_journal::JournalError;

/// Errors raised while the engine loop runs.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("gateway initialisation failed: {0}")]
    Init(#[source] GatewayError),

    #[error("journal write failed: {0}")]
    Journal(#[from] JournalError),
}

impl EngineError {
    /// Fatal errors stop the engine; anything else is recorded and the loop
    /// moves on to the next symbol.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Init(_))
    }
}

/// Errors returned to the control surface.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Bot is already running")]
    AlreadyRunning,
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
