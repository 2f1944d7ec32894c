use thiserror::Error;
use tickarb_core::{Symbol, SymbolError};
use tickarb_feeds::GatewayError;

/// Why a triangular scan produced nothing.
#[derive(Debug, Clone, Error)]
pub enum DetectError {
    #[error("invalid triangle leg: {0}")]
    InvalidLeg(#[from] SymbolError),

    #[error("{symbol} leg unavailable: {source}")]
    LegUnavailable {
        symbol: Symbol,
        #[source]
        source: GatewayError,
    },
}
