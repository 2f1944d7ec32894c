//! Error types for gateway operations.

use thiserror::Error;

/// Errors that can occur while talking to an exchange.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    #[error("Exchange not supported: {0}")]
    UnsupportedExchange(String),

    #[error("Symbol not supported: {0}")]
    UnsupportedSymbol(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if err.is_decode() {
            GatewayError::ParseError(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::HttpStatus {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            GatewayError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::ParseError(err.to_string())
    }
}

impl GatewayError {
    /// Returns true if this error is transient and the next poll may well succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::ConnectionFailed(_)
            | GatewayError::Timeout(_)
            | GatewayError::RateLimitExceeded => true,
            GatewayError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error needs operator attention (bad keys, unknown venue).
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthenticationFailed(_) | GatewayError::UnsupportedExchange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Timeout("ticker".into()).is_transient());
        assert!(GatewayError::RateLimitExceeded.is_transient());
        assert!(GatewayError::HttpStatus { status: 503, body: String::new() }.is_transient());
        assert!(!GatewayError::HttpStatus { status: 400, body: String::new() }.is_transient());
        assert!(!GatewayError::UnsupportedSymbol("X/Y".into()).is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(GatewayError::AuthenticationFailed("no key".into()).is_permanent());
        assert!(GatewayError::UnsupportedExchange("mtgox".into()).is_permanent());
        assert!(!GatewayError::Timeout("depth".into()).is_permanent());
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(GatewayError::from(err), GatewayError::ParseError(_)));
    }
}
