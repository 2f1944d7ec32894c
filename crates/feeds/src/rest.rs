//! Shared REST plumbing: HTTP client, credentials, request signing and the
//! provider that builds gateways for the configured exchanges.

use crate::adapter::{BinanceGateway, KucoinGateway};
use crate::{GatewayError, GatewayProvider, GatewayResult, SharedGateway};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Response, StatusCode};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tickarb_core::Exchange;
use tracing::{info, warn};

/// Per-request timeout applied to every gateway call.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// API credentials for private endpoints.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Load credentials from `<EXCHANGE>_API_KEY`, `<EXCHANGE>_API_SECRET` and,
    /// for KuCoin, `KUCOIN_API_PASSPHRASE`.
    pub fn from_env(exchange: Exchange) -> Option<Self> {
        let prefix = exchange.as_str().to_ascii_uppercase();
        let api_key = std::env::var(format!("{}_API_KEY", prefix)).ok()?;
        let api_secret = std::env::var(format!("{}_API_SECRET", prefix)).ok()?;
        if api_key.is_empty() || api_secret.is_empty() {
            return None;
        }

        let credentials = Self::new(api_key, api_secret);
        match std::env::var(format!("{}_API_PASSPHRASE", prefix)) {
            Ok(passphrase) if !passphrase.is_empty() => Some(credentials.with_passphrase(passphrase)),
            _ => Some(credentials),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Published spot taker rates, used when the account-specific rate cannot be
/// queried (no credentials).
pub fn published_taker_fee(exchange: Exchange) -> f64 {
    match exchange {
        Exchange::Binance => 0.001,
        Exchange::Kucoin => 0.001,
        Exchange::Kraken => 0.0026,
        Exchange::Coinbase => 0.006,
        Exchange::Okx => 0.001,
        Exchange::Bybit => 0.001,
        Exchange::GateIO => 0.002,
    }
}

pub(crate) fn hmac_sha256(secret: &str, payload: &str) -> GatewayResult<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::AuthenticationFailed(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn parse_decimal(raw: &str, field: &str) -> GatewayResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GatewayError::ParseError(format!("{}: not a number: {:?}", field, raw)))
}

/// Parse `[["price", "qty"], ...]` depth levels.
pub(crate) fn parse_levels(raw: &[[String; 2]]) -> GatewayResult<Vec<(f64, f64)>> {
    raw.iter()
        .map(|[price, qty]| Ok((parse_decimal(price, "price")?, parse_decimal(qty, "qty")?)))
        .collect()
}

/// Order quantity without float noise or trailing zeros.
pub(crate) fn format_quantity(amount: f64) -> String {
    let formatted = format!("{:.8}", amount);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Map non-success HTTP responses to gateway errors.
pub(crate) async fn check_response(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimitExceeded,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::AuthenticationFailed(body),
        _ => GatewayError::HttpStatus {
            status: status.as_u16(),
            body,
        },
    })
}

/// Builds REST gateways for every exchange that has one.
///
/// Exchanges without a REST gateway are skipped with a warning. Connecting
/// fails only when nothing usable is left.
pub struct RestProvider {
    client: Client,
    credentials: HashMap<Exchange, Credentials>,
}

impl RestProvider {
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionFailed(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            client,
            credentials: HashMap::new(),
        })
    }

    /// Provider with credentials read from the environment.
    pub fn from_env(timeout: Duration) -> GatewayResult<Self> {
        let mut provider = Self::new(timeout)?;
        for exchange in Self::supported() {
            match Credentials::from_env(*exchange) {
                Some(credentials) => provider = provider.with_credentials(*exchange, credentials),
                None => info!(exchange = %exchange, "API keys not configured, public endpoints only"),
            }
        }
        Ok(provider)
    }

    pub fn with_credentials(mut self, exchange: Exchange, credentials: Credentials) -> Self {
        self.credentials.insert(exchange, credentials);
        self
    }

    /// Exchanges with a REST gateway.
    pub fn supported() -> &'static [Exchange] {
        &[Exchange::Binance, Exchange::Kucoin]
    }

    fn build(&self, exchange: Exchange) -> Option<SharedGateway> {
        let credentials = self.credentials.get(&exchange).cloned();
        match exchange {
            Exchange::Binance => Some(Arc::new(BinanceGateway::new(self.client.clone(), credentials))),
            Exchange::Kucoin => Some(Arc::new(KucoinGateway::new(self.client.clone(), credentials))),
            _ => None,
        }
    }
}

#[async_trait]
impl GatewayProvider for RestProvider {
    async fn connect(&self, exchanges: &[Exchange]) -> GatewayResult<Vec<SharedGateway>> {
        let mut gateways = Vec::with_capacity(exchanges.len());
        for &exchange in exchanges {
            match self.build(exchange) {
                Some(gateway) => {
                    info!(
                        exchange = %exchange,
                        authenticated = self.credentials.contains_key(&exchange),
                        "Gateway ready"
                    );
                    gateways.push(gateway);
                }
                None => warn!(exchange = %exchange, "No gateway available, skipping"),
            }
        }

        if gateways.is_empty() {
            let requested: Vec<&str> = exchanges.iter().map(|e| e.as_str()).collect();
            return Err(GatewayError::UnsupportedExchange(format!(
                "no gateway for any of [{}]",
                requested.join(", ")
            )));
        }
        Ok(gateways)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binance_signature_vector() {
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        let signature = hex::encode(hmac_sha256(secret, query).unwrap());
        assert_eq!(
            signature,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(0.001), "0.001");
        assert_eq!(format_quantity(1.0), "1");
        assert_eq!(format_quantity(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_parse_levels() {
        let raw = vec![
            ["100.5".to_string(), "2".to_string()],
            ["100.4".to_string(), "0.25".to_string()],
        ];
        assert_eq!(parse_levels(&raw).unwrap(), vec![(100.5, 2.0), (100.4, 0.25)]);

        let bad = vec![["abc".to_string(), "1".to_string()]];
        assert!(matches!(parse_levels(&bad), Err(GatewayError::ParseError(_))));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials::new("key", "very-secret").with_passphrase("pass");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("key"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("pass\""));
    }

    #[test]
    fn test_published_fees() {
        assert_eq!(published_taker_fee(Exchange::Binance), 0.001);
        assert_eq!(published_taker_fee(Exchange::Kraken), 0.0026);
    }

    #[tokio::test]
    async fn test_connect_skips_unsupported_exchanges() {
        let provider = RestProvider::new(DEFAULT_HTTP_TIMEOUT).unwrap();
        let gateways = provider
            .connect(&[Exchange::Kraken, Exchange::Binance, Exchange::Kucoin])
            .await
            .unwrap();
        let ids: Vec<Exchange> = gateways.iter().map(|g| g.exchange()).collect();
        assert_eq!(ids, vec![Exchange::Binance, Exchange::Kucoin]);
    }

    #[tokio::test]
    async fn test_connect_fails_without_any_gateway() {
        let provider = RestProvider::new(DEFAULT_HTTP_TIMEOUT).unwrap();
        let result = provider.connect(&[Exchange::Kraken, Exchange::Coinbase]).await;
        assert!(matches!(result, Err(GatewayError::UnsupportedExchange(_))));
    }
}
