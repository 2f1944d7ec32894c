use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tickarb_core::{Exchange, OrderBook, OrderResult, OrderStatus, Symbol, TradeSide};
use tracing::debug;

use crate::rest::{
    check_response, format_quantity, hmac_sha256, parse_decimal, parse_levels, published_taker_fee,
    timestamp_ms, Credentials,
};
use crate::{ExchangeGateway, GatewayError, GatewayResult};

const SUCCESS_CODE: &str = "200000";
const RATE_LIMIT_CODE: &str = "429000";

/// KuCoin spot REST gateway.
pub struct KucoinGateway {
    client: Client,
    credentials: Option<Credentials>,
    client_oid: AtomicU64,
}

/// Every KuCoin response is wrapped in `{"code": "...", "data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, symbol: &Symbol) -> GatewayResult<T> {
        match self.code.as_str() {
            SUCCESS_CODE => self
                .data
                .ok_or_else(|| GatewayError::UnsupportedSymbol(symbol.to_string())),
            RATE_LIMIT_CODE => Err(GatewayError::RateLimitExceeded),
            code if code.starts_with("4000") => Err(GatewayError::AuthenticationFailed(
                self.msg.unwrap_or_else(|| code.to_string()),
            )),
            code => Err(GatewayError::HttpStatus {
                status: 200,
                body: format!("{} {}", code, self.msg.unwrap_or_default()),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Level1 {
    price: String,
}

#[derive(Debug, Deserialize)]
struct Level2 {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeFee {
    symbol: String,
    taker_fee_rate: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    order_id: String,
}

impl KucoinGateway {
    pub const BASE_URL: &'static str = "https://api.kucoin.com";

    pub fn new(client: Client, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
            client_oid: AtomicU64::new(0),
        }
    }

    fn credentials(&self) -> GatewayResult<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            GatewayError::AuthenticationFailed(
                "KUCOIN_API_KEY / KUCOIN_API_SECRET / KUCOIN_API_PASSPHRASE not configured"
                    .to_string(),
            )
        })
    }

    fn market(symbol: &Symbol) -> String {
        symbol.joined("-")
    }

    /// Attach KC-API-* headers. `endpoint` includes the query string.
    fn signed(
        &self,
        credentials: &Credentials,
        method: Method,
        endpoint: &str,
        body: &str,
    ) -> GatewayResult<RequestBuilder> {
        let passphrase = credentials.passphrase.as_deref().ok_or_else(|| {
            GatewayError::AuthenticationFailed("KUCOIN_API_PASSPHRASE not configured".to_string())
        })?;
        let timestamp = timestamp_ms().to_string();
        let prehash = format!("{}{}{}{}", timestamp, method.as_str(), endpoint, body);
        let signature = STANDARD.encode(hmac_sha256(&credentials.api_secret, &prehash)?);
        let signed_passphrase = STANDARD.encode(hmac_sha256(&credentials.api_secret, passphrase)?);

        Ok(self
            .client
            .request(method, format!("{}{}", Self::BASE_URL, endpoint))
            .header("KC-API-KEY", &credentials.api_key)
            .header("KC-API-SIGN", signature)
            .header("KC-API-TIMESTAMP", timestamp)
            .header("KC-API-PASSPHRASE", signed_passphrase)
            .header("KC-API-KEY-VERSION", "2"))
    }

    fn next_client_oid(&self) -> String {
        let seq = self.client_oid.fetch_add(1, Ordering::Relaxed);
        format!("tickarb-{}-{}", timestamp_ms(), seq)
    }
}

#[async_trait]
impl ExchangeGateway for KucoinGateway {
    fn exchange(&self) -> Exchange {
        Exchange::Kucoin
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> GatewayResult<f64> {
        let url = format!("{}/api/v1/market/orderbook/level1", Self::BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", Self::market(symbol))])
            .send()
            .await?;
        let envelope: Envelope<Level1> = check_response(response).await?.json().await?;
        let level1 = envelope.into_data(symbol)?;
        parse_decimal(&level1.price, "price")
    }

    async fn fetch_fee(&self, symbol: &Symbol, _side: TradeSide) -> GatewayResult<f64> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Ok(published_taker_fee(Exchange::Kucoin));
        };

        let endpoint = format!("/api/v1/trade-fees?symbols={}", Self::market(symbol));
        let response = self
            .signed(credentials, Method::GET, &endpoint, "")?
            .send()
            .await?;
        let envelope: Envelope<Vec<TradeFee>> = check_response(response).await?.json().await?;
        let market = Self::market(symbol);
        let fees = envelope.into_data(symbol)?;
        let fee = fees
            .iter()
            .find(|f| f.symbol == market)
            .ok_or_else(|| GatewayError::UnsupportedSymbol(symbol.to_string()))?;
        parse_decimal(&fee.taker_fee_rate, "takerFeeRate")
    }

    async fn fetch_order_book(&self, symbol: &Symbol) -> GatewayResult<OrderBook> {
        let url = format!("{}/api/v1/market/orderbook/level2_20", Self::BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", Self::market(symbol))])
            .send()
            .await?;
        let envelope: Envelope<Level2> = check_response(response).await?.json().await?;
        let depth = envelope.into_data(symbol)?;
        Ok(OrderBook::new(parse_levels(&depth.asks)?, parse_levels(&depth.bids)?))
    }

    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: TradeSide,
        amount: f64,
    ) -> GatewayResult<OrderResult> {
        let credentials = self.credentials()?;
        let body = serde_json::json!({
            "clientOid": self.next_client_oid(),
            "side": side.as_str(),
            "symbol": Self::market(symbol),
            "type": "market",
            "size": format_quantity(amount),
        })
        .to_string();

        let response = self
            .signed(credentials, Method::POST, "/api/v1/orders", &body)?
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        let envelope: Envelope<OrderAck> = check_response(response).await?.json().await?;
        let ack = envelope.into_data(symbol).map_err(|e| match e {
            GatewayError::HttpStatus { body, .. } => GatewayError::OrderRejected(body),
            other => other,
        })?;
        debug!(order_id = %ack.order_id, "KuCoin order placed");

        // Market orders are acknowledged before the fill is known.
        Ok(OrderResult {
            order_id: ack.order_id,
            exchange: Exchange::Kucoin,
            symbol: symbol.clone(),
            side,
            amount,
            average_price: None,
            status: OrderStatus::Submitted,
        })
    }
}
