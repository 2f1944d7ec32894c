use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tickarb_core::{Exchange, OrderBook, OrderResult, OrderStatus, Symbol, TradeSide};
use tracing::debug;

use crate::rest::{
    check_response, format_quantity, hmac_sha256, parse_decimal, parse_levels, published_taker_fee,
    timestamp_ms, Credentials,
};
use crate::{ExchangeGateway, GatewayError, GatewayResult};

const RECV_WINDOW_MS: u64 = 5000;
const DEPTH_LIMIT: u32 = 20;

/// Binance spot REST gateway.
pub struct BinanceGateway {
    client: Client,
    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct Depth {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeFee {
    symbol: String,
    taker_commission: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrder {
    order_id: u64,
    status: String,
    #[serde(default)]
    executed_qty: String,
    #[serde(default)]
    cummulative_quote_qty: String,
}

impl BinanceGateway {
    pub const BASE_URL: &'static str = "https://api.binance.com";

    pub fn new(client: Client, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn credentials(&self) -> GatewayResult<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            GatewayError::AuthenticationFailed(
                "BINANCE_API_KEY / BINANCE_API_SECRET not configured".to_string(),
            )
        })
    }

    fn signed_query(credentials: &Credentials, params: &str) -> GatewayResult<String> {
        let query = format!(
            "{}&recvWindow={}&timestamp={}",
            params,
            RECV_WINDOW_MS,
            timestamp_ms()
        );
        let signature = hex::encode(hmac_sha256(&credentials.api_secret, &query)?);
        Ok(format!("{}&signature={}", query, signature))
    }
}

fn order_status(raw: &str) -> OrderStatus {
    match raw {
        "FILLED" => OrderStatus::Filled,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "NEW" | "PENDING_NEW" => OrderStatus::Submitted,
        _ => OrderStatus::Rejected,
    }
}

fn average_price(order: &NewOrder) -> Option<f64> {
    let executed = order.executed_qty.parse::<f64>().ok()?;
    let quote = order.cummulative_quote_qty.parse::<f64>().ok()?;
    (executed > 0.0).then(|| quote / executed)
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> GatewayResult<f64> {
        let url = format!("{}/api/v3/ticker/price", Self::BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.concat())])
            .send()
            .await?;
        let ticker: TickerPrice = check_response(response).await?.json().await?;
        parse_decimal(&ticker.price, "price")
    }

    async fn fetch_fee(&self, symbol: &Symbol, _side: TradeSide) -> GatewayResult<f64> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Ok(published_taker_fee(Exchange::Binance));
        };

        let query = Self::signed_query(credentials, &format!("symbol={}", symbol.concat()))?;
        let url = format!("{}/sapi/v1/asset/tradeFee?{}", Self::BASE_URL, query);
        let response = self
            .client
            .get(&url)
            .header("X-MBX-APIKEY", &credentials.api_key)
            .send()
            .await?;
        let fees: Vec<TradeFee> = check_response(response).await?.json().await?;
        let wanted = symbol.concat();
        let fee = fees
            .iter()
            .find(|f| f.symbol == wanted)
            .ok_or_else(|| GatewayError::UnsupportedSymbol(symbol.to_string()))?;
        parse_decimal(&fee.taker_commission, "takerCommission")
    }

    async fn fetch_order_book(&self, symbol: &Symbol) -> GatewayResult<OrderBook> {
        let url = format!("{}/api/v3/depth", Self::BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.concat()),
                ("limit", DEPTH_LIMIT.to_string()),
            ])
            .send()
            .await?;
        let depth: Depth = check_response(response).await?.json().await?;
        Ok(OrderBook::new(parse_levels(&depth.asks)?, parse_levels(&depth.bids)?))
    }

    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: TradeSide,
        amount: f64,
    ) -> GatewayResult<OrderResult> {
        let credentials = self.credentials()?;
        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}",
            symbol.concat(),
            side.as_str().to_ascii_uppercase(),
            format_quantity(amount)
        );
        let query = Self::signed_query(credentials, &params)?;
        let url = format!("{}/api/v3/order?{}", Self::BASE_URL, query);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &credentials.api_key)
            .send()
            .await?;
        let order: NewOrder = match check_response(response).await {
            Ok(response) => response.json().await?,
            Err(GatewayError::HttpStatus { body, .. }) => {
                return Err(GatewayError::OrderRejected(body));
            }
            Err(e) => return Err(e),
        };
        debug!(order_id = order.order_id, status = %order.status, "Binance order placed");

        Ok(OrderResult {
            order_id: order.order_id.to_string(),
            exchange: Exchange::Binance,
            symbol: symbol.clone(),
            side,
            amount,
            average_price: average_price(&order),
            status: order_status(&order.status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_new_order_response() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "orderId": 28,
            "status": "FILLED",
            "executedQty": "0.00100000",
            "cummulativeQuoteQty": "65.43210000",
            "type": "MARKET",
            "side": "BUY"
        }"#;
        let order: NewOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_id, 28);
        assert_eq!(order_status(&order.status), OrderStatus::Filled);
        let avg = average_price(&order).unwrap();
        assert!((avg - 65432.1).abs() < 1e-6);
    }

    #[test]
    fn test_unfilled_order_has_no_average_price() {
        let json = r#"{"orderId": 7, "status": "NEW", "executedQty": "0", "cummulativeQuoteQty": "0"}"#;
        let order: NewOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order_status(&order.status), OrderStatus::Submitted);
        assert_eq!(average_price(&order), None);
    }

    #[test]
    fn test_order_status_mapping() {
        assert_eq!(order_status("PARTIALLY_FILLED"), OrderStatus::PartiallyFilled);
        assert_eq!(order_status("EXPIRED"), OrderStatus::Rejected);
    }

    #[test]
    fn test_parse_trade_fee() {
        let json = r#"[{"symbol": "BTCUSDT", "makerCommission": "0.001", "takerCommission": "0.00075"}]"#;
        let fees: Vec<TradeFee> = serde_json::from_str(json).unwrap();
        assert_eq!(fees[0].symbol, "BTCUSDT");
        assert_eq!(parse_decimal(&fees[0].taker_commission, "takerCommission").unwrap(), 0.00075);
    }

    #[tokio::test]
    async fn test_fee_without_credentials_uses_published_rate() {
        let gateway = BinanceGateway::new(Client::new(), None);
        let symbol = Symbol::new("BTC", "USDT").unwrap();
        assert_eq!(gateway.fetch_fee(&symbol, TradeSide::Buy).await.unwrap(), 0.001);
    }

    #[tokio::test]
    async fn test_order_without_credentials_fails() {
        let gateway = BinanceGateway::new(Client::new(), None);
        let symbol = Symbol::new("BTC", "USDT").unwrap();
        let result = gateway.place_market_order(&symbol, TradeSide::Buy, 0.001).await;
        assert!(matches!(result, Err(GatewayError::AuthenticationFailed(_))));
    }
}
