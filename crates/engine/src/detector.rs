//! Arbitrage opportunity detection.
//!
//! Spatial detection compares one symbol across exchanges. Triangular
//! detection compares a direct price with the price implied by going
//! through an intermediate asset on a single exchange.

use crate::DetectError;
use tickarb_core::{ConversionStep, Opportunity, PriceQuote, PriceSnapshot, Symbol, TradeSide};
use tickarb_feeds::{ExchangeGateway, GatewayError, GatewayResult};
use tracing::{debug, info, warn};

/// Find the best cross-exchange pair in `snapshot`.
///
/// Quotes are stable-sorted ascending by price. The buy side is the first
/// entry and the sell side the last, so among equal minimum prices the
/// first-seen exchange buys and among equal maximum prices the last-seen
/// exchange sells. At most one opportunity is returned.
pub fn find_spatial(snapshot: &PriceSnapshot, min_profit_threshold: f64) -> Vec<Opportunity> {
    if snapshot.len() < 2 {
        debug!(symbol = %snapshot.symbol(), quotes = snapshot.len(), "Not enough quotes");
        return Vec::new();
    }

    let mut sorted: Vec<&PriceQuote> = snapshot.quotes().iter().collect();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

    let (Some(buy), Some(sell)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    let spread = sell.price - buy.price;
    if spread <= min_profit_threshold || spread <= 0.0 {
        debug!(
            symbol = %snapshot.symbol(),
            spread,
            threshold = min_profit_threshold,
            "Spread below threshold"
        );
        return Vec::new();
    }

    Opportunity::spatial(
        snapshot.symbol().clone(),
        buy.exchange,
        buy.price,
        sell.exchange,
        sell.price,
    )
    .into_iter()
    .collect()
}

/// Outcome of one triangular scan.
#[derive(Debug, Default)]
pub struct TriangularScan {
    pub opportunities: Vec<Opportunity>,
    /// Why the scan was skipped, if it was.
    pub failure: Option<DetectError>,
}

/// Look for a triangular mispricing on one gateway.
///
/// `implied = price(INTER/QUOTE) * price(BASE/INTER)` is what one BASE fetches
/// when sold through the intermediate asset. When it beats the direct
/// BASE/QUOTE price the path buys BASE directly and sells it around the
/// triangle back into QUOTE.
///
/// Never fails: a bad or unavailable leg is logged as a warning and yields
/// no opportunities, with the cause kept in [`TriangularScan::failure`].
pub async fn find_triangular(
    gateway: &dyn ExchangeGateway,
    base: &str,
    quote: &str,
    intermediate: &str,
) -> TriangularScan {
    match scan_triangle(gateway, base, quote, intermediate).await {
        Ok(opportunities) => TriangularScan {
            opportunities,
            failure: None,
        },
        Err(e) => {
            warn!(exchange = %gateway.exchange(), error = %e, "Triangular scan skipped");
            TriangularScan {
                opportunities: Vec::new(),
                failure: Some(e),
            }
        }
    }
}

async fn scan_triangle(
    gateway: &dyn ExchangeGateway,
    base: &str,
    quote: &str,
    intermediate: &str,
) -> Result<Vec<Opportunity>, DetectError> {
    let direct_symbol = Symbol::new(base, quote)?;
    let inter_quote_symbol = Symbol::new(intermediate, quote)?;
    let base_inter_symbol = Symbol::new(base, intermediate)?;

    let (direct, inter_quote, base_inter) = tokio::join!(
        gateway.fetch_ticker(&direct_symbol),
        gateway.fetch_ticker(&inter_quote_symbol),
        gateway.fetch_ticker(&base_inter_symbol),
    );

    let leg = |symbol: &Symbol, result: GatewayResult<f64>| -> Result<f64, DetectError> {
        match result {
            Ok(price) if f64::is_finite(price) && price > 0.0 => Ok(price),
            Ok(price) => Err(DetectError::LegUnavailable {
                symbol: symbol.clone(),
                source: GatewayError::InvalidPrice(price),
            }),
            Err(source) => Err(DetectError::LegUnavailable {
                symbol: symbol.clone(),
                source,
            }),
        }
    };

    let direct = leg(&direct_symbol, direct)?;
    let inter_quote = leg(&inter_quote_symbol, inter_quote)?;
    let base_inter = leg(&base_inter_symbol, base_inter)?;

    let implied = inter_quote * base_inter;
    if implied <= direct {
        debug!(
            exchange = %gateway.exchange(),
            symbol = %direct_symbol,
            direct,
            implied,
            "No triangular mispricing"
        );
        return Ok(Vec::new());
    }

    let path = vec![
        ConversionStep {
            symbol: direct_symbol.clone(),
            side: TradeSide::Buy,
            price: direct,
        },
        ConversionStep {
            symbol: base_inter_symbol,
            side: TradeSide::Sell,
            price: base_inter,
        },
        ConversionStep {
            symbol: inter_quote_symbol,
            side: TradeSide::Sell,
            price: inter_quote,
        },
    ];

    let opportunity = Opportunity::triangular(gateway.exchange(), direct_symbol, direct, implied, path);
    if let Some(opp) = &opportunity {
        info!(exchange = %gateway.exchange(), opportunity = %opp, "Triangular opportunity");
    }
    Ok(opportunity.into_iter().collect())
}
