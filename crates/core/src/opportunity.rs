//! Arbitrage opportunity types.

use crate::{Exchange, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static OPPORTUNITY_ID: AtomicU64 = AtomicU64::new(1);

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityKind {
    /// Buy on one exchange, sell the same symbol on another.
    Spatial,
    /// Three conversions around a currency triangle on one exchange.
    Triangular,
}

/// One conversion of a triangular path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionStep {
    pub symbol: Symbol,
    pub side: TradeSide,
    pub price: f64,
}

impl fmt::Display for ConversionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            TradeSide::Buy => write!(
                f,
                "Buy {} with {} @ {}",
                self.symbol.base(),
                self.symbol.quote(),
                self.price
            ),
            TradeSide::Sell => write!(
                f,
                "Sell {} for {} @ {}",
                self.symbol.base(),
                self.symbol.quote(),
                self.price
            ),
        }
    }
}

/// A detected price discrepancy, before fees.
///
/// Constructors refuse to build an opportunity unless `buy_price < sell_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: u64,
    pub kind: OpportunityKind,
    pub symbol: Symbol,
    pub buy_exchange: Exchange,
    pub sell_exchange: Exchange,
    pub buy_price: f64,
    pub sell_price: f64,
    pub gross_spread: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<ConversionStep>,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Cross-exchange opportunity: buy `symbol` on `buy_exchange`, sell on `sell_exchange`.
    pub fn spatial(
        symbol: Symbol,
        buy_exchange: Exchange,
        buy_price: f64,
        sell_exchange: Exchange,
        sell_price: f64,
    ) -> Option<Self> {
        Self::build(
            OpportunityKind::Spatial,
            symbol,
            buy_exchange,
            buy_price,
            sell_exchange,
            sell_price,
            Vec::new(),
        )
    }

    /// Single-exchange triangle. `direct_price` is the BASE/QUOTE price and
    /// `implied_price` the BASE price reached through the intermediate asset.
    pub fn triangular(
        exchange: Exchange,
        symbol: Symbol,
        direct_price: f64,
        implied_price: f64,
        path: Vec<ConversionStep>,
    ) -> Option<Self> {
        Self::build(
            OpportunityKind::Triangular,
            symbol,
            exchange,
            direct_price,
            exchange,
            implied_price,
            path,
        )
    }

    fn build(
        kind: OpportunityKind,
        symbol: Symbol,
        buy_exchange: Exchange,
        buy_price: f64,
        sell_exchange: Exchange,
        sell_price: f64,
        path: Vec<ConversionStep>,
    ) -> Option<Self> {
        if !buy_price.is_finite() || !sell_price.is_finite() || buy_price >= sell_price {
            return None;
        }
        Some(Self {
            id: OPPORTUNITY_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            symbol,
            buy_exchange,
            sell_exchange,
            buy_price,
            sell_price,
            gross_spread: sell_price - buy_price,
            path,
            detected_at: Utc::now(),
        })
    }

    /// Spread relative to the buy price, in basis points.
    pub fn spread_bps(&self) -> f64 {
        self.gross_spread / self.buy_price * 10_000.0
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OpportunityKind::Spatial => write!(
                f,
                "{} buy {}@{} sell {}@{} spread {:.8} ({:.1} bps)",
                self.symbol,
                self.buy_exchange,
                self.buy_price,
                self.sell_exchange,
                self.sell_price,
                self.gross_spread,
                self.spread_bps()
            ),
            OpportunityKind::Triangular => {
                write!(f, "{} triangle on {}:", self.symbol, self.buy_exchange)?;
                for (i, step) in self.path.iter().enumerate() {
                    write!(f, " {}) {}", i + 1, step)?;
                }
                write!(f, " spread {:.8} ({:.1} bps)", self.gross_spread, self.spread_bps())
            }
        }
    }
}

/// An opportunity after fee and liquidity evaluation. This is what gets
/// persisted to the opportunity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedOpportunity {
    #[serde(flatten)]
    pub opportunity: Opportunity,
    pub trade_amount: f64,
    pub buy_fee: f64,
    pub sell_fee: f64,
    /// Expected profit after fees in quote currency; negative means do not trade.
    pub net_profit: f64,
    pub liquidity_ok: bool,
}

impl EvaluatedOpportunity {
    pub fn is_profitable(&self) -> bool {
        self.net_profit > 0.0
    }

    /// Whether the engine should record a trade for this opportunity.
    pub fn is_actionable(&self) -> bool {
        self.opportunity.kind == OpportunityKind::Spatial && self.is_profitable() && self.liquidity_ok
    }
}

impl fmt::Display for EvaluatedOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | amount {} fees {}/{} net {:.8} liquidity {}",
            self.opportunity,
            self.trade_amount,
            self.buy_fee,
            self.sell_fee,
            self.net_profit,
            if self.liquidity_ok { "ok" } else { "insufficient" }
        )
    }
}
