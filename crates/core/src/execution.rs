//! Order results and trade records.

use crate::{EvaluatedOpportunity, Exchange, Symbol, TradeSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order status as reported by the exchange right after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted, fill not yet confirmed.
    Submitted,
    PartiallyFilled,
    Filled,
    Rejected,
}

/// Result of a market order placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub exchange: Exchange,
    pub symbol: Symbol,
    pub side: TradeSide,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
    pub status: OrderStatus,
}

/// How a trade was carried out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TradeOutcome {
    /// Simulation mode: nothing was sent to any exchange.
    Simulated,
    /// Live mode: both legs were attempted. A missing order means that leg failed.
    Live {
        buy_order: Option<OrderResult>,
        sell_order: Option<OrderResult>,
    },
}

impl TradeOutcome {
    /// True when every leg that should exist does exist. Simulated trades
    /// are always complete.
    pub fn is_complete(&self) -> bool {
        match self {
            TradeOutcome::Simulated => true,
            TradeOutcome::Live {
                buy_order,
                sell_order,
            } => buy_order.is_some() && sell_order.is_some(),
        }
    }
}

/// One line of the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub opportunity: EvaluatedOpportunity,
    #[serde(flatten)]
    pub outcome: TradeOutcome,
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn simulated(opportunity: EvaluatedOpportunity) -> Self {
        Self {
            opportunity,
            outcome: TradeOutcome::Simulated,
            executed_at: Utc::now(),
        }
    }

    pub fn live(
        opportunity: EvaluatedOpportunity,
        buy_order: Option<OrderResult>,
        sell_order: Option<OrderResult>,
    ) -> Self {
        Self {
            opportunity,
            outcome: TradeOutcome::Live {
                buy_order,
                sell_order,
            },
            executed_at: Utc::now(),
        }
    }
}
