//! Net profit after trading fees.

use tickarb_core::{EvaluatedOpportunity, Opportunity};

/// Expected profit in quote currency of trading `trade_amount` units:
///
/// `(sell - buy) * amount - (buy * amount * buy_fee + sell * amount * sell_fee)`
///
/// May be negative.
pub fn evaluate(opportunity: &Opportunity, trade_amount: f64, buy_fee: f64, sell_fee: f64) -> f64 {
    net_profit(
        opportunity.buy_price,
        opportunity.sell_price,
        trade_amount,
        buy_fee,
        sell_fee,
    )
}

fn net_profit(buy: f64, sell: f64, amount: f64, buy_fee: f64, sell_fee: f64) -> f64 {
    let gross = (sell - buy) * amount;
    let fees = buy * amount * buy_fee + sell * amount * sell_fee;
    gross - fees
}

/// Attach sizing, fees, net profit and the liquidity verdict to an opportunity.
pub fn evaluate_opportunity(
    opportunity: Opportunity,
    trade_amount: f64,
    buy_fee: f64,
    sell_fee: f64,
    liquidity_ok: bool,
) -> EvaluatedOpportunity {
    let net_profit = evaluate(&opportunity, trade_amount, buy_fee, sell_fee);
    EvaluatedOpportunity {
        opportunity,
        trade_amount,
        buy_fee,
        sell_fee,
        net_profit,
        liquidity_ok,
    }
}
