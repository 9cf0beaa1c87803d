//! Edge detector: compares a model's estimated probability against the
//! market's own implied probability, discounted by how close the market is
//! to expiry (late-window noise is less trustworthy than mid-window signal).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::trade::TradeSide;
use crate::numeric::kelly;

pub struct EdgeConfig {
    pub min_confidence: Decimal,
    pub min_edge: Decimal,
    pub kelly_fraction: Decimal,
    pub max_position_pct: Decimal,
    pub fee_rate: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeResult {
    pub side: TradeSide,
    pub edge: Decimal,
    pub adjusted_confidence: Decimal,
    pub recommended_size: Decimal,
}

/// Multiplier applied to raw confidence based on fraction of time-to-expiry
/// remaining (`tau / total_duration`). The market gets least trustworthy
/// mid-decay and most trustworthy right after open and right before close.
pub fn expiry_confidence_multiplier(time_fraction_remaining: Decimal) -> Decimal {
    if time_fraction_remaining > dec!(0.8) {
        dec!(0.6)
    } else if time_fraction_remaining > dec!(0.4) {
        dec!(1.0)
    } else if time_fraction_remaining > dec!(0.2) {
        dec!(0.8)
    } else if time_fraction_remaining > dec!(0.07) {
        dec!(0.4)
    } else {
        dec!(0.2)
    }
}

/// Stateless, pure function of its inputs: given the market's own implied
/// probabilities and a model's estimate of the true probability of UP,
/// decides whether either side clears the bar to trade.
#[allow(clippy::too_many_arguments)]
pub fn detect_edge(
    yes_ask: Decimal,
    no_ask: Decimal,
    estimated_prob_up: Decimal,
    raw_confidence: Decimal,
    time_fraction_remaining: Decimal,
    config: &EdgeConfig,
) -> Option<EdgeResult> {
    let estimated_prob_down = Decimal::ONE - estimated_prob_up;

    let edge_up = estimated_prob_up - yes_ask;
    let edge_down = estimated_prob_down - no_ask;

    let multiplier = expiry_confidence_multiplier(time_fraction_remaining);
    let adjusted_confidence = raw_confidence * multiplier;

    if adjusted_confidence < config.min_confidence {
        return None;
    }

    let ev_up = edge_up - yes_ask * config.fee_rate;
    let ev_down = edge_down - no_ask * config.fee_rate;

    let up_qualifies = edge_up >= config.min_edge && ev_up > Decimal::ZERO;
    let down_qualifies = edge_down >= config.min_edge && ev_down > Decimal::ZERO;

    // UP is preferred whenever it qualifies, regardless of edge magnitude.
    let (side, edge, true_prob, price) = if up_qualifies {
        (TradeSide::Yes, edge_up, estimated_prob_up, yes_ask)
    } else if down_qualifies {
        (TradeSide::No, edge_down, estimated_prob_down, no_ask)
    } else {
        return None;
    };

    let f = kelly(true_prob, price, config.fee_rate);
    let size = (f * config.kelly_fraction * adjusted_confidence).clamp(Decimal::ZERO, config.max_position_pct);

    Some(EdgeResult {
        side,
        edge,
        adjusted_confidence,
        recommended_size: size,
    })
}
