//! Fixed-point numeric and probability kernel.
//!
//! Every public function is pure and deterministic, takes/returns
//! `Decimal`, and never panics: division by zero returns zero rather than
//! propagating an error, since these are hot-path calculations called once
//! per market per tick.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use statrs::distribution::{ContinuousCDF, Normal};

/// `price / max_payout`, the probability a price implies.
pub fn implied_prob(price: Decimal, max_payout: Decimal) -> Decimal {
    if max_payout.is_zero() {
        return Decimal::ZERO;
    }
    price / max_payout
}

/// Kelly fraction for a binary bet: true probability `p`, market price `price`,
/// fee rate `fee`. Returns 0 whenever `p <= price / (1 - fee)`.
pub fn kelly(p: Decimal, price: Decimal, fee: Decimal) -> Decimal {
    let denom = Decimal::ONE - fee;
    if denom.is_zero() {
        return Decimal::ZERO;
    }
    let effective_price = price / denom;
    if p <= effective_price {
        return Decimal::ZERO;
    }
    let kelly_denom = Decimal::ONE - effective_price;
    if kelly_denom <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let f = (p - effective_price) / kelly_denom;
    f.clamp(Decimal::ZERO, Decimal::ONE)
}

/// Fee-adjusted expected value of a unit bet at `price` with true probability `p`.
pub fn ev(p: Decimal, price: Decimal, fee: Decimal) -> Decimal {
    p * (Decimal::ONE - price) * (Decimal::ONE - fee) - (Decimal::ONE - p) * price
}

/// Minimum true probability needed to break even at `price` after `fee`.
/// Returns 1 if `fee >= 1` (no price could ever break even).
pub fn break_even(price: Decimal, fee: Decimal) -> Decimal {
    let denom = Decimal::ONE - fee;
    if denom <= Decimal::ZERO {
        return Decimal::ONE;
    }
    price / denom
}

/// Result of a proportional YES+NO arbitrage allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbAllocation {
    pub net: Decimal,
    pub yes_alloc: Decimal,
    pub no_alloc: Decimal,
    pub gross: Decimal,
}

/// Split `invest` across YES (`yes` price) and NO (`no` price) so both legs
/// produce the same share count, guaranteeing an equal payoff regardless of
/// outcome. `fee` is applied to the combined allocation.
pub fn proportional_arb(yes: Decimal, no: Decimal, invest: Decimal, fee: Decimal) -> ArbAllocation {
    let total_cost = yes + no;
    if total_cost.is_zero() {
        return ArbAllocation {
            net: Decimal::ZERO,
            yes_alloc: Decimal::ZERO,
            no_alloc: Decimal::ZERO,
            gross: Decimal::ZERO,
        };
    }

    let yes_alloc = invest * yes / total_cost;
    let no_alloc = invest * no / total_cost;
    let shares = invest / total_cost;
    let gross = shares - invest;
    let fees = (yes_alloc + no_alloc) * fee;
    let net = gross - fees;

    ArbAllocation {
        net,
        yes_alloc,
        no_alloc,
        gross,
    }
}

/// Standard normal CDF `Φ(z)`, used only to turn a momentum z-score into a
/// probability. Binary-float boundary: this is the one place floats are
/// allowed to touch a probability before it is converted back to `Decimal`.
pub fn normal_cdf(z: f64) -> Decimal {
    let normal = match Normal::new(0.0, 1.0) {
        Ok(n) => n,
        Err(_) => return dec!(0.5),
    };
    let p = normal.cdf(z);
    if !p.is_finite() {
        return dec!(0.5);
    }
    Decimal::from_f64_retain(p.clamp(0.0, 1.0)).unwrap_or(dec!(0.5))
}
