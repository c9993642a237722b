use serde::{Deserialize, Serialize};

use super::config::PricingConfig;
use crate::common::types::{MarketOdds, Side, TradeImpact};

/// Result of pricing a stake against the pool it lands in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAdjustedStake {
    /// Portion of the stake credited to the pool
    pub effective_stake: f64,
    /// Portion withheld as slippage
    pub impact_fee: f64,
    /// Divisor applied to the stake, in `[1, impact_max_multiplier]`
    pub impact_multiplier: f64,
}

/// Pool-based odds pricing
///
/// Every function here is pure and deterministic, so it can be called from
/// any task without coordination.
pub struct PricingEngine;

impl PricingEngine {
    /// Decimal odds for one side of a market
    ///
    /// # Arguments
    /// * `total_pool` - Combined stake on both sides
    /// * `side_pool` - Stake on the side being priced
    /// * `config` - Current pricing parameters
    ///
    /// # Returns
    /// Odds rounded to 2 decimals, always within `[min_odds, max_odds]`
    pub fn compute_odds(total_pool: f64, side_pool: f64, config: &PricingConfig) -> f64 {
        let positive_total = non_negative(total_pool);
        let positive_side = non_negative(side_pool);

        if (total_pool <= 0.0 && side_pool <= 0.0) || positive_total == 0.0 {
            return clamp_odds(config.default_odds, config);
        }

        // One side is never priced as more than its capped share of the total
        let capped_side = positive_side.min(positive_total * config.side_cap_ratio);
        let actual_other = (positive_total - positive_side).max(0.0);

        // The opposing side is never priced below these floors
        let min_other_by_ratio = positive_total * config.other_floor_ratio;
        let floor_pool = (positive_total * config.min_pool_ratio).max(config.min_absolute_pool);

        let effective_other = actual_other.max(min_other_by_ratio).max(floor_pool);
        let effective_total = capped_side + effective_other;
        let denominator = capped_side.max(config.min_absolute_pool);

        if denominator <= 0.0 {
            return clamp_odds(config.max_odds, config);
        }

        let raw_odds = effective_total / denominator;
        if raw_odds.is_nan() {
            return clamp_odds(config.default_odds, config);
        }

        // Round before clamping so the bounds hold exactly
        clamp_odds(round2(raw_odds), config)
    }

    /// Odds for both sides from the two pool sizes
    pub fn compute_market_odds(yes_pool: f64, no_pool: f64, config: &PricingConfig) -> MarketOdds {
        let yes_pool = non_negative(yes_pool);
        let no_pool = non_negative(no_pool);
        let total_pool = yes_pool + no_pool;

        MarketOdds {
            yes_odds: Self::compute_odds(total_pool, yes_pool, config),
            no_odds: Self::compute_odds(total_pool, no_pool, config),
            yes_pool,
            no_pool,
            total_pool,
        }
    }

    /// Slippage for a stake relative to the depth of the pool it joins
    ///
    /// Large stakes against thin pools are credited at less than face
    /// value. The multiplier is capped at `impact_max_multiplier`, so the fee
    /// never exceeds the configured ceiling however large the stake.
    pub fn compute_impact_adjusted_stake(
        amount: f64,
        pool_before: f64,
        config: &PricingConfig,
    ) -> ImpactAdjustedStake {
        if !amount.is_finite() || amount <= 0.0 {
            return ImpactAdjustedStake {
                effective_stake: 0.0,
                impact_fee: 0.0,
                impact_multiplier: 1.0,
            };
        }

        let max_multiplier = config.impact_max_multiplier.max(1.0);
        let safe_pool = non_negative(pool_before)
            .max(config.impact_min_pool)
            .max(1.0);
        let ratio = amount / safe_pool;

        let surcharge = (ratio * config.impact_fee_coefficient).min(max_multiplier - 1.0);
        let mut impact_multiplier = (1.0 + surcharge).min(max_multiplier);
        if !impact_multiplier.is_finite() {
            impact_multiplier = max_multiplier;
        }

        let effective_stake = round2(amount / impact_multiplier);
        let impact_fee = (amount - effective_stake).max(0.0);

        ImpactAdjustedStake {
            effective_stake,
            impact_fee,
            impact_multiplier,
        }
    }

    /// Price a trade: platform fee first, then impact on the remainder
    ///
    /// # Arguments
    /// * `side` - Side being backed
    /// * `amount` - Gross stake
    /// * `fee_amount` - Platform fee withheld before the stake reaches the pool
    /// * `pool_before` - Size of the backed side's pool before this trade
    /// * `config` - Current pricing parameters
    pub fn trade_impact(
        side: Side,
        amount: f64,
        fee_amount: f64,
        pool_before: f64,
        config: &PricingConfig,
    ) -> TradeImpact {
        let amount = non_negative(amount);
        let fee_amount = non_negative(fee_amount).min(amount);
        let stake = Self::compute_impact_adjusted_stake(amount - fee_amount, pool_before, config);

        TradeImpact {
            side,
            amount,
            net_contribution: stake.effective_stake,
            impact_fee: stake.impact_fee,
            impact_multiplier: stake.impact_multiplier,
            fee_amount,
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Never panics, even for a misconfigured `min_odds > max_odds` (max wins)
fn clamp_odds(value: f64, config: &PricingConfig) -> f64 {
    value.max(config.min_odds).min(config.max_odds)
}

fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        value
    }
}
