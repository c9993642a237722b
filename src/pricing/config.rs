use serde::{Deserialize, Serialize};

/// Tunable pricing parameters
///
/// All values are finite and non-negative once built through
/// [`PricingConfig::from_row`] or [`Default`], and `impact_max_multiplier`
/// is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    /// Largest share of the total pool a single side is priced at
    pub side_cap_ratio: f64,
    /// Smallest share of the total the opposing side is priced at
    pub other_floor_ratio: f64,
    /// Relative stabilizer for thin markets
    pub min_pool_ratio: f64,
    /// Absolute stabilizer for thin markets
    pub min_absolute_pool: f64,
    /// Slope of the impact fee against stake/pool ratio
    pub impact_fee_coefficient: f64,
    /// Pool depth assumed when the real pool is shallower
    pub impact_min_pool: f64,
    /// Ceiling of the impact multiplier
    pub impact_max_multiplier: f64,
    pub min_odds: f64,
    pub max_odds: f64,
    /// Odds shown for a market with no stake at all
    pub default_odds: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            side_cap_ratio: 0.5,
            other_floor_ratio: 0.1,
            min_pool_ratio: 0.4,
            min_absolute_pool: 10.0,
            impact_fee_coefficient: 0.5,
            impact_min_pool: 100.0,
            impact_max_multiplier: 1.5,
            min_odds: 1.01,
            max_odds: 9.0,
            default_odds: 1.5,
        }
    }
}

/// One row of the persisted config table, as read
///
/// Every column is nullable; nothing here is trusted until it passes
/// through [`PricingConfig::from_row`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PricingConfigRow {
    pub side_cap_ratio: Option<f64>,
    pub other_floor_ratio: Option<f64>,
    pub min_pool_ratio: Option<f64>,
    pub min_absolute_pool: Option<f64>,
    pub impact_fee_coefficient: Option<f64>,
    pub impact_min_pool: Option<f64>,
    pub impact_max_multiplier: Option<f64>,
    pub min_odds: Option<f64>,
    pub max_odds: Option<f64>,
    pub default_odds: Option<f64>,
}

impl From<PricingConfig> for PricingConfigRow {
    fn from(config: PricingConfig) -> Self {
        Self {
            side_cap_ratio: Some(config.side_cap_ratio),
            other_floor_ratio: Some(config.other_floor_ratio),
            min_pool_ratio: Some(config.min_pool_ratio),
            min_absolute_pool: Some(config.min_absolute_pool),
            impact_fee_coefficient: Some(config.impact_fee_coefficient),
            impact_min_pool: Some(config.impact_min_pool),
            impact_max_multiplier: Some(config.impact_max_multiplier),
            min_odds: Some(config.min_odds),
            max_odds: Some(config.max_odds),
            default_odds: Some(config.default_odds),
        }
    }
}

impl PricingConfig {
    /// Build a config from a stored row, field by field
    ///
    /// A missing, non-finite or negative value is replaced by that field's
    /// built-in default; valid fields are kept as stored. A multiplier
    /// ceiling below 1 is invalid too.
    pub fn from_row(row: &PricingConfigRow) -> Self {
        let defaults = Self::default();
        Self {
            side_cap_ratio: or_default(row.side_cap_ratio, defaults.side_cap_ratio),
            other_floor_ratio: or_default(row.other_floor_ratio, defaults.other_floor_ratio),
            min_pool_ratio: or_default(row.min_pool_ratio, defaults.min_pool_ratio),
            min_absolute_pool: or_default(row.min_absolute_pool, defaults.min_absolute_pool),
            impact_fee_coefficient: or_default(
                row.impact_fee_coefficient,
                defaults.impact_fee_coefficient,
            ),
            impact_min_pool: or_default(row.impact_min_pool, defaults.impact_min_pool),
            impact_max_multiplier: match row.impact_max_multiplier {
                Some(v) if v.is_finite() && v >= 1.0 => v,
                _ => defaults.impact_max_multiplier,
            },
            min_odds: or_default(row.min_odds, defaults.min_odds),
            max_odds: or_default(row.max_odds, defaults.max_odds),
            default_odds: or_default(row.default_odds, defaults.default_odds),
        }
    }
}

fn or_default(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => default,
    }
}
