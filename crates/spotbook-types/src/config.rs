//! Market module parameters.

use serde::{Deserialize, Serialize};

use crate::{MarketError, Result, constants};

/// Governance-controlled parameters of the market module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    /// Fee charged to the creator of a new trading pair.
    pub create_market_fee: u64,
    /// Denom in which `create_market_fee` is charged.
    pub fee_denom: String,
    /// Lifetime of a GTE order that does not request one, in blocks.
    pub gte_order_lifetime: i64,
    /// Longest lifetime a GTE order may request, in blocks.
    pub max_gte_order_lifetime: i64,
    /// Minimum delay from a delist request to its effective time, in seconds.
    pub market_min_expired_time: i64,
    /// Finest price precision a pair may declare.
    pub max_price_precision: u32,
    /// Width of a cleanup bucket, in seconds.
    pub cleanup_interval_secs: i64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            create_market_fee: constants::DEFAULT_CREATE_MARKET_FEE,
            fee_denom: constants::DEFAULT_FEE_DENOM.to_string(),
            gte_order_lifetime: constants::DEFAULT_GTE_ORDER_LIFETIME,
            max_gte_order_lifetime: constants::DEFAULT_MAX_GTE_ORDER_LIFETIME,
            market_min_expired_time: constants::DEFAULT_MARKET_MIN_EXPIRED_TIME,
            max_price_precision: constants::MAX_PRICE_PRECISION,
            cleanup_interval_secs: constants::DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }
}

impl MarketParams {
    /// Parse parameters from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| MarketError::Configuration(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fee_denom.is_empty() {
            return Err(MarketError::Configuration("fee_denom is empty".into()));
        }
        if self.gte_order_lifetime <= 0 {
            return Err(MarketError::Configuration(format!(
                "gte_order_lifetime must be positive, got {}",
                self.gte_order_lifetime
            )));
        }
        if self.max_gte_order_lifetime < self.gte_order_lifetime {
            return Err(MarketError::Configuration(format!(
                "max_gte_order_lifetime {} is below gte_order_lifetime {}",
                self.max_gte_order_lifetime, self.gte_order_lifetime
            )));
        }
        if self.market_min_expired_time < 0 {
            return Err(MarketError::Configuration(
                "market_min_expired_time is negative".into(),
            ));
        }
        if self.max_price_precision > constants::DECIMAL_MAX_SCALE {
            return Err(MarketError::Configuration(format!(
                "max_price_precision {} exceeds {}",
                self.max_price_precision,
                constants::DECIMAL_MAX_SCALE
            )));
        }
        if self.cleanup_interval_secs <= 0 {
            return Err(MarketError::Configuration(
                "cleanup_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
