//! Placement input checks.
//!
//! Runs before any lock is taken. Market and runner checks live in the
//! catalog since they depend on shared state.

use backlay_types::{BacklayError, EngineConfig, Result, constants};
use rust_decimal::Decimal;

/// Price and stake limits taken from [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct PlacementLimits {
    max_price: Decimal,
    max_stake: Decimal,
    price_precision: u32,
    stake_precision: u32,
}

impl PlacementLimits {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_price: config.max_price,
            max_stake: config.max_stake,
            price_precision: config.price_precision,
            stake_precision: config.stake_precision,
        }
    }

    /// Decimal odds must be above 1, at most `max_price`, and carry no more
    /// decimal places than the configured precision.
    pub fn check_price(&self, price: Decimal) -> Result<()> {
        if price <= constants::MIN_PRICE_EXCLUSIVE {
            return Err(BacklayError::validation(format!(
                "price must be greater than {}, got {price}",
                constants::MIN_PRICE_EXCLUSIVE
            )));
        }
        if price > self.max_price {
            return Err(BacklayError::validation(format!(
                "price {price} exceeds maximum {}",
                self.max_price
            )));
        }
        if price.normalize().scale() > self.price_precision {
            return Err(BacklayError::validation(format!(
                "price {price} has more than {} decimal places",
                self.price_precision
            )));
        }
        Ok(())
    }

    /// Stakes must be positive, at most `max_stake`, and within the stake
    /// precision. With `max_price` this bounds every reservation.
    pub fn check_stake(&self, stake: Decimal) -> Result<()> {
        if stake <= Decimal::ZERO {
            return Err(BacklayError::validation(format!(
                "stake must be positive, got {stake}"
            )));
        }
        if stake > self.max_stake {
            return Err(BacklayError::validation(format!(
                "stake {stake} exceeds maximum {}",
                self.max_stake
            )));
        }
        if stake.normalize().scale() > self.stake_precision {
            return Err(BacklayError::validation(format!(
                "stake {stake} has more than {} decimal places",
                self.stake_precision
            )));
        }
        Ok(())
    }
}
