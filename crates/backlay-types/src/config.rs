//! Configuration types for the Backlay engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BacklayError, Result, UserId, constants};

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Account that funds cash-outs and inherits their settlement claims.
    pub house_account: UserId,
    /// Highest decimal odds accepted on placement or cash-out.
    pub max_price: Decimal,
    /// Largest stake accepted on placement.
    pub max_stake: Decimal,
    /// Maximum decimal places on a price.
    pub price_precision: u32,
    /// Maximum decimal places on a stake.
    pub stake_precision: u32,
    /// Skip resting wagers owned by the incoming wager's owner.
    pub self_match_prevention: bool,
    /// Page size used when a history query does not give one.
    pub history_page_size: usize,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            house_account: UserId::from(constants::DEFAULT_HOUSE_ACCOUNT),
            max_price: constants::MAX_PRICE,
            max_stake: constants::MAX_STAKE,
            price_precision: constants::PRICE_PRECISION,
            stake_precision: constants::STAKE_PRECISION,
            self_match_prevention: true,
            history_page_size: constants::DEFAULT_HISTORY_PAGE_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields fall back to defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| BacklayError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_price <= constants::MIN_PRICE_EXCLUSIVE {
            return Err(BacklayError::Configuration(format!(
                "max_price {} must exceed {}",
                self.max_price,
                constants::MIN_PRICE_EXCLUSIVE
            )));
        }
        if self.max_stake <= Decimal::ZERO {
            return Err(BacklayError::Configuration(format!(
                "max_stake {} must be positive",
                self.max_stake
            )));
        }
        let within_ceiling = self
            .max_stake
            .checked_mul(self.max_price)
            .is_some_and(|exposure| exposure <= constants::MAX_EXPOSURE);
        if !within_ceiling {
            return Err(BacklayError::Configuration(format!(
                "max_stake {} × max_price {} exceeds {}",
                self.max_stake,
                self.max_price,
                constants::MAX_EXPOSURE
            )));
        }
        if self.history_page_size == 0 {
            return Err(BacklayError::Configuration(
                "history_page_size must be > 0".into(),
            ));
        }
        if self.house_account.as_str().is_empty() {
            return Err(BacklayError::Configuration(
                "house_account must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
