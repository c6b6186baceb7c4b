//! Error types for the Backlay exchange.
//!
//! All errors use the `BX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Wager errors
//! - 2xx: Balance errors
//! - 3xx: Market errors
//! - 6xx: Settlement / ledger integrity errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{MarketId, UserId, WagerId};

/// Central error enum for all Backlay operations.
#[derive(Debug, Error)]
pub enum BacklayError {
    // =================================================================
    // Wager Errors (1xx)
    // =================================================================
    /// The request was malformed (bad price, bad stake, bad exit price).
    #[error("BX_ERR_100: Validation failed: {reason}")]
    ValidationError { reason: String },

    /// The requested wager does not exist.
    #[error("BX_ERR_101: Bet not found: {0}")]
    BetNotFound(WagerId),

    /// The wager exists but cannot be cashed out by this caller right now.
    #[error("BX_ERR_102: Bet {wager_id} not eligible for cash-out: {reason}")]
    BetNotEligibleForCashOut { wager_id: WagerId, reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough balance to cover the debit.
    #[error("BX_ERR_200: Insufficient funds for {user}: need {needed}, have {available}")]
    InsufficientFunds {
        user: UserId,
        needed: Decimal,
        available: Decimal,
    },

    // =================================================================
    // Market Errors (3xx)
    // =================================================================
    /// The market is not in the catalog, or the runner is not part of it.
    #[error("BX_ERR_300: Unknown market or runner: {market}/{runner}")]
    UnknownMarketOrRunner { market: MarketId, runner: String },

    /// The market no longer accepts placements.
    #[error("BX_ERR_301: Market closed: {0}")]
    MarketClosed(MarketId),

    /// The market has already been settled (settle-once guard).
    #[error("BX_ERR_302: Market already settled: {0}")]
    MarketAlreadySettled(MarketId),

    // =================================================================
    // Settlement / Ledger Integrity Errors (6xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical.
    #[error("BX_ERR_600: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// A ledger entry digest does not chain to its predecessor.
    #[error("BX_ERR_601: Ledger chain broken at entry {seq}")]
    LedgerChainBroken { seq: u64 },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("BX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("BX_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl BacklayError {
    /// `true` for rejections caused by business rules (bad input, funds,
    /// market state). `false` for integrity and infrastructure faults.
    #[must_use]
    pub fn is_business_rejection(&self) -> bool {
        matches!(
            self,
            Self::ValidationError { .. }
                | Self::BetNotFound(_)
                | Self::BetNotEligibleForCashOut { .. }
                | Self::InsufficientFunds { .. }
                | Self::UnknownMarketOrRunner { .. }
                | Self::MarketClosed(_)
                | Self::MarketAlreadySettled(_)
        )
    }

    /// Numeric code printed after the `BX_ERR_` prefix.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::ValidationError { .. } => 100,
            Self::BetNotFound(_) => 101,
            Self::BetNotEligibleForCashOut { .. } => 102,
            Self::InsufficientFunds { .. } => 200,
            Self::UnknownMarketOrRunner { .. } => 300,
            Self::MarketClosed(_) => 301,
            Self::MarketAlreadySettled(_) => 302,
            Self::SupplyInvariantViolation { .. } => 600,
            Self::LedgerChainBroken { .. } => 601,
            Self::Internal(_) => 900,
            Self::Serialization(_) => 901,
            Self::Configuration(_) => 902,
        }
    }

    /// Shorthand for [`BacklayError::ValidationError`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationError {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BacklayError>;

impl From<serde_json::Error> for BacklayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = BacklayError::BetNotFound(WagerId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("BX_ERR_101"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_display() {
        let err = BacklayError::InsufficientFunds {
            user: UserId::from("alice"),
            needed: Decimal::new(50, 0),
            available: Decimal::new(10, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("BX_ERR_200"));
        assert!(msg.contains("alice"));
        assert!(msg.contains("50"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = vec![
            BacklayError::validation("stake must be positive"),
            BacklayError::MarketClosed(MarketId::from("1.1")),
            BacklayError::MarketAlreadySettled(MarketId::from("1.1")),
            BacklayError::LedgerChainBroken { seq: 7 },
            BacklayError::Internal("boom".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with(&format!("BX_ERR_{}", err.code())),
                "code {} does not match {msg}",
                err.code()
            );
        }
    }

    #[test]
    fn business_rejections_are_distinguished_from_faults() {
        assert!(BacklayError::MarketClosed(MarketId::from("m")).is_business_rejection());
        assert!(
            BacklayError::UnknownMarketOrRunner {
                market: MarketId::from("m"),
                runner: "r".into(),
            }
            .is_business_rejection()
        );
        assert!(
            !BacklayError::SupplyInvariantViolation {
                reason: "x".into()
            }
            .is_business_rejection()
        );
        assert!(!BacklayError::Configuration("bad".into()).is_business_rejection());
    }
}
