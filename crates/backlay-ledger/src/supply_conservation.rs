//! Supply conservation invariant checker.
//!
//! ```text
//! Σ(user balances) + Σ(market escrow) == Σ(deposits) − Σ(withdrawals)
//! ```
//!
//! Placement, matching, settlement and cash-out only move value between
//! accounts. If this ever fails, value was created or destroyed.

use backlay_types::{BacklayError, Result};
use rust_decimal::Decimal;

/// Tracks external inflows and outflows and validates the total held.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    deposits: Decimal,
    withdrawals: Decimal,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, amount: Decimal) {
        self.deposits += amount;
    }

    pub fn record_withdrawal(&mut self, amount: Decimal) {
        self.withdrawals += amount;
    }

    /// Expected total value: deposits − withdrawals.
    #[must_use]
    pub fn expected_supply(&self) -> Decimal {
        self.deposits - self.withdrawals
    }

    /// # Errors
    /// Returns [`BacklayError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply();
        if actual_supply != expected {
            return Err(BacklayError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.deposits, self.withdrawals,
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_deposits(&self) -> Decimal {
        self.deposits
    }

    #[must_use]
    pub fn total_withdrawals(&self) -> Decimal {
        self.withdrawals
    }
}
