//! Match records: the immutable audit trail of back/lay pairings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketId, MatchId, WagerId};

/// One pairing between a back wager and a lay wager.
///
/// The price is always the resting wager's price. Records are written once
/// by the matcher and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub back_wager_id: WagerId,
    pub lay_wager_id: WagerId,
    pub matched_amount: Decimal,
    pub price: Decimal,
    pub market: MarketId,
    pub runner: String,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    /// The backer's stake plus the layer's liability for this pairing.
    /// Whoever wins the pairing receives the whole pool.
    #[must_use]
    pub fn pool(&self) -> Decimal {
        self.matched_amount * self.price
    }

    /// The layer's liability: `matched_amount × (price − 1)`.
    #[must_use]
    pub fn liability(&self) -> Decimal {
        self.matched_amount * (self.price - Decimal::ONE)
    }

    #[must_use]
    pub fn involves(&self, wager_id: &WagerId) -> bool {
        self.back_wager_id == *wager_id || self.lay_wager_id == *wager_id
    }
}

impl std::fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Match[{}] {}/{} {} @ {}",
            self.id, self.market, self.runner, self.matched_amount, self.price,
        )
    }
}
