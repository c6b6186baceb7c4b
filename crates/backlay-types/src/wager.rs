//! Wager types for the Backlay exchange.
//!
//! A wager reserves funds the moment it is placed. A back wager reserves its
//! stake; a lay wager reserves its liability `stake × (price − 1)`. The
//! reserved amount sits in the market's escrow until settlement or cash-out
//! releases it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BookKey, MarketId, UserId, WagerId};

/// Which side of the runner this wager is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// For the runner: wins if the runner wins.
    Back,
    /// Against the runner: wins if the runner loses.
    Lay,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Back => Self::Lay,
            Self::Lay => Self::Back,
        }
    }

    /// Whether a resting wager at `resting_price` on the opposite side is
    /// compatible with an incoming wager on this side at `price`.
    ///
    /// An incoming back at P takes lays priced at or below P. An incoming
    /// lay at P takes backs priced at or above P.
    #[must_use]
    pub fn accepts(self, price: Decimal, resting_price: Decimal) -> bool {
        match self {
            Self::Back => resting_price <= price,
            Self::Lay => resting_price >= price,
        }
    }

    /// Funds a wager on this side must hold for `amount` matched at `price`.
    #[must_use]
    pub fn exposure(self, amount: Decimal, price: Decimal) -> Decimal {
        match self {
            Self::Back => amount,
            Self::Lay => amount * (price - Decimal::ONE),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Back => write!(f, "back"),
            Self::Lay => write!(f, "lay"),
        }
    }
}

/// Lifecycle status of a wager.
///
/// ```text
/// unmatched ──▶ partial ──▶ matched
///     │            │           │
///     ├────────────┴───────────┴──▶ settled     (terminal)
///                  └───────────┴──▶ cashed_out  (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerStatus {
    Unmatched,
    Partial,
    Matched,
    Settled,
    CashedOut,
}

impl WagerStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::CashedOut)
    }
}

impl std::fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmatched => write!(f, "unmatched"),
            Self::Partial => write!(f, "partial"),
            Self::Matched => write!(f, "matched"),
            Self::Settled => write!(f, "settled"),
            Self::CashedOut => write!(f, "cashed_out"),
        }
    }
}

/// A single back or lay wager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub owner: UserId,
    pub market: MarketId,
    pub runner: String,
    pub side: Side,
    /// Requested decimal odds.
    pub price: Decimal,
    pub stake: Decimal,
    pub matched_amount: Decimal,
    pub status: WagerStatus,
    /// Submission number; breaks ties between equal prices.
    pub sequence: u64,
    /// Total moved from the owner's balance into escrow for this wager.
    pub reserved: Decimal,
    /// Portion of `reserved` backing matched positions.
    pub committed: Decimal,
    /// Amount paid to the owner on cash-out.
    pub cash_out_value: Option<Decimal>,
    pub placed_at: DateTime<Utc>,
    /// Set when the wager reaches a terminal state (settled or cashed out).
    pub settled_at: Option<DateTime<Utc>>,
}

impl Wager {
    /// A freshly placed, unmatched wager holding its initial reservation.
    #[must_use]
    pub fn new(
        owner: UserId,
        market: MarketId,
        runner: impl Into<String>,
        side: Side,
        price: Decimal,
        stake: Decimal,
        sequence: u64,
    ) -> Self {
        Self {
            id: WagerId::new(),
            owner,
            market,
            runner: runner.into(),
            side,
            price,
            stake,
            matched_amount: Decimal::ZERO,
            status: WagerStatus::Unmatched,
            sequence,
            reserved: side.exposure(stake, price),
            committed: Decimal::ZERO,
            cash_out_value: None,
            placed_at: Utc::now(),
            settled_at: None,
        }
    }

    #[must_use]
    pub fn book_key(&self) -> BookKey {
        BookKey::new(self.market.clone(), self.runner.clone())
    }

    /// Stake not yet paired with a counterparty.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.stake - self.matched_amount
    }

    /// Reserved funds not backing any matched position.
    #[must_use]
    pub fn uncommitted(&self) -> Decimal {
        self.reserved - self.committed
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this wager still rests in the book.
    #[must_use]
    pub fn is_resting(&self) -> bool {
        !self.is_terminal() && self.remaining() > Decimal::ZERO
    }

    /// Record a fill of `amount` at `price`.
    ///
    /// `price` is the match price, which for an incoming lay may sit above
    /// its requested price; the caller reserves the difference beforehand.
    pub fn apply_fill(&mut self, amount: Decimal, price: Decimal) {
        debug_assert!(amount > Decimal::ZERO && amount <= self.remaining());
        self.matched_amount += amount;
        self.committed += self.side.exposure(amount, price);
        self.status = self.derived_status();
    }

    /// Status implied by the matched amount. Terminal states are sticky.
    #[must_use]
    pub fn derived_status(&self) -> WagerStatus {
        if self.is_terminal() {
            self.status
        } else if self.matched_amount.is_zero() {
            WagerStatus::Unmatched
        } else if self.matched_amount < self.stake {
            WagerStatus::Partial
        } else {
            WagerStatus::Matched
        }
    }

    /// Move to a terminal state. Returns `false` if already terminal.
    pub fn finish(&mut self, status: WagerStatus, at: DateTime<Utc>) -> bool {
        debug_assert!(status.is_terminal());
        if self.is_terminal() {
            return false;
        }
        self.status = status;
        self.settled_at = Some(at);
        true
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Wager {
    pub fn dummy(side: Side, price: Decimal, stake: Decimal) -> Self {
        Self::new(
            UserId::from("tester"),
            MarketId::from("1.100"),
            "Home",
            side,
            price,
            stake,
            0,
        )
    }

    pub fn dummy_for_user(
        owner: &str,
        side: Side,
        price: Decimal,
        stake: Decimal,
        sequence: u64,
    ) -> Self {
        Self::new(
            UserId::from(owner),
            MarketId::from("1.100"),
            "Home",
            side,
            price,
            stake,
            sequence,
        )
    }
}
