//! Price-time matcher.
//!
//! Matching is split in two so the caller can fund the result in between:
//!
//! ```text
//! plan_fills(&book, &incoming)        -> FillPlan       (read-only)
//! apply_plan(&mut book, incoming, &plan) -> (Wager, Vec<MatchRecord>)
//! ```
//!
//! Both run under the runner book's lock. The plan is a pure function of
//! the book and the incoming wager, so nothing can change between the two
//! calls as long as the lock is held.
//!
//! ## Ordering
//!
//! An incoming back at P takes lays priced at or below P, highest first.
//! An incoming lay at P takes backs priced at or above P, lowest first.
//! Equal prices fill oldest first. Every fill is priced at the resting
//! wager's price.
//!
//! ## Self-match prevention
//!
//! When enabled, a resting wager owned by the incoming wager's owner is
//! skipped. It stays in the book and the walk continues past it.

use backlay_types::{BacklayError, MatchId, MatchRecord, Result, Side, Wager, WagerId};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::orderbook::RunnerBook;

/// One planned pairing against a resting wager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub resting_id: WagerId,
    pub amount: Decimal,
    /// The resting wager's price.
    pub price: Decimal,
}

/// Fills an incoming wager would receive, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillPlan {
    pub fills: Vec<Fill>,
    pub self_matches_skipped: usize,
}

impl FillPlan {
    /// Total stake the incoming wager would have matched.
    #[must_use]
    pub fn matched(&self) -> Decimal {
        self.fills.iter().map(|f| f.amount).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Liability an incoming lay must reserve on top of its own, for fills
    /// at resting back prices above its requested price.
    #[must_use]
    pub fn lay_top_up(&self, incoming: &Wager) -> Decimal {
        match incoming.side {
            Side::Back => Decimal::ZERO,
            Side::Lay => self
                .fills
                .iter()
                .map(|f| f.amount * (f.price - incoming.price))
                .sum(),
        }
    }

    /// Everything the incoming wager's owner must move into escrow.
    #[must_use]
    pub fn reservation(&self, incoming: &Wager) -> Decimal {
        incoming.reserved + self.lay_top_up(incoming)
    }
}

/// Walk the opposing side and decide the fills for `incoming`.
#[must_use]
pub fn plan_fills(book: &RunnerBook, incoming: &Wager, self_match_prevention: bool) -> FillPlan {
    let mut plan = FillPlan::default();
    let mut remaining = incoming.remaining();

    for resting in book.candidates(incoming.side, incoming.price) {
        if remaining.is_zero() {
            break;
        }
        if self_match_prevention && resting.owner == incoming.owner {
            plan.self_matches_skipped += 1;
            continue;
        }
        let amount = remaining.min(resting.remaining());
        if amount <= Decimal::ZERO {
            continue;
        }
        plan.fills.push(Fill {
            resting_id: resting.id,
            amount,
            price: resting.price,
        });
        remaining -= amount;
    }
    plan
}

/// Execute `plan` against `book`.
///
/// Fills the resting wagers, takes filled ones off their levels, writes one
/// [`MatchRecord`] per fill, and admits `incoming` (resting if it still has
/// unmatched stake). Returns the incoming wager's final state and the new
/// records.
///
/// The caller must have reserved [`FillPlan::reservation`] for the incoming
/// wager before calling this.
pub fn apply_plan(
    book: &mut RunnerBook,
    mut incoming: Wager,
    plan: &FillPlan,
) -> Result<(Wager, Vec<MatchRecord>)> {
    for fill in &plan.fills {
        let resting = book.get(&fill.resting_id).ok_or_else(|| {
            BacklayError::Internal(format!("planned fill against unknown wager {}", fill.resting_id))
        })?;
        if resting.side == incoming.side || fill.amount > resting.remaining() {
            return Err(BacklayError::Internal(format!(
                "stale fill plan for wager {}",
                fill.resting_id
            )));
        }
    }
    if plan.matched() > incoming.remaining() {
        return Err(BacklayError::Internal(format!(
            "fill plan overfills wager {}",
            incoming.id
        )));
    }

    incoming.reserved += plan.lay_top_up(&incoming);
    let now = Utc::now();
    let mut records = Vec::with_capacity(plan.fills.len());

    for fill in &plan.fills {
        let Some(resting) = book.get_mut(&fill.resting_id) else {
            continue;
        };
        resting.apply_fill(fill.amount, fill.price);
        let exhausted = !resting.is_resting();
        let resting_owner = resting.owner.clone();

        incoming.apply_fill(fill.amount, fill.price);

        let (back_wager_id, lay_wager_id) = match incoming.side {
            Side::Back => (incoming.id, fill.resting_id),
            Side::Lay => (fill.resting_id, incoming.id),
        };
        let record = MatchRecord {
            id: MatchId::new(),
            back_wager_id,
            lay_wager_id,
            matched_amount: fill.amount,
            price: fill.price,
            market: incoming.market.clone(),
            runner: incoming.runner.clone(),
            created_at: now,
        };
        tracing::debug!(
            match_id = %record.id,
            book = %book.key,
            incoming = %incoming.id,
            resting = %fill.resting_id,
            resting_owner = %resting_owner,
            amount = %fill.amount,
            price = %fill.price,
            "wagers matched"
        );
        records.push(record);

        if exhausted {
            book.unrest(&fill.resting_id);
        }
    }

    book.admit(incoming.clone())?;
    Ok((incoming, records))
}
