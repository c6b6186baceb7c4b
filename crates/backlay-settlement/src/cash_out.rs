//! Cash-out: early exit from a matched position before settlement.
//!
//! The position's payout is `Σ matched × price` over the wager's match
//! records. At an exit price `e` the runner's implied probability is
//! `q = 1 / e`, so the fair value of the position is
//!
//! ```text
//! back: payout × q
//! lay:  payout × (1 − q)
//! ```
//!
//! truncated to the money precision. The house account pays that value to
//! the owner and takes over the position's claim at settlement. Any
//! unmatched remainder is refunded and leaves the book.

use std::sync::Arc;

use backlay_ledger::AccountLedger;
use backlay_matchcore::{BookRegistry, MarketCatalog, MatchRecordLedger};
use backlay_types::{
    BacklayError, EngineConfig, EntryRef, MarketStatus, Posting, Result, Side, UserId, Wager,
    WagerId, WagerStatus, constants,
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Outcome of a successful cash-out.
#[derive(Debug, Clone, Serialize)]
pub struct CashOutReceipt {
    /// The wager in its final `cashed_out` state.
    pub wager: Wager,
    pub exit_price: Decimal,
    /// Σ `matched × price` over the wager's records.
    pub payout: Decimal,
    /// Credited to the owner by the house.
    pub value: Decimal,
    /// Unmatched remainder returned from escrow.
    pub refunded: Decimal,
}

/// Value of a position with `payout` at `exit_price`.
///
/// # Errors
/// `ValidationError` if `exit_price` is not above 1.
pub fn cash_out_value(side: Side, payout: Decimal, exit_price: Decimal) -> Result<Decimal> {
    check_exit_price(exit_price)?;
    let q = Decimal::ONE / exit_price;
    let raw = match side {
        Side::Back => payout * q,
        Side::Lay => payout * (Decimal::ONE - q),
    };
    Ok(raw.round_dp_with_strategy(constants::MONEY_PRECISION, RoundingStrategy::ToZero))
}

fn check_exit_price(exit_price: Decimal) -> Result<()> {
    if exit_price <= constants::MIN_PRICE_EXCLUSIVE {
        return Err(BacklayError::validation(format!(
            "exit price must be greater than {}, got {exit_price}",
            constants::MIN_PRICE_EXCLUSIVE
        )));
    }
    Ok(())
}

pub struct CashOutDesk {
    catalog: Arc<MarketCatalog>,
    books: Arc<BookRegistry>,
    matches: Arc<MatchRecordLedger>,
    ledger: Arc<AccountLedger>,
    house: UserId,
    max_price: Decimal,
    price_precision: u32,
}

impl CashOutDesk {
    /// A desk paying from `config.house_account`, accepting exit prices up
    /// to `config.max_price` at the configured price precision.
    #[must_use]
    pub fn new(
        catalog: Arc<MarketCatalog>,
        books: Arc<BookRegistry>,
        matches: Arc<MatchRecordLedger>,
        ledger: Arc<AccountLedger>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            catalog,
            books,
            matches,
            ledger,
            house: config.house_account.clone(),
            max_price: config.max_price,
            price_precision: config.price_precision,
        }
    }

    fn check_exit_limits(&self, exit_price: Decimal) -> Result<()> {
        check_exit_price(exit_price)?;
        if exit_price > self.max_price {
            return Err(BacklayError::validation(format!(
                "exit price {exit_price} exceeds maximum {}",
                self.max_price
            )));
        }
        if exit_price.normalize().scale() > self.price_precision {
            return Err(BacklayError::validation(format!(
                "exit price {exit_price} has more than {} decimal places",
                self.price_precision
            )));
        }
        Ok(())
    }

    /// Cash out `wager_id` on behalf of `user` at `exit_price`.
    ///
    /// # Errors
    /// - `ValidationError` for an exit price not above 1, above the
    ///   maximum price, or past the price precision
    /// - `BetNotFound` for an unknown wager
    /// - `BetNotEligibleForCashOut` if `user` does not own it, it has no
    ///   matched stake, it is already terminal, or its market is settled
    /// - `InsufficientFunds` if the house cannot pay the value
    pub fn cash_out(
        &self,
        user: &UserId,
        wager_id: &WagerId,
        exit_price: Decimal,
    ) -> Result<CashOutReceipt> {
        self.check_exit_limits(exit_price)?;

        let handle = self
            .books
            .locate(wager_id)
            .and_then(|key| self.books.existing(&key))
            .ok_or(BacklayError::BetNotFound(*wager_id))?;
        let mut book = handle.lock();

        let wager = book
            .get(wager_id)
            .ok_or(BacklayError::BetNotFound(*wager_id))?;
        let ineligible = |reason: String| BacklayError::BetNotEligibleForCashOut {
            wager_id: *wager_id,
            reason,
        };
        if &wager.owner != user {
            return Err(ineligible(format!("{user} does not own this wager")));
        }
        if !matches!(wager.status, WagerStatus::Partial | WagerStatus::Matched) {
            return Err(ineligible(format!("status is {}", wager.status)));
        }
        if self.catalog.status(&wager.market) == Some(MarketStatus::Settled) {
            return Err(ineligible(format!("market {} is settled", wager.market)));
        }

        let payout = self.matches.payout(wager_id);
        let value = cash_out_value(wager.side, payout, exit_price)?;
        let refunded = wager.uncommitted();

        self.ledger.apply(&[
            Posting::Transfer {
                from: self.house.clone(),
                to: user.clone(),
                amount: value,
                reference: EntryRef::Wager(*wager_id),
            },
            Posting::Release {
                market: wager.market.clone(),
                user: user.clone(),
                amount: refunded,
                reference: EntryRef::Wager(*wager_id),
            },
        ])?;

        book.unrest(wager_id);
        let wager = book
            .get_mut(wager_id)
            .ok_or(BacklayError::BetNotFound(*wager_id))?;
        wager.reserved = wager.committed;
        wager.cash_out_value = Some(value);
        wager.finish(WagerStatus::CashedOut, Utc::now());

        tracing::info!(
            wager = %wager_id,
            user = %user,
            side = %wager.side,
            exit_price = %exit_price,
            payout = %payout,
            value = %value,
            refunded = %refunded,
            "wager cashed out"
        );

        Ok(CashOutReceipt {
            wager: wager.clone(),
            exit_price,
            payout,
            value,
            refunded,
        })
    }
}

#[cfg(test)]
mod tests {
    use backlay_matchcore::{apply_plan, plan_fills};
    use backlay_types::{Market, MarketId};

    use super::*;
    use crate::{SettlementJournal, SettlementProcessor};

    fn d(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

    #[test]
    fn value_formula() {
        // payout 100, exit 4.0 → q = 0.25
        assert_eq!(cash_out_value(Side::Back, d(100, 0), d(4, 0)).unwrap(), d(25, 0));
        assert_eq!(cash_out_value(Side::Lay, d(100, 0), d(4, 0)).unwrap(), d(75, 0));
    }

    #[test]
    fn value_truncates_to_money_precision() {
        let v = cash_out_value(Side::Back, d(100, 0), d(3, 0)).unwrap();
        assert_eq!(v, d(3_333_333_333, 8));
    }

    #[test]
    fn exit_price_must_exceed_one() {
        for bad in [Decimal::ONE, Decimal::ZERO, d(-2, 0)] {
            assert!(matches!(
                cash_out_value(Side::Back, d(10, 0), bad),
                Err(BacklayError::ValidationError { .. })
            ));
        }
    }

    struct Fixture {
        books: Arc<BookRegistry>,
        matches: Arc<MatchRecordLedger>,
        ledger: Arc<AccountLedger>,
        catalog: Arc<MarketCatalog>,
        desk: CashOutDesk,
        seq: u64,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = Arc::new(MarketCatalog::new());
            catalog.register_market(Market::open("1.100", "Home v Away", ["Home", "Away"]));
            let books = Arc::new(BookRegistry::new());
            let matches = Arc::new(MatchRecordLedger::new());
            let ledger = Arc::new(AccountLedger::new());
            for (user, amount) in [("house", 1000), ("alice", 100), ("bob", 100)] {
                ledger.open_account(&UserId::from(user), d(amount, 0)).unwrap();
            }
            let desk = CashOutDesk::new(
                Arc::clone(&catalog),
                Arc::clone(&books),
                Arc::clone(&matches),
                Arc::clone(&ledger),
                &EngineConfig::default(),
            );
            Self {
                books,
                matches,
                ledger,
                catalog,
                desk,
                seq: 0,
            }
        }

        fn place(&mut self, user: &str, side: Side, tenths: i64, stake: i64) -> Wager {
            self.seq += 1;
            let wager = Wager::dummy_for_user(user, side, d(tenths, 1), d(stake, 0), self.seq);
            let handle = self.books.book(&wager.book_key());
            let mut book = handle.lock();
            let plan = plan_fills(&book, &wager, true);
            self.ledger
                .apply(&[Posting::Reserve {
                    user: wager.owner.clone(),
                    market: wager.market.clone(),
                    amount: plan.reservation(&wager),
                    reference: EntryRef::Wager(wager.id),
                }])
                .unwrap();
            self.books.index(&wager);
            let (placed, records) = apply_plan(&mut book, wager, &plan).unwrap();
            self.matches.append(records);
            placed
        }

        fn balance(&self, user: &str) -> Decimal {
            self.ledger.balance(&UserId::from(user))
        }

        fn processor(&self) -> SettlementProcessor {
            SettlementProcessor::new(
                Arc::clone(&self.catalog),
                Arc::clone(&self.books),
                Arc::clone(&self.matches),
                Arc::clone(&self.ledger),
                Arc::new(SettlementJournal::new()),
                UserId::from("house"),
            )
        }
    }

    #[test]
    fn matched_back_cashes_out_and_house_takes_claim() {
        let mut fx = Fixture::new();
        let back = fx.place("alice", Side::Back, 20, 50);
        fx.place("bob", Side::Lay, 20, 50);

        let receipt = fx.desk.cash_out(&UserId::from("alice"), &back.id, d(4, 0)).unwrap();
        assert_eq!(receipt.payout, d(100, 0));
        assert_eq!(receipt.value, d(25, 0));
        assert_eq!(receipt.wager.status, WagerStatus::CashedOut);
        assert_eq!(receipt.wager.cash_out_value, Some(d(25, 0)));
        assert_eq!(fx.balance("alice"), d(75, 0));
        assert_eq!(fx.balance("house"), d(975, 0));

        fx.processor().settle_market(&MarketId::from("1.100"), "Home").unwrap();
        assert_eq!(fx.balance("alice"), d(75, 0));
        assert_eq!(fx.balance("house"), d(1075, 0));
        assert_eq!(fx.balance("bob"), d(50, 0));
        assert!(fx.ledger.verify_supply().is_ok());
        assert_eq!(
            fx.books.snapshot(&back.id).unwrap().status,
            WagerStatus::CashedOut
        );
    }

    #[test]
    fn partial_cash_out_refunds_remainder_and_leaves_book() {
        let mut fx = Fixture::new();
        fx.place("bob", Side::Lay, 20, 30);
        let back = fx.place("alice", Side::Back, 20, 50);

        let receipt = fx.desk.cash_out(&UserId::from("alice"), &back.id, d(2, 0)).unwrap();
        assert_eq!(receipt.refunded, d(20, 0));
        assert_eq!(receipt.value, d(30, 0));
        // 100 − 50 reserved + 20 refund + 30 value
        assert_eq!(fx.balance("alice"), d(100, 0));
        let key = back.book_key();
        assert!(!fx.books.existing(&key).unwrap().lock().is_resting(&back.id));
    }

    #[test]
    fn exit_price_limits_come_from_config() {
        let mut fx = Fixture::new();
        let back = fx.place("alice", Side::Back, 20, 50);
        fx.place("bob", Side::Lay, 20, 50);
        let alice = UserId::from("alice");

        for bad in [d(100_001, 2), d(2005, 3)] {
            assert!(matches!(
                fx.desk.cash_out(&alice, &back.id, bad),
                Err(BacklayError::ValidationError { .. })
            ));
        }
        assert_eq!(fx.balance("alice"), d(50, 0));
        assert!(fx.desk.cash_out(&alice, &back.id, constants::MAX_PRICE).is_ok());
    }

    #[test]
    fn unmatched_wager_not_eligible() {
        let mut fx = Fixture::new();
        let back = fx.place("alice", Side::Back, 20, 50);
        let err = fx.desk.cash_out(&UserId::from("alice"), &back.id, d(3, 0)).unwrap_err();
        assert!(matches!(err, BacklayError::BetNotEligibleForCashOut { .. }));
    }

    #[test]
    fn only_owner_may_cash_out() {
        let mut fx = Fixture::new();
        let back = fx.place("alice", Side::Back, 20, 50);
        fx.place("bob", Side::Lay, 20, 50);
        let err = fx.desk.cash_out(&UserId::from("bob"), &back.id, d(3, 0)).unwrap_err();
        assert!(matches!(err, BacklayError::BetNotEligibleForCashOut { .. }));
    }

    #[test]
    fn unknown_wager_not_found() {
        let fx = Fixture::new();
        let err = fx
            .desk
            .cash_out(&UserId::from("alice"), &WagerId::new(), d(3, 0))
            .unwrap_err();
        assert!(matches!(err, BacklayError::BetNotFound(_)));
    }

    #[test]
    fn cash_out_is_single_transition() {
        let mut fx = Fixture::new();
        let lay = fx.place("bob", Side::Lay, 20, 50);
        fx.place("alice", Side::Back, 20, 50);

        let receipt = fx.desk.cash_out(&UserId::from("bob"), &lay.id, d(4, 0)).unwrap();
        assert_eq!(receipt.value, d(75, 0));
        let err = fx.desk.cash_out(&UserId::from("bob"), &lay.id, d(4, 0)).unwrap_err();
        assert!(matches!(err, BacklayError::BetNotEligibleForCashOut { .. }));
    }

    #[test]
    fn settled_wager_not_eligible() {
        let mut fx = Fixture::new();
        let back = fx.place("alice", Side::Back, 20, 50);
        fx.place("bob", Side::Lay, 20, 50);
        fx.processor().settle_market(&MarketId::from("1.100"), "Away").unwrap();

        let err = fx.desk.cash_out(&UserId::from("alice"), &back.id, d(3, 0)).unwrap_err();
        assert!(matches!(err, BacklayError::BetNotEligibleForCashOut { .. }));
    }

    #[test]
    fn house_without_funds_rejects_without_effect() {
        let mut fx = Fixture::new();
        fx.ledger.debit(&UserId::from("house"), d(1000, 0)).unwrap();
        let back = fx.place("alice", Side::Back, 20, 50);
        fx.place("bob", Side::Lay, 20, 50);

        let err = fx.desk.cash_out(&UserId::from("alice"), &back.id, d(4, 0)).unwrap_err();
        assert!(matches!(err, BacklayError::InsufficientFunds { .. }));
        assert_eq!(fx.balance("alice"), d(50, 0));
        assert_eq!(
            fx.books.snapshot(&back.id).unwrap().status,
            WagerStatus::Matched
        );
    }
}
