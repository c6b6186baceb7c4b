//! The exchange facade.
//!
//! [`Exchange`] wires the services together and owns the placement path:
//!
//! ```text
//! place_order
//!   ├─ check price / stake                      (no locks)
//!   ├─ lock runner book
//!   │    ├─ catalog: market open, runner listed
//!   │    ├─ plan fills                          (read-only)
//!   │    ├─ ledger: reserve stake + lay top-up  (the only fallible step)
//!   │    ├─ apply fills, rest remainder
//!   │    └─ append match records
//!   └─ unlock
//! ```
//!
//! Settlement and cash-out are delegated to `backlay-settlement`. Every
//! service is an explicit `Arc` handle so several facades (or a persistence
//! adapter) can share them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use backlay_ledger::AccountLedger;
use backlay_matchcore::{
    BookRegistry, LadderRung, MarketCatalog, MatchRecordLedger, apply_plan, plan_fills,
};
use backlay_settlement::{
    CashOutDesk, CashOutReceipt, SettlementJournal, SettlementProcessor, SettlementReceipt,
};
use backlay_types::{
    BacklayError, BookKey, EngineConfig, EntryRef, Market, MarketId, MarketStatus, MatchRecord,
    Posting, Result, Side, UserId, Wager, WagerId,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::history::{self, BetHistoryPage};
use crate::validation::PlacementLimits;

/// Both sides of one runner book.
#[derive(Debug, Clone, Serialize)]
pub struct Ladder {
    pub market: MarketId,
    pub runner: String,
    /// Lowest resting back price.
    pub best_back: Option<Decimal>,
    /// Highest resting lay price.
    pub best_lay: Option<Decimal>,
    /// Resting backs, lowest price first.
    pub backs: Vec<LadderRung>,
    /// Resting lays, highest price first.
    pub lays: Vec<LadderRung>,
}

/// Shared service handles.
#[derive(Debug, Clone, Default)]
pub struct Services {
    pub catalog: Arc<MarketCatalog>,
    pub books: Arc<BookRegistry>,
    pub matches: Arc<MatchRecordLedger>,
    pub ledger: Arc<AccountLedger>,
    pub journal: Arc<SettlementJournal>,
}

pub struct Exchange {
    config: EngineConfig,
    limits: PlacementLimits,
    services: Services,
    settlement: SettlementProcessor,
    cash_out: CashOutDesk,
    sequence: AtomicU64,
}

impl Exchange {
    /// An exchange with fresh, empty services.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_services(config, Services::default())
    }

    /// An exchange over existing services.
    pub fn with_services(config: EngineConfig, services: Services) -> Result<Self> {
        config.validate()?;
        let settlement = SettlementProcessor::new(
            Arc::clone(&services.catalog),
            Arc::clone(&services.books),
            Arc::clone(&services.matches),
            Arc::clone(&services.ledger),
            Arc::clone(&services.journal),
            config.house_account.clone(),
        );
        let cash_out = CashOutDesk::new(
            Arc::clone(&services.catalog),
            Arc::clone(&services.books),
            Arc::clone(&services.matches),
            Arc::clone(&services.ledger),
            &config,
        );
        // Resume numbering after wagers already in the registry.
        let next_sequence = services.books.wager_count() as u64;
        tracing::info!(
            house = %config.house_account,
            self_match_prevention = config.self_match_prevention,
            "exchange ready"
        );
        Ok(Self {
            limits: PlacementLimits::from_config(&config),
            config,
            services,
            settlement,
            cash_out,
            sequence: AtomicU64::new(next_sequence),
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    // =================================================================
    // Accounts
    // =================================================================

    pub fn open_account(&self, user: &UserId, opening_balance: Decimal) -> Result<()> {
        self.services.ledger.open_account(user, opening_balance)
    }

    pub fn deposit(&self, user: &UserId, amount: Decimal) -> Result<()> {
        self.services.ledger.credit(user, amount)
    }

    pub fn withdraw(&self, user: &UserId, amount: Decimal) -> Result<()> {
        self.services.ledger.debit(user, amount)
    }

    #[must_use]
    pub fn balance(&self, user: &UserId) -> Decimal {
        self.services.ledger.balance(user)
    }

    // =================================================================
    // Reference data
    // =================================================================

    pub fn register_market(&self, market: Market) {
        self.services.catalog.register_market(market);
    }

    pub fn close_market(&self, market: &MarketId) -> Result<()> {
        self.services.catalog.set_status(market, MarketStatus::Closed)
    }

    pub fn reopen_market(&self, market: &MarketId) -> Result<()> {
        self.services.catalog.set_status(market, MarketStatus::Open)
    }

    #[must_use]
    pub fn market(&self, market: &MarketId) -> Option<Market> {
        self.services.catalog.get(market)
    }

    // =================================================================
    // Placement
    // =================================================================

    /// Place a back or lay wager and match it against the opposing side.
    ///
    /// Returns the wager with its final status and matched amount. On any
    /// error nothing is reserved and no wager exists.
    ///
    /// # Errors
    /// `ValidationError`, `UnknownMarketOrRunner`, `MarketClosed`,
    /// `InsufficientFunds`.
    pub fn place_order(
        &self,
        user: &UserId,
        market: &MarketId,
        runner: &str,
        side: Side,
        price: Decimal,
        stake: Decimal,
    ) -> Result<Wager> {
        let result = self.try_place(user, market, runner, side, price, stake);
        if let Err(err) = &result {
            tracing::warn!(
                user = %user,
                market = %market,
                runner,
                side = %side,
                price = %price,
                stake = %stake,
                code = err.code(),
                error = %err,
                "placement rejected"
            );
        }
        result
    }

    fn try_place(
        &self,
        user: &UserId,
        market: &MarketId,
        runner: &str,
        side: Side,
        price: Decimal,
        stake: Decimal,
    ) -> Result<Wager> {
        self.limits.check_price(price)?;
        self.limits.check_stake(stake)?;
        // Cheap pre-check so unknown markets never get a book.
        self.services.catalog.require_open(market, runner)?;

        let handle = self.services.books.book(&BookKey::new(market.clone(), runner));
        let mut book = handle.lock();
        self.services.catalog.require_open(market, runner)?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let wager = Wager::new(user.clone(), market.clone(), runner, side, price, stake, sequence);
        let plan = plan_fills(&book, &wager, self.config.self_match_prevention);

        self.services.ledger.apply(&[Posting::Reserve {
            user: user.clone(),
            market: market.clone(),
            amount: plan.reservation(&wager),
            reference: EntryRef::Wager(wager.id),
        }])?;

        let (placed, records) = apply_plan(&mut book, wager, &plan)?;
        self.services.books.index(&placed);
        let fills = records.len();
        self.services.matches.append(records);

        tracing::info!(
            wager = %placed.id,
            user = %user,
            book = %book.key,
            side = %side,
            price = %price,
            stake = %stake,
            matched = %placed.matched_amount,
            fills,
            self_matches_skipped = plan.self_matches_skipped,
            status = %placed.status,
            "wager placed"
        );
        Ok(placed)
    }

    // =================================================================
    // Settlement / cash-out
    // =================================================================

    /// Resolve `market` with `winner` as the winning runner. One-time.
    pub fn settle_market(&self, market: &MarketId, winner: &str) -> Result<SettlementReceipt> {
        self.settlement.settle_market(market, winner)
    }

    pub fn cash_out(
        &self,
        user: &UserId,
        wager_id: &WagerId,
        exit_price: Decimal,
    ) -> Result<CashOutReceipt> {
        let result = self.cash_out.cash_out(user, wager_id, exit_price);
        if let Err(err) = &result {
            tracing::warn!(user = %user, wager = %wager_id, code = err.code(), error = %err, "cash-out rejected");
        }
        result
    }

    #[must_use]
    pub fn settlement_receipt(&self, market: &MarketId) -> Option<SettlementReceipt> {
        self.services.journal.receipt(market)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn wager(&self, id: &WagerId) -> Option<Wager> {
        self.services.books.snapshot(id)
    }

    /// Every wager `user` placed, newest first.
    #[must_use]
    pub fn get_bet_history(&self, user: &UserId) -> Vec<Wager> {
        let mut wagers: Vec<_> = self
            .services
            .books
            .wager_ids_for(user)
            .iter()
            .filter_map(|id| self.services.books.snapshot(id))
            .collect();
        history::newest_first(&mut wagers);
        wagers
    }

    /// One page of `user`'s history, starting after `before`. Uses the
    /// configured page size when `limit` is `None`.
    pub fn bet_history_page(
        &self,
        user: &UserId,
        before: Option<&WagerId>,
        limit: Option<usize>,
    ) -> Result<BetHistoryPage> {
        let all = self.get_bet_history(user);
        history::page(&all, before, limit.unwrap_or(self.config.history_page_size))
    }

    /// Match records of `market`, in creation order.
    #[must_use]
    pub fn match_records(&self, market: &MarketId) -> Vec<MatchRecord> {
        self.services.matches.for_market(market)
    }

    /// Resting liquidity on one runner.
    pub fn ladder(&self, market: &MarketId, runner: &str) -> Result<Ladder> {
        let listed = self
            .services
            .catalog
            .get(market)
            .is_some_and(|m| m.has_runner(runner));
        if !listed {
            return Err(BacklayError::UnknownMarketOrRunner {
                market: market.clone(),
                runner: runner.to_string(),
            });
        }
        let key = BookKey::new(market.clone(), runner);
        let (best_back, best_lay, backs, lays) = match self.services.books.existing(&key) {
            Some(handle) => {
                let book = handle.lock();
                (
                    book.best_back(),
                    book.best_lay(),
                    book.ladder(Side::Back),
                    book.ladder(Side::Lay),
                )
            }
            None => (None, None, Vec::new(), Vec::new()),
        };
        Ok(Ladder {
            market: market.clone(),
            runner: runner.to_string(),
            best_back,
            best_lay,
            backs,
            lays,
        })
    }

    // =================================================================
    // Audit
    // =================================================================

    /// Re-check supply conservation, the ledger digest chain, and that
    /// cached balances match a replay of the entry log.
    pub fn audit(&self) -> Result<()> {
        let ledger = &self.services.ledger;
        ledger.verify_supply()?;
        ledger.verify_chain()?;
        ledger.verify_replay()?;
        for receipt in self.services.journal.receipts() {
            if !receipt.verify() {
                return Err(BacklayError::SupplyInvariantViolation {
                    reason: format!("settlement receipt for {} fails its digest", receipt.market),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use backlay_types::WagerStatus;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn exchange() -> Exchange {
        let ex = Exchange::new(EngineConfig::default()).unwrap();
        ex.register_market(Market::open("1.100", "Home v Away", ["Home", "Away"]));
        ex
    }

    fn market() -> MarketId {
        MarketId::from("1.100")
    }

    #[test]
    fn invalid_config_rejected() {
        let config = EngineConfig {
            history_page_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Exchange::new(config),
            Err(BacklayError::Configuration(_))
        ));
    }

    #[test]
    fn validation_precedes_funds() {
        let ex = exchange();
        let alice = UserId::from("alice");
        let err = ex
            .place_order(&alice, &market(), "Home", Side::Back, dec("1.0"), dec("10"))
            .unwrap_err();
        assert!(matches!(err, BacklayError::ValidationError { .. }));
        let err = ex
            .place_order(&alice, &market(), "Home", Side::Back, dec("2.0"), dec("0"))
            .unwrap_err();
        assert!(matches!(err, BacklayError::ValidationError { .. }));
    }

    #[test]
    fn unknown_market_or_runner() {
        let ex = exchange();
        let alice = UserId::from("alice");
        ex.open_account(&alice, dec("100")).unwrap();
        let err = ex
            .place_order(&alice, &market(), "Draw", Side::Back, dec("2"), dec("10"))
            .unwrap_err();
        assert!(matches!(err, BacklayError::UnknownMarketOrRunner { .. }));
        let err = ex
            .place_order(&alice, &MarketId::from("9.9"), "Home", Side::Back, dec("2"), dec("10"))
            .unwrap_err();
        assert!(matches!(err, BacklayError::UnknownMarketOrRunner { .. }));
        assert_eq!(ex.services().books.book_count(), 0);
        assert_eq!(ex.balance(&alice), dec("100"));
    }

    #[test]
    fn closed_market_rejects_then_reopens() {
        let ex = exchange();
        let alice = UserId::from("alice");
        ex.open_account(&alice, dec("100")).unwrap();
        ex.close_market(&market()).unwrap();
        let err = ex
            .place_order(&alice, &market(), "Home", Side::Back, dec("2"), dec("10"))
            .unwrap_err();
        assert!(matches!(err, BacklayError::MarketClosed(_)));

        ex.reopen_market(&market()).unwrap();
        let w = ex
            .place_order(&alice, &market(), "Home", Side::Back, dec("2"), dec("10"))
            .unwrap();
        assert_eq!(w.status, WagerStatus::Unmatched);
        assert_eq!(ex.balance(&alice), dec("90"));
    }

    #[test]
    fn lay_reserves_liability() {
        let ex = exchange();
        let bob = UserId::from("bob");
        ex.open_account(&bob, dec("100")).unwrap();
        ex.place_order(&bob, &market(), "Home", Side::Lay, dec("3.5"), dec("20"))
            .unwrap();
        assert_eq!(ex.balance(&bob), dec("50"));
        assert_eq!(ex.services().ledger.escrow_balance(&market()), dec("50"));
    }

    #[test]
    fn ladder_reports_both_sides() {
        let ex = exchange();
        let alice = UserId::from("alice");
        ex.open_account(&alice, dec("1000")).unwrap();
        ex.place_order(&alice, &market(), "Home", Side::Back, dec("2.2"), dec("10"))
            .unwrap();
        ex.place_order(&alice, &market(), "Home", Side::Back, dec("2.4"), dec("5"))
            .unwrap();
        ex.place_order(&alice, &market(), "Home", Side::Lay, dec("2.0"), dec("7"))
            .unwrap();

        let ladder = ex.ladder(&market(), "Home").unwrap();
        assert_eq!(ladder.best_back, Some(dec("2.2")));
        assert_eq!(ladder.best_lay, Some(dec("2.0")));
        assert_eq!(ladder.backs.len(), 2);
        assert_eq!(ladder.lays[0].available, dec("7"));

        let empty = ex.ladder(&market(), "Away").unwrap();
        assert!(empty.backs.is_empty() && empty.best_lay.is_none());
        assert!(ex.ladder(&market(), "Draw").is_err());
    }

    #[test]
    fn history_is_newest_first_and_pageable() {
        let ex = exchange();
        let alice = UserId::from("alice");
        ex.open_account(&alice, dec("1000")).unwrap();
        let ids: Vec<_> = (0..3)
            .map(|_| {
                ex.place_order(&alice, &market(), "Home", Side::Back, dec("2"), dec("1"))
                    .unwrap()
                    .id
            })
            .collect();

        let history: Vec<_> = ex.get_bet_history(&alice).into_iter().map(|w| w.id).collect();
        assert_eq!(history, vec![ids[2], ids[1], ids[0]]);

        let first = ex.bet_history_page(&alice, None, Some(2)).unwrap();
        assert_eq!(first.wagers.len(), 2);
        let rest = ex
            .bet_history_page(&alice, first.next_cursor.as_ref(), None)
            .unwrap();
        assert_eq!(rest.wagers[0].id, ids[0]);
        assert!(ex.get_bet_history(&UserId::from("nobody")).is_empty());
    }

    #[test]
    fn json_config_and_ladder_snapshot() {
        let config = EngineConfig::from_json_str(r#"{ "self_match_prevention": false }"#).unwrap();
        let ex = Exchange::new(config).unwrap();
        assert!(!ex.config().self_match_prevention);
        ex.register_market(Market::open("1.100", "Home v Away", ["Home", "Away"]));
        let alice = UserId::from("alice");
        ex.open_account(&alice, dec("100")).unwrap();
        ex.place_order(&alice, &market(), "Home", Side::Back, dec("2.5"), dec("10"))
            .unwrap();

        let json = serde_json::to_value(ex.ladder(&market(), "Home").unwrap()).unwrap();
        assert_eq!(json["best_back"], "2.5");
        assert_eq!(json["backs"][0]["available"], "10");
        assert!(json["lays"].as_array().unwrap().is_empty());
    }

    #[test]
    fn audit_passes_after_activity() {
        let ex = exchange();
        let (alice, bob) = (UserId::from("alice"), UserId::from("bob"));
        ex.open_account(&alice, dec("100")).unwrap();
        ex.open_account(&bob, dec("100")).unwrap();
        ex.place_order(&alice, &market(), "Home", Side::Back, dec("2"), dec("50"))
            .unwrap();
        ex.place_order(&bob, &market(), "Home", Side::Lay, dec("2"), dec("50"))
            .unwrap();
        ex.withdraw(&bob, dec("10")).unwrap();
        ex.settle_market(&market(), "Home").unwrap();
        assert!(ex.audit().is_ok());
        assert!(ex.settlement_receipt(&market()).is_some());
    }
}
