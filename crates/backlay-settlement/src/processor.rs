//! Market settlement.
//!
//! `settle_market(market, winner)` resolves every match record of the
//! market in one pass:
//!
//! 1. Close the market and pin it closed (rejects unknown markets/runners,
//!    settled markets, and a settlement already in flight)
//! 2. Lock every runner book of the market, in key order
//! 3. Re-check under the locks that the market is still pinned closed
//! 4. Pay each record's pool to the winning side's claimant
//! 5. Refund every open wager's unmatched remainder
//! 6. Check the releases drain the market escrow exactly, then apply them
//! 7. Mark wagers and the market settled and journal a receipt
//!
//! Steps 4 to 6 only build and check postings; nothing changes until the
//! ledger accepts the whole batch. On any failure after step 1 the pin is
//! released and the market stays closed.

use std::collections::HashMap;
use std::sync::Arc;

use backlay_ledger::AccountLedger;
use backlay_matchcore::{BookRegistry, MarketCatalog, MatchRecordLedger};
use backlay_types::{
    BacklayError, EntryRef, MarketId, MarketStatus, Posting, Result, Side, UserId, WagerId,
    WagerStatus,
};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::journal::{SettlementJournal, SettlementReceipt};

pub struct SettlementProcessor {
    catalog: Arc<MarketCatalog>,
    books: Arc<BookRegistry>,
    matches: Arc<MatchRecordLedger>,
    ledger: Arc<AccountLedger>,
    journal: Arc<SettlementJournal>,
    house: UserId,
}

impl SettlementProcessor {
    #[must_use]
    pub fn new(
        catalog: Arc<MarketCatalog>,
        books: Arc<BookRegistry>,
        matches: Arc<MatchRecordLedger>,
        ledger: Arc<AccountLedger>,
        journal: Arc<SettlementJournal>,
        house: UserId,
    ) -> Self {
        Self {
            catalog,
            books,
            matches,
            ledger,
            journal,
            house,
        }
    }

    /// Settle `market` with `winner` as the winning runner.
    ///
    /// # Errors
    /// - `UnknownMarketOrRunner` if the market or runner is unknown
    /// - `MarketAlreadySettled` on any call after the first success, or
    ///   while another settlement of the market is in flight
    /// - `SupplyInvariantViolation` if the payouts would not drain the
    ///   market escrow exactly; nothing is paid and the market stays closed
    pub fn settle_market(&self, market: &MarketId, winner: &str) -> Result<SettlementReceipt> {
        if let Err(err) = self.catalog.close_for_settlement(market, winner) {
            tracing::warn!(market = %market, winner, error = %err, "settlement rejected");
            return Err(err);
        }
        let result = self.settle_closed(market, winner);
        if let Err(err) = &result {
            self.catalog.abandon_settlement(market);
            tracing::warn!(market = %market, winner, error = %err, "settlement abandoned");
        }
        result
    }

    /// Steps 2 to 7. The market is pinned closed by the catalog throughout,
    /// so no placement can reach a book created after the snapshot below.
    fn settle_closed(&self, market: &MarketId, winner: &str) -> Result<SettlementReceipt> {
        let books = self.books.books_for_market(market);
        let mut guards: Vec<_> = books.iter().map(|(_, book)| book.lock()).collect();

        if !self.catalog.is_settling(market) {
            return Err(match self.catalog.status(market) {
                Some(MarketStatus::Settled) => BacklayError::MarketAlreadySettled(market.clone()),
                status => BacklayError::Internal(format!(
                    "market {market} left closed state during settlement: {status:?}"
                )),
            });
        }

        // Settlement claimant of every wager on the market.
        let mut claimants: HashMap<WagerId, UserId> = HashMap::new();
        for guard in &guards {
            for wager in guard.wagers() {
                let claimant = if wager.status == WagerStatus::CashedOut {
                    self.house.clone()
                } else {
                    wager.owner.clone()
                };
                claimants.insert(wager.id, claimant);
            }
        }

        let records = self.matches.for_market(market);
        let mut postings = Vec::with_capacity(records.len());
        let mut pools_paid = Decimal::ZERO;
        let mut house_claims = Decimal::ZERO;

        for record in &records {
            let winning_side = if record.runner == winner {
                Side::Back
            } else {
                Side::Lay
            };
            let winning_wager = match winning_side {
                Side::Back => record.back_wager_id,
                Side::Lay => record.lay_wager_id,
            };
            let claimant = claimants.get(&winning_wager).cloned().ok_or_else(|| {
                BacklayError::Internal(format!(
                    "match {} refers to wager {winning_wager} outside market {market}",
                    record.id
                ))
            })?;
            let pool = record.pool();
            pools_paid += pool;
            if claimant == self.house {
                house_claims += pool;
            }
            postings.push(Posting::Release {
                market: market.clone(),
                user: claimant,
                amount: pool,
                reference: EntryRef::Match(record.id),
            });
        }

        let mut refunded = Decimal::ZERO;
        for guard in &guards {
            for wager in guard.wagers().filter(|w| !w.is_terminal()) {
                let refund = wager.uncommitted();
                if refund > Decimal::ZERO {
                    refunded += refund;
                    postings.push(Posting::Release {
                        market: market.clone(),
                        user: wager.owner.clone(),
                        amount: refund,
                        reference: EntryRef::Wager(wager.id),
                    });
                }
            }
        }

        let escrow = self.ledger.escrow_balance(market);
        if pools_paid + refunded != escrow {
            tracing::error!(
                market = %market,
                escrow = %escrow,
                pools_paid = %pools_paid,
                refunded = %refunded,
                "settlement does not balance"
            );
            return Err(BacklayError::SupplyInvariantViolation {
                reason: format!(
                    "market {market}: escrow {escrow} != pools {pools_paid} + refunds {refunded}"
                ),
            });
        }

        self.ledger.apply(&postings)?;

        let now = Utc::now();
        let mut wagers_settled = 0;
        for guard in &mut guards {
            for wager in guard.wagers_mut() {
                if wager.finish(WagerStatus::Settled, now) {
                    wagers_settled += 1;
                }
            }
            guard.clear_levels();
        }
        self.catalog.mark_settled(market)?;

        let receipt = SettlementReceipt::new(
            market.clone(),
            winner.to_string(),
            records.len(),
            wagers_settled,
            pools_paid,
            house_claims,
            refunded,
            now,
        );
        self.journal.record(receipt.clone())?;

        tracing::info!(
            market = %market,
            winner,
            records = receipt.records,
            wagers_settled,
            pools_paid = %pools_paid,
            refunded = %refunded,
            digest = %receipt.digest,
            "market settled"
        );
        Ok(receipt)
    }

    #[must_use]
    pub fn journal(&self) -> &SettlementJournal {
        &self.journal
    }
}
