//! Append-only match record ledger.
//!
//! Records are written by placements and read by settlement, cash-out and
//! audit. Nothing is ever updated or removed.

use std::collections::HashMap;

use backlay_types::{MarketId, MatchRecord, WagerId};
use parking_lot::RwLock;
use rust_decimal::Decimal;

#[derive(Debug, Default)]
struct MatchLogState {
    records: Vec<MatchRecord>,
    by_market: HashMap<MarketId, Vec<usize>>,
    by_wager: HashMap<WagerId, Vec<usize>>,
}

/// The audit trail of every back/lay pairing.
#[derive(Debug, Default)]
pub struct MatchRecordLedger {
    state: RwLock<MatchLogState>,
}

impl MatchRecordLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records produced by one placement.
    pub fn append(&self, records: Vec<MatchRecord>) {
        if records.is_empty() {
            return;
        }
        let mut state = self.state.write();
        for record in records {
            let idx = state.records.len();
            state.by_market.entry(record.market.clone()).or_default().push(idx);
            state.by_wager.entry(record.back_wager_id).or_default().push(idx);
            state.by_wager.entry(record.lay_wager_id).or_default().push(idx);
            state.records.push(record);
        }
    }

    /// Records under `market`, in creation order.
    #[must_use]
    pub fn for_market(&self, market: &MarketId) -> Vec<MatchRecord> {
        let state = self.state.read();
        state
            .by_market
            .get(market)
            .map(|idx| idx.iter().map(|&i| state.records[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Records in which `wager` is either side, in creation order.
    #[must_use]
    pub fn for_wager(&self, wager: &WagerId) -> Vec<MatchRecord> {
        let state = self.state.read();
        state
            .by_wager
            .get(wager)
            .map(|idx| idx.iter().map(|&i| state.records[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Σ matched amount over the wager's records.
    #[must_use]
    pub fn matched_total(&self, wager: &WagerId) -> Decimal {
        self.for_wager(wager).iter().map(|r| r.matched_amount).sum()
    }

    /// Σ `matched × price` over the wager's records: what its side receives
    /// if it wins every pairing.
    #[must_use]
    pub fn payout(&self, wager: &WagerId) -> Decimal {
        self.for_wager(wager).iter().map(MatchRecord::pool).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }
}
