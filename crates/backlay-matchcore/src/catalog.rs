//! Market catalog: reference data handed over by the ingestion feed.
//!
//! The feed may create, update, open and close markets. Only settlement
//! moves a market to `settled`, and nothing moves it back.
//!
//! Between `close_for_settlement` and `mark_settled` (or
//! `abandon_settlement`) the market is pinned `closed`: feed updates and
//! status changes cannot reopen it while settlement holds its books.

use std::collections::{HashMap, HashSet};

use backlay_types::{BacklayError, Market, MarketId, MarketStatus, Result};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct CatalogState {
    markets: HashMap<MarketId, Market>,
    /// Markets with a settlement in flight.
    settling: HashSet<MarketId>,
}

#[derive(Debug, Default)]
pub struct MarketCatalog {
    state: RwLock<CatalogState>,
}

impl MarketCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a market. A settled market, or one being settled,
    /// keeps its status and runners; only its name is refreshed.
    pub fn register_market(&self, market: Market) {
        let mut state = self.state.write();
        let pinned = state.settling.contains(&market.id);
        if let Some(existing) = state
            .markets
            .get_mut(&market.id)
            .filter(|m| pinned || m.status == MarketStatus::Settled)
        {
            tracing::warn!(
                market = %market.id,
                status = %existing.status,
                "feed update limited to name while market is settling or settled"
            );
            existing.name = market.name;
            return;
        }
        tracing::debug!(market = %market.id, status = %market.status, "market registered");
        state.markets.insert(market.id.clone(), market);
    }

    /// Feed-driven open/close.
    ///
    /// # Errors
    /// `ValidationError` when asked for `settled`, `MarketAlreadySettled`
    /// once settled, `MarketClosed` while a settlement is in flight,
    /// `UnknownMarketOrRunner` for an unknown market.
    pub fn set_status(&self, id: &MarketId, status: MarketStatus) -> Result<()> {
        if status == MarketStatus::Settled {
            return Err(BacklayError::validation(
                "markets are settled only through settlement",
            ));
        }
        let mut state = self.state.write();
        let pinned = state.settling.contains(id);
        let market = state.markets.get_mut(id).ok_or_else(|| unknown(id, ""))?;
        if market.status == MarketStatus::Settled {
            return Err(BacklayError::MarketAlreadySettled(id.clone()));
        }
        if pinned {
            return Err(BacklayError::MarketClosed(id.clone()));
        }
        market.status = status;
        Ok(())
    }

    /// Placement gate: the market exists, is open, and lists `runner`.
    pub fn require_open(&self, id: &MarketId, runner: &str) -> Result<()> {
        let state = self.state.read();
        let market = state.markets.get(id).ok_or_else(|| unknown(id, runner))?;
        if !market.has_runner(runner) {
            return Err(unknown(id, runner));
        }
        if market.status != MarketStatus::Open {
            return Err(BacklayError::MarketClosed(id.clone()));
        }
        Ok(())
    }

    /// First half of settlement: check the winner, stop placements and pin
    /// the market closed until [`mark_settled`](Self::mark_settled) or
    /// [`abandon_settlement`](Self::abandon_settlement).
    ///
    /// # Errors
    /// `UnknownMarketOrRunner`, or `MarketAlreadySettled` if the market is
    /// settled or another settlement of it is in flight. The market is left
    /// untouched in every case.
    pub fn close_for_settlement(&self, id: &MarketId, winner: &str) -> Result<()> {
        let mut state = self.state.write();
        let in_flight = state.settling.contains(id);
        let market = state.markets.get_mut(id).ok_or_else(|| unknown(id, winner))?;
        if in_flight || market.status == MarketStatus::Settled {
            return Err(BacklayError::MarketAlreadySettled(id.clone()));
        }
        if !market.has_runner(winner) {
            return Err(unknown(id, winner));
        }
        market.status = MarketStatus::Closed;
        state.settling.insert(id.clone());
        Ok(())
    }

    /// Whether `id` is closed with a settlement in flight.
    #[must_use]
    pub fn is_settling(&self, id: &MarketId) -> bool {
        let state = self.state.read();
        state.settling.contains(id)
            && state
                .markets
                .get(id)
                .is_some_and(|m| m.status == MarketStatus::Closed)
    }

    /// Final transition of settlement. Fails if already settled.
    pub fn mark_settled(&self, id: &MarketId) -> Result<()> {
        let mut state = self.state.write();
        let market = state.markets.get_mut(id).ok_or_else(|| unknown(id, ""))?;
        if market.status == MarketStatus::Settled {
            return Err(BacklayError::MarketAlreadySettled(id.clone()));
        }
        market.status = MarketStatus::Settled;
        state.settling.remove(id);
        Ok(())
    }

    /// Release the pin after a failed settlement. The market keeps its
    /// status, which is `closed` unless `mark_settled` already ran.
    pub fn abandon_settlement(&self, id: &MarketId) {
        self.state.write().settling.remove(id);
    }

    #[must_use]
    pub fn get(&self, id: &MarketId) -> Option<Market> {
        self.state.read().markets.get(id).cloned()
    }

    #[must_use]
    pub fn status(&self, id: &MarketId) -> Option<MarketStatus> {
        self.state.read().markets.get(id).map(|m| m.status)
    }

    /// Registered market ids, sorted.
    #[must_use]
    pub fn market_ids(&self) -> Vec<MarketId> {
        let mut ids: Vec<_> = self.state.read().markets.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn unknown(market: &MarketId, runner: &str) -> BacklayError {
    BacklayError::UnknownMarketOrRunner {
        market: market.clone(),
        runner: runner.to_string(),
    }
}
