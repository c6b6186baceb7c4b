//! The order book for a single (market, runner) pair.
//!
//! Both sides share one partition so a placement can read the opposing side
//! and rest on its own side in one critical section. Each side is a
//! `BTreeMap<Decimal, PriceLevel>`:
//!
//! - **Backs**: walked from the lowest price up by an incoming lay
//! - **Lays**: walked from the highest price down by an incoming back
//!
//! Every wager ever placed on the runner stays in the `wagers` map after it
//! leaves the levels, so settlement and cash-out can find matched positions.

use std::collections::{BTreeMap, HashMap};

use backlay_types::{BacklayError, BookKey, Result, Side, Wager, WagerId};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::price_level::PriceLevel;

/// Aggregated view of one price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LadderRung {
    pub price: Decimal,
    /// Unmatched stake available at this price.
    pub available: Decimal,
    pub wagers: usize,
}

/// Resting wagers and wager state for one runner.
#[derive(Debug)]
pub struct RunnerBook {
    pub key: BookKey,
    backs: BTreeMap<Decimal, PriceLevel>,
    lays: BTreeMap<Decimal, PriceLevel>,
    wagers: HashMap<WagerId, Wager>,
}

impl RunnerBook {
    #[must_use]
    pub fn new(key: BookKey) -> Self {
        Self {
            key,
            backs: BTreeMap::new(),
            lays: BTreeMap::new(),
            wagers: HashMap::new(),
        }
    }

    fn side(&self, side: Side) -> &BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Back => &self.backs,
            Side::Lay => &self.lays,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Back => &mut self.backs,
            Side::Lay => &mut self.lays,
        }
    }

    // =================================================================
    // Insertion / removal
    // =================================================================

    /// Take ownership of a wager. It joins the back of its price level if
    /// it still has unmatched stake.
    pub fn admit(&mut self, wager: Wager) -> Result<()> {
        if wager.book_key() != self.key {
            return Err(BacklayError::Internal(format!(
                "wager {} belongs to {}, not {}",
                wager.id,
                wager.book_key(),
                self.key
            )));
        }
        if self.wagers.contains_key(&wager.id) {
            return Err(BacklayError::Internal(format!(
                "wager {} already in book {}",
                wager.id, self.key
            )));
        }
        if wager.is_resting() {
            let price = wager.price;
            self.side_mut(wager.side)
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(wager.id);
        }
        self.wagers.insert(wager.id, wager);
        Ok(())
    }

    /// Drop a wager from its price level. The wager itself stays known.
    /// Returns `false` if it was not resting.
    pub fn unrest(&mut self, id: &WagerId) -> bool {
        let Some((side, price)) = self.wagers.get(id).map(|w| (w.side, w.price)) else {
            return false;
        };
        let levels = self.side_mut(side);
        let Some(level) = levels.get_mut(&price) else {
            return false;
        };
        let removed = level.remove(id);
        if level.is_empty() {
            levels.remove(&price);
        }
        removed
    }

    /// Empty both sides. Wager state is kept.
    pub fn clear_levels(&mut self) {
        self.backs.clear();
        self.lays.clear();
    }

    // =================================================================
    // Wager access
    // =================================================================

    #[must_use]
    pub fn get(&self, id: &WagerId) -> Option<&Wager> {
        self.wagers.get(id)
    }

    pub fn get_mut(&mut self, id: &WagerId) -> Option<&mut Wager> {
        self.wagers.get_mut(id)
    }

    /// Every wager placed on this runner, in no particular order.
    pub fn wagers(&self) -> impl Iterator<Item = &Wager> {
        self.wagers.values()
    }

    pub fn wagers_mut(&mut self) -> impl Iterator<Item = &mut Wager> {
        self.wagers.values_mut()
    }

    #[must_use]
    pub fn wager_count(&self) -> usize {
        self.wagers.len()
    }

    // =================================================================
    // Matching order
    // =================================================================

    /// Resting wagers an incoming `side` wager at `price` may match, best
    /// price for the incoming wager first, oldest first within a price.
    ///
    /// Lazy: levels past the point where the caller stops are never visited.
    pub fn candidates(&self, side: Side, price: Decimal) -> impl Iterator<Item = &Wager> + '_ {
        let levels: Box<dyn Iterator<Item = &PriceLevel> + '_> = match side {
            Side::Back => Box::new(self.lays.range(..=price).rev().map(|(_, l)| l)),
            Side::Lay => Box::new(self.backs.range(price..).map(|(_, l)| l)),
        };
        levels
            .flat_map(PriceLevel::iter)
            .filter_map(move |id| self.wagers.get(id))
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Lowest resting back price: the best a layer can get.
    #[must_use]
    pub fn best_back(&self) -> Option<Decimal> {
        self.backs.keys().next().copied()
    }

    /// Highest resting lay price: the best a backer can get.
    #[must_use]
    pub fn best_lay(&self) -> Option<Decimal> {
        self.lays.keys().next_back().copied()
    }

    /// Number of distinct price levels on `side`.
    #[must_use]
    pub fn depth(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Number of wagers resting on either side.
    #[must_use]
    pub fn resting_count(&self) -> usize {
        self.backs.values().chain(self.lays.values()).map(PriceLevel::len).sum()
    }

    #[must_use]
    pub fn is_resting(&self, id: &WagerId) -> bool {
        self.wagers.get(id).is_some_and(|w| {
            self.side(w.side)
                .get(&w.price)
                .is_some_and(|l| l.iter().any(|q| q == id))
        })
    }

    /// Aggregated levels of `side`, in the order an opposing wager would
    /// walk them.
    #[must_use]
    pub fn ladder(&self, side: Side) -> Vec<LadderRung> {
        let rung = |level: &PriceLevel| LadderRung {
            price: level.price,
            available: level
                .iter()
                .filter_map(|id| self.wagers.get(id))
                .map(Wager::remaining)
                .sum(),
            wagers: level.len(),
        };
        match side {
            Side::Back => self.backs.values().map(rung).collect(),
            Side::Lay => self.lays.values().rev().map(rung).collect(),
        }
    }
}
