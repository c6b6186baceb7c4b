//! A single price level of one side of a runner book.
//!
//! Wagers at the same price are kept in FIFO order (time priority) using a
//! [`VecDeque`] of ids. The wagers themselves live in the owning
//! [`RunnerBook`](crate::RunnerBook), so a level is only an ordering.

use std::collections::VecDeque;

use backlay_types::WagerId;
use rust_decimal::Decimal;

/// All resting wagers on one side at one price.
///
/// The front of the deque was submitted first and is filled first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    pub wagers: VecDeque<WagerId>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            wagers: VecDeque::new(),
        }
    }

    /// Add a wager at the back of the queue (lowest time priority).
    pub fn push_back(&mut self, id: WagerId) {
        self.wagers.push_back(id);
    }

    /// Remove a specific wager. Returns `false` if it was not queued here.
    pub fn remove(&mut self, id: &WagerId) -> bool {
        match self.wagers.iter().position(|w| w == id) {
            Some(pos) => {
                self.wagers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Queued ids, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &WagerId> {
        self.wagers.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.wagers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut level = PriceLevel::new(Decimal::TWO);
        let first = WagerId::new();
        let second = WagerId::new();
        level.push_back(first);
        level.push_back(second);

        assert_eq!(level.len(), 2);
        assert_eq!(level.iter().copied().collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut level = PriceLevel::new(Decimal::TWO);
        let ids: Vec<_> = (0..3).map(|_| WagerId::new()).collect();
        for id in &ids {
            level.push_back(*id);
        }
        assert!(level.remove(&ids[1]));
        assert_eq!(level.iter().copied().collect::<Vec<_>>(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut level = PriceLevel::new(Decimal::TWO);
        level.push_back(WagerId::new());
        assert!(!level.remove(&WagerId::new()));
        assert_eq!(level.len(), 1);
    }

    #[test]
    fn empty_level() {
        let level = PriceLevel::new(Decimal::TWO);
        assert!(level.is_empty());
        assert_eq!(level.iter().count(), 0);
    }
}
