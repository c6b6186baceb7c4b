//! Partitioned registry of runner books.
//!
//! One [`RunnerBook`] per (market, runner), each behind its own mutex, found
//! through a [`DashMap`]. Placements on different runners never contend;
//! placements on the same runner serialize on its book.
//!
//! Two secondary indexes are kept alongside: wager id → book key (so a
//! wager can be found from its id alone) and user → wager ids (bet history).
//! Both are written once per wager and never removed.

use std::sync::Arc;

use backlay_types::{BookKey, MarketId, UserId, Wager, WagerId};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::orderbook::RunnerBook;

/// Shared handle to one runner partition.
pub type BookHandle = Arc<Mutex<RunnerBook>>;

#[derive(Debug, Default)]
pub struct BookRegistry {
    books: DashMap<BookKey, BookHandle>,
    locator: DashMap<WagerId, BookKey>,
    by_user: DashMap<UserId, Vec<WagerId>>,
}

impl BookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The partition for `key`, created empty on first use.
    pub fn book(&self, key: &BookKey) -> BookHandle {
        if let Some(existing) = self.books.get(key) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.books
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(RunnerBook::new(key.clone()))))
                .value(),
        )
    }

    /// The partition for `key` if any wager was ever placed on it.
    #[must_use]
    pub fn existing(&self, key: &BookKey) -> Option<BookHandle> {
        self.books.get(key).map(|b| Arc::clone(b.value()))
    }

    /// Every partition of `market`, sorted by key so callers taking several
    /// locks always take them in the same order.
    #[must_use]
    pub fn books_for_market(&self, market: &MarketId) -> Vec<(BookKey, BookHandle)> {
        let mut books: Vec<_> = self
            .books
            .iter()
            .filter(|e| &e.key().market == market)
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        books.sort_by(|a, b| a.0.cmp(&b.0));
        books
    }

    /// Record where a newly admitted wager lives.
    pub fn index(&self, wager: &Wager) {
        self.locator.insert(wager.id, wager.book_key());
        self.by_user.entry(wager.owner.clone()).or_default().push(wager.id);
    }

    #[must_use]
    pub fn locate(&self, id: &WagerId) -> Option<BookKey> {
        self.locator.get(id).map(|k| k.value().clone())
    }

    /// Ids of every wager placed by `user`, in placement order.
    #[must_use]
    pub fn wager_ids_for(&self, user: &UserId) -> Vec<WagerId> {
        self.by_user
            .get(user)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    /// Copy of a wager's current state. Takes the owning book's lock.
    #[must_use]
    pub fn snapshot(&self, id: &WagerId) -> Option<Wager> {
        let key = self.locate(id)?;
        let book = self.existing(&key)?;
        let guard = book.lock();
        guard.get(id).cloned()
    }

    #[must_use]
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    #[must_use]
    pub fn wager_count(&self) -> usize {
        self.locator.len()
    }
}

#[cfg(test)]
mod tests {
    use backlay_types::Side;
    use rust_decimal::Decimal;

    use super::*;

    fn key(runner: &str) -> BookKey {
        BookKey::new(MarketId::from("1.100"), runner)
    }

    #[test]
    fn book_is_created_once() {
        let registry = BookRegistry::new();
        let a = registry.book(&key("Home"));
        let b = registry.book(&key("Home"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.book_count(), 1);
        assert!(registry.existing(&key("Away")).is_none());
    }

    #[test]
    fn books_for_market_sorted_and_scoped() {
        let registry = BookRegistry::new();
        registry.book(&key("Draw"));
        registry.book(&key("Away"));
        registry.book(&BookKey::new(MarketId::from("1.200"), "Home"));

        let keys: Vec<_> = registry
            .books_for_market(&MarketId::from("1.100"))
            .into_iter()
            .map(|(k, _)| k.runner)
            .collect();
        assert_eq!(keys, vec!["Away".to_string(), "Draw".to_string()]);
    }

    #[test]
    fn index_and_snapshot() {
        let registry = BookRegistry::new();
        let wager = Wager::dummy_for_user("alice", Side::Back, Decimal::TWO, Decimal::TEN, 0);
        let id = wager.id;
        registry.index(&wager);
        registry.book(&wager.book_key()).lock().admit(wager).unwrap();

        assert_eq!(registry.locate(&id), Some(key("Home")));
        assert_eq!(registry.wager_ids_for(&UserId::from("alice")), vec![id]);
        assert!(registry.wager_ids_for(&UserId::from("bob")).is_empty());
        assert_eq!(registry.snapshot(&id).map(|w| w.stake), Some(Decimal::TEN));
        assert!(registry.snapshot(&WagerId::new()).is_none());
    }

    #[test]
    fn concurrent_book_creation_yields_one_partition() {
        let registry = Arc::new(BookRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.book(&key("Home")))
            })
            .collect();
        let books: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(books.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.book_count(), 1);
    }
}
