//! Concurrency-safe registry of per-symbol books.

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::warn;

use crate::feed::types::{DepthSnapshot, DiffEvent};

use super::types::{OrderBook, PersistedRegistry, Side};

/// Symbol→book registry; the sole owner of live state.
///
/// Created once at startup for the selected symbol set and never
/// resized during a run. Each symbol's book sits behind its own map
/// entry lock, so mutations of one symbol serialize against each other
/// while symbols stay independent. Locks are held only across the
/// in-memory mutation, never across network or disk I/O.
#[derive(Debug)]
pub struct BookStore {
    books: DashMap<String, OrderBook>,
}

impl BookStore {
    /// Create the registry for a fixed symbol set.
    pub fn new(symbols: &[String]) -> Self {
        let books = DashMap::with_capacity(symbols.len());
        for symbol in symbols {
            books.insert(symbol.to_uppercase(), OrderBook::new());
        }
        Self { books }
    }

    /// Symbols in the registry.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.books.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Whether a symbol is tracked.
    pub fn contains(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    /// Upsert one level; quantity ≤ 0 deletes it. Returns `false` for
    /// an untracked symbol.
    pub fn apply_diff(&self, symbol: &str, side: Side, price: Decimal, quantity: Decimal) -> bool {
        match self.books.get_mut(symbol) {
            Some(mut book) => {
                book.apply_level(side, price, quantity);
                true
            }
            None => {
                warn!(symbol = %symbol, side = %side, "diff for untracked symbol dropped");
                false
            }
        }
    }

    /// Apply a whole diff event under one entry lock.
    pub fn apply_event(&self, symbol: &str, diff: &DiffEvent) -> bool {
        match self.books.get_mut(symbol) {
            Some(mut book) => {
                book.apply_diff(diff);
                true
            }
            None => {
                warn!(symbol = %symbol, "event for untracked symbol dropped");
                false
            }
        }
    }

    /// Atomically replace a symbol's book with a snapshot.
    pub fn install_snapshot(&self, symbol: &str, snapshot: &DepthSnapshot) -> bool {
        match self.books.get_mut(symbol) {
            Some(mut book) => {
                book.install_snapshot(snapshot);
                true
            }
            None => {
                warn!(symbol = %symbol, "snapshot for untracked symbol dropped");
                false
            }
        }
    }

    /// Mark a symbol's book stale after a feed disruption.
    pub fn mark_stale(&self, symbol: &str) {
        if let Some(mut book) = self.books.get_mut(symbol) {
            book.mark_stale();
        }
    }

    /// Whether a symbol's book is live.
    pub fn is_initialized(&self, symbol: &str) -> bool {
        self.books
            .get(symbol)
            .map(|b| b.is_initialized())
            .unwrap_or(false)
    }

    /// Copy of one symbol's book for read access.
    pub fn book_of(&self, symbol: &str) -> Option<OrderBook> {
        self.books.get(symbol).map(|b| b.clone())
    }

    /// Count of live books.
    pub fn initialized_count(&self) -> usize {
        self.books.iter().filter(|b| b.is_initialized()).count()
    }

    /// Per-symbol consistent copy of the whole registry in durable form.
    ///
    /// Each book is copied under its own entry lock; there is no
    /// cross-symbol consistent cut, per the concurrency contract.
    pub fn export(&self) -> PersistedRegistry {
        self.books
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().to_persisted()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::RawLevel;
    use rust_decimal_macros::dec;
    use smallvec::smallvec;

    fn store() -> BookStore {
        BookStore::new(&["DOGEUSDT".to_string(), "XRPUSDT".to_string()])
    }

    fn seed_snapshot() -> DepthSnapshot {
        DepthSnapshot {
            last_update_id: 10,
            bids: vec![RawLevel("0.1".to_string(), "5".to_string())],
            asks: vec![RawLevel("0.2".to_string(), "3".to_string())],
        }
    }

    #[test]
    fn registry_is_fixed_at_startup() {
        let store = store();
        assert_eq!(store.symbols(), vec!["DOGEUSDT", "XRPUSDT"]);
        assert!(store.contains("DOGEUSDT"));
        assert!(!store.contains("BTCUSDT"));
    }

    #[test]
    fn untracked_symbol_is_dropped_not_inserted() {
        let store = store();
        assert!(!store.apply_diff("BTCUSDT", Side::Bid, dec!(1), dec!(1)));
        assert!(!store.contains("BTCUSDT"));
    }

    #[test]
    fn apply_diff_upserts_and_deletes() {
        let store = store();
        store.install_snapshot("DOGEUSDT", &seed_snapshot());

        assert!(store.apply_diff("DOGEUSDT", Side::Bid, dec!(0.15), dec!(8)));
        assert!(store.apply_diff("DOGEUSDT", Side::Bid, dec!(0.1), dec!(0)));

        let book = store.book_of("DOGEUSDT").expect("tracked symbol");
        assert_eq!(book.side(Side::Bid).get(&dec!(0.15)), Some(&dec!(8)));
        assert!(!book.side(Side::Bid).contains_key(&dec!(0.1)));
    }

    #[test]
    fn symbols_are_independent() {
        let store = store();
        store.install_snapshot("DOGEUSDT", &seed_snapshot());

        let diff = DiffEvent {
            first_update_id: 11,
            final_update_id: 12,
            bids: smallvec![(dec!(0.5), dec!(1))],
            asks: smallvec![],
        };
        store.apply_event("XRPUSDT", &diff);

        let doge = store.book_of("DOGEUSDT").expect("tracked");
        let xrp = store.book_of("XRPUSDT").expect("tracked");
        assert!(!doge.side(Side::Bid).contains_key(&dec!(0.5)));
        assert_eq!(xrp.side(Side::Bid).get(&dec!(0.5)), Some(&dec!(1)));
    }

    #[test]
    fn stale_then_snapshot_goes_live_again() {
        let store = store();
        store.install_snapshot("DOGEUSDT", &seed_snapshot());
        assert!(store.is_initialized("DOGEUSDT"));

        store.mark_stale("DOGEUSDT");
        assert!(!store.is_initialized("DOGEUSDT"));
        assert_eq!(store.initialized_count(), 0);

        store.install_snapshot("DOGEUSDT", &seed_snapshot());
        assert!(store.is_initialized("DOGEUSDT"));
    }

    #[test]
    fn export_covers_every_symbol() {
        let store = store();
        store.install_snapshot("DOGEUSDT", &seed_snapshot());

        let registry = store.export();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry["DOGEUSDT"].bids.get("0.1"), Some(&"5".to_string()));
        assert!(registry["XRPUSDT"].bids.is_empty());
    }
}
