//! Order book data model.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::warn;

use crate::feed::types::{DepthSnapshot, DiffEvent};

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// Buy side.
    Bid,
    /// Sell side.
    Ask,
}

/// Price-level book for one symbol: two independent price→quantity maps.
///
/// A level with quantity ≤ 0 never exists in the maps; applying
/// quantity 0 for a price removes it. Ordering is imposed at read time,
/// not in storage. The book starts uninitialized and goes live once a
/// snapshot is installed.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// Bid levels: price -> quantity.
    bids: HashMap<Decimal, Decimal>,
    /// Ask levels: price -> quantity.
    asks: HashMap<Decimal, Decimal>,
    /// Update id the book is current as of.
    last_update_id: u64,
    /// Whether a snapshot has been installed.
    initialized: bool,
}

/// A book in its durable form: textual decimals, sorted keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedBook {
    /// Bid levels: price -> quantity, both textual.
    pub bids: BTreeMap<String, String>,
    /// Ask levels: price -> quantity, both textual.
    pub asks: BTreeMap<String, String>,
}

/// The whole registry in its durable form.
pub type PersistedRegistry = BTreeMap<String, PersistedBook>;

impl OrderBook {
    /// Create a new, empty, uninitialized book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot has been installed since the last disruption.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Update id the book is current as of.
    pub fn last_update_id(&self) -> u64 {
        self.last_update_id
    }

    /// Upsert one level; quantity ≤ 0 deletes the price.
    pub fn apply_level(&mut self, side: Side, price: Decimal, quantity: Decimal) {
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };

        if quantity <= Decimal::ZERO {
            levels.remove(&price);
        } else {
            levels.insert(price, quantity);
        }
    }

    /// Apply every pair of a diff event, bids then asks, in receipt order.
    pub fn apply_diff(&mut self, diff: &DiffEvent) {
        for &(price, qty) in &diff.bids {
            self.apply_level(Side::Bid, price, qty);
        }
        for &(price, qty) in &diff.asks {
            self.apply_level(Side::Ask, price, qty);
        }
        self.last_update_id = diff.final_update_id;
    }

    /// Replace the entire book contents with a snapshot and mark it live.
    ///
    /// Levels with an unparseable price or quantity are skipped; a
    /// snapshot is never partially merged into prior state.
    pub fn install_snapshot(&mut self, snapshot: &DepthSnapshot) {
        self.bids.clear();
        self.asks.clear();

        for raw in &snapshot.bids {
            match (raw.price_decimal(), raw.quantity_decimal()) {
                (Some(price), Some(qty)) if qty > Decimal::ZERO => {
                    self.bids.insert(price, qty);
                }
                (Some(_), Some(_)) => {}
                _ => warn!(price = %raw.0, qty = %raw.1, "skipping malformed snapshot bid"),
            }
        }
        for raw in &snapshot.asks {
            match (raw.price_decimal(), raw.quantity_decimal()) {
                (Some(price), Some(qty)) if qty > Decimal::ZERO => {
                    self.asks.insert(price, qty);
                }
                (Some(_), Some(_)) => {}
                _ => warn!(price = %raw.0, qty = %raw.1, "skipping malformed snapshot ask"),
            }
        }

        self.last_update_id = snapshot.last_update_id;
        self.initialized = true;
    }

    /// Mark the book stale after a feed disruption. Levels stay in
    /// place for readers but diffs are no longer authoritative until
    /// the next snapshot install.
    pub fn mark_stale(&mut self) {
        self.initialized = false;
    }

    /// Read one side.
    pub fn side(&self, side: Side) -> &HashMap<Decimal, Decimal> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Bid levels sorted by price descending (touch first).
    pub fn sorted_bids(&self) -> Vec<(Decimal, Decimal)> {
        let mut levels: Vec<(Decimal, Decimal)> =
            self.bids.iter().map(|(&p, &q)| (p, q)).collect();
        levels.sort_by(|a, b| b.0.cmp(&a.0));
        levels
    }

    /// Ask levels sorted by price ascending (touch first).
    pub fn sorted_asks(&self) -> Vec<(Decimal, Decimal)> {
        let mut levels: Vec<(Decimal, Decimal)> =
            self.asks.iter().map(|(&p, &q)| (p, q)).collect();
        levels.sort_by(|a, b| a.0.cmp(&b.0));
        levels
    }

    /// Get the best bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().max().copied()
    }

    /// Get the best ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().min().copied()
    }

    /// Level counts as (bids, asks).
    pub fn level_counts(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    /// Convert to the durable textual form.
    pub fn to_persisted(&self) -> PersistedBook {
        PersistedBook {
            bids: self
                .bids
                .iter()
                .map(|(p, q)| (p.to_string(), q.to_string()))
                .collect(),
            asks: self
                .asks
                .iter()
                .map(|(p, q)| (p.to_string(), q.to_string()))
                .collect(),
        }
    }

    /// Rebuild a book from its durable form. Unparseable entries are
    /// skipped and logged. The result is marked live.
    pub fn from_persisted(persisted: &PersistedBook) -> Self {
        let mut book = Self::new();

        for (price, qty) in &persisted.bids {
            match (price.parse::<Decimal>(), qty.parse::<Decimal>()) {
                (Ok(p), Ok(q)) if q > Decimal::ZERO => {
                    book.bids.insert(p, q);
                }
                _ => warn!(price = %price, qty = %qty, "skipping malformed persisted bid"),
            }
        }
        for (price, qty) in &persisted.asks {
            match (price.parse::<Decimal>(), qty.parse::<Decimal>()) {
                (Ok(p), Ok(q)) if q > Decimal::ZERO => {
                    book.asks.insert(p, q);
                }
                _ => warn!(price = %price, qty = %qty, "skipping malformed persisted ask"),
            }
        }

        book.initialized = true;
        book
    }
}
