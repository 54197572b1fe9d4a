//! Order book state: data model, registry, synchronization.
//!
//! This module handles:
//! - The per-symbol price-level book and its invariants
//! - The concurrency-safe symbol registry
//! - Snapshot install and buffered-diff replay

pub mod store;
pub mod sync;
pub mod types;

pub use store::BookStore;
pub use sync::BookSynchronizer;
pub use types::{OrderBook, PersistedBook, PersistedRegistry, Side};
