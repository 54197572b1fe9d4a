//! Snapshot-driven book initialization and resynchronization.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::FeedError;
use crate::feed::client::FuturesFeedClient;
use crate::feed::types::DiffEvent;

use super::store::BookStore;

/// Brings a symbol's book from unknown to live, and back after a
/// disruption.
///
/// Diffs that race the in-flight snapshot fetch must be buffered by the
/// caller and handed to [`replay`](Self::replay) after
/// [`initialize`](Self::initialize) returns; events wholly covered by
/// the snapshot are discarded there, so nothing is lost and nothing
/// covered is applied twice wholesale.
#[derive(Clone)]
pub struct BookSynchronizer {
    feed: Arc<FuturesFeedClient>,
    store: Arc<BookStore>,
}

impl BookSynchronizer {
    /// Create a synchronizer over the shared feed and store.
    pub fn new(feed: Arc<FuturesFeedClient>, store: Arc<BookStore>) -> Self {
        Self { feed, store }
    }

    /// Fetch a fresh snapshot and install it atomically, replacing any
    /// prior state for the symbol. Returns the snapshot's update id.
    ///
    /// Idempotent: safe to re-invoke on every resynchronization.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn initialize(&self, symbol: &str) -> Result<u64, FeedError> {
        let _timer = crate::metrics::timer_snapshot_fetch();
        let snapshot = self.feed.depth_snapshot(symbol).await?;
        let last_update_id = snapshot.last_update_id;

        self.store.install_snapshot(symbol, &snapshot);
        crate::metrics::inc_snapshots_installed();

        info!(
            symbol = %symbol,
            last_update_id,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "snapshot installed"
        );

        Ok(last_update_id)
    }

    /// Replay diffs buffered during the snapshot fetch, in receipt
    /// order. Events whose final update id is covered by the snapshot
    /// are discarded; events straddling the snapshot id are applied
    /// whole, since level upserts are idempotent. Returns how many
    /// events were applied.
    pub fn replay(&self, symbol: &str, buffered: VecDeque<DiffEvent>, snapshot_id: u64) -> usize {
        let total = buffered.len();
        let mut applied = 0usize;

        for event in buffered {
            if event.final_update_id <= snapshot_id {
                debug!(
                    symbol = %symbol,
                    event_id = event.final_update_id,
                    snapshot_id,
                    "discarding buffered event covered by snapshot"
                );
                continue;
            }
            self.store.apply_event(symbol, &event);
            applied += 1;
        }

        if total > 0 {
            info!(symbol = %symbol, buffered = total, applied, "replayed buffered diffs");
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::types::Side;
    use crate::config::Config;
    use rust_decimal_macros::dec;
    use smallvec::smallvec;

    fn test_config() -> Config {
        serde_json::from_value(serde_json::json!({})).expect("defaults fill every field")
    }

    fn synchronizer(store: Arc<BookStore>) -> BookSynchronizer {
        let feed = Arc::new(FuturesFeedClient::new(&test_config()));
        BookSynchronizer::new(feed, store)
    }

    fn diff(final_id: u64, price: rust_decimal::Decimal) -> DiffEvent {
        DiffEvent {
            first_update_id: final_id,
            final_update_id: final_id,
            bids: smallvec![(price, dec!(1))],
            asks: smallvec![],
        }
    }

    #[test]
    fn replay_discards_events_covered_by_snapshot() {
        let store = Arc::new(BookStore::new(&["DOGEUSDT".to_string()]));
        let sync = synchronizer(store.clone());

        let buffered: VecDeque<DiffEvent> = vec![
            diff(90, dec!(0.1)),  // covered, discarded
            diff(100, dec!(0.2)), // covered (boundary), discarded
            diff(110, dec!(0.3)), // applied
        ]
        .into();

        let applied = sync.replay("DOGEUSDT", buffered, 100);
        assert_eq!(applied, 1);

        let book = store.book_of("DOGEUSDT").expect("tracked");
        assert!(!book.side(Side::Bid).contains_key(&dec!(0.1)));
        assert!(!book.side(Side::Bid).contains_key(&dec!(0.2)));
        assert_eq!(book.side(Side::Bid).get(&dec!(0.3)), Some(&dec!(1)));
    }

    #[test]
    fn replay_preserves_receipt_order() {
        let store = Arc::new(BookStore::new(&["DOGEUSDT".to_string()]));
        let sync = synchronizer(store.clone());

        // Same price updated twice after the snapshot id: last write wins.
        let mut first = diff(101, dec!(0.5));
        first.bids = smallvec![(dec!(0.5), dec!(3))];
        let mut second = diff(102, dec!(0.5));
        second.bids = smallvec![(dec!(0.5), dec!(7))];

        sync.replay("DOGEUSDT", vec![first, second].into(), 100);

        let book = store.book_of("DOGEUSDT").expect("tracked");
        assert_eq!(book.side(Side::Bid).get(&dec!(0.5)), Some(&dec!(7)));
    }

    #[test]
    fn replay_of_empty_buffer_is_a_noop() {
        let store = Arc::new(BookStore::new(&["DOGEUSDT".to_string()]));
        let sync = synchronizer(store.clone());

        assert_eq!(sync.replay("DOGEUSDT", VecDeque::new(), 100), 0);
    }
}
