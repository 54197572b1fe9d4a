//! Wire types for the futures depth feed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

/// A `[price, quantity]` pair as the exchange sends it: textual decimals.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawLevel(pub String, pub String);

impl RawLevel {
    /// Parse the price to a Decimal.
    pub fn price_decimal(&self) -> Option<Decimal> {
        self.0.parse().ok()
    }

    /// Parse the quantity to a Decimal.
    pub fn quantity_decimal(&self) -> Option<Decimal> {
        self.1.parse().ok()
    }
}

/// Full depth snapshot from the REST endpoint.
///
/// `GET /fapi/v1/depth?symbol={SYMBOL}&limit=1000`
#[derive(Debug, Clone, Deserialize)]
pub struct DepthSnapshot {
    /// Update id the snapshot is current as of.
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    /// Bid levels.
    pub bids: Vec<RawLevel>,
    /// Ask levels.
    pub asks: Vec<RawLevel>,
}

/// Incremental depth update from the `<symbol>@depth@100ms` stream.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthUpdateEvent {
    /// Event type, `"depthUpdate"` for diffs.
    #[serde(rename = "e")]
    pub event_type: String,
    /// Event time in milliseconds.
    #[serde(rename = "E")]
    pub event_time: u64,
    /// Symbol the update applies to.
    #[serde(rename = "s")]
    pub symbol: String,
    /// First update id covered by this event.
    #[serde(rename = "U")]
    pub first_update_id: u64,
    /// Final update id covered by this event.
    #[serde(rename = "u")]
    pub final_update_id: u64,
    /// Bid levels to upsert or delete.
    #[serde(rename = "b")]
    pub bids: Vec<RawLevel>,
    /// Ask levels to upsert or delete.
    #[serde(rename = "a")]
    pub asks: Vec<RawLevel>,
}

/// A parsed diff: the per-side `(price, quantity)` pairs of one event,
/// in receipt order. Quantity zero means delete.
///
/// Diff events usually carry a handful of levels, so the pairs live
/// inline on the stack.
#[derive(Debug, Clone, Default)]
pub struct DiffEvent {
    /// First update id covered by this event.
    pub first_update_id: u64,
    /// Final update id covered by this event.
    pub final_update_id: u64,
    /// Bid side pairs.
    pub bids: SmallVec<[(Decimal, Decimal); 8]>,
    /// Ask side pairs.
    pub asks: SmallVec<[(Decimal, Decimal); 8]>,
}

impl DepthUpdateEvent {
    /// Parse the textual levels into a [`DiffEvent`].
    ///
    /// Pairs with an unparseable price or quantity are dropped and
    /// logged; they never fail the whole event.
    pub fn to_diff(&self) -> DiffEvent {
        let mut diff = DiffEvent {
            first_update_id: self.first_update_id,
            final_update_id: self.final_update_id,
            ..DiffEvent::default()
        };

        for raw in &self.bids {
            match (raw.price_decimal(), raw.quantity_decimal()) {
                (Some(price), Some(qty)) => diff.bids.push((price, qty)),
                _ => {
                    warn!(symbol = %self.symbol, price = %raw.0, qty = %raw.1, "dropping malformed bid level");
                    crate::metrics::inc_malformed_levels();
                }
            }
        }

        for raw in &self.asks {
            match (raw.price_decimal(), raw.quantity_decimal()) {
                (Some(price), Some(qty)) => diff.asks.push((price, qty)),
                _ => {
                    warn!(symbol = %self.symbol, price = %raw.0, qty = %raw.1, "dropping malformed ask level");
                    crate::metrics::inc_malformed_levels();
                }
            }
        }

        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn raw_level_parses_decimals() {
        let level = RawLevel("0.12345".to_string(), "1500".to_string());
        assert_eq!(level.price_decimal(), Some(dec!(0.12345)));
        assert_eq!(level.quantity_decimal(), Some(dec!(1500)));
    }

    #[test]
    fn raw_level_rejects_garbage() {
        let level = RawLevel("not-a-price".to_string(), "1".to_string());
        assert_eq!(level.price_decimal(), None);
    }

    #[test]
    fn depth_update_deserializes_wire_format() {
        let json = r#"{
            "e": "depthUpdate",
            "E": 1706000000000,
            "s": "DOGEUSDT",
            "U": 100,
            "u": 105,
            "b": [["0.12345", "1500"], ["0.12340", "0"]],
            "a": [["0.12350", "900"]]
        }"#;

        let event: DepthUpdateEvent = serde_json::from_str(json).expect("valid event");
        assert_eq!(event.event_type, "depthUpdate");
        assert_eq!(event.symbol, "DOGEUSDT");
        assert_eq!(event.first_update_id, 100);
        assert_eq!(event.final_update_id, 105);
        assert_eq!(event.bids.len(), 2);
        assert_eq!(event.asks.len(), 1);
    }

    #[test]
    fn to_diff_drops_malformed_pairs() {
        let event = DepthUpdateEvent {
            event_type: "depthUpdate".to_string(),
            event_time: 0,
            symbol: "DOGEUSDT".to_string(),
            first_update_id: 1,
            final_update_id: 2,
            bids: vec![
                RawLevel("0.1".to_string(), "5".to_string()),
                RawLevel("bogus".to_string(), "5".to_string()),
            ],
            asks: vec![RawLevel("0.2".to_string(), "??".to_string())],
        };

        let diff = event.to_diff();
        assert_eq!(diff.bids.len(), 1);
        assert_eq!(diff.bids[0], (dec!(0.1), dec!(5)));
        assert!(diff.asks.is_empty());
    }

    #[test]
    fn snapshot_deserializes() {
        let json = r#"{
            "lastUpdateId": 424242,
            "bids": [["0.12345", "1500"]],
            "asks": [["0.12350", "900"]]
        }"#;

        let snapshot: DepthSnapshot = serde_json::from_str(json).expect("valid snapshot");
        assert_eq!(snapshot.last_update_id, 424242);
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.asks.len(), 1);
    }
}
