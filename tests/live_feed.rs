//! Integration tests against the real futures REST API.
//!
//! These tests need outbound network access.
//! Run with: cargo test --test live_feed -- --ignored

use rust_decimal::Decimal;

use zonewatch::feed::client::FuturesFeedClient;
use zonewatch::Config;

fn test_config() -> Config {
    serde_json::from_value(serde_json::json!({})).expect("defaults fill every field")
}

#[tokio::test]
#[ignore = "requires network access to the futures API"]
async fn fetch_depth_snapshot() {
    let feed = FuturesFeedClient::new(&test_config());

    let snapshot = feed
        .depth_snapshot("BTCUSDT")
        .await
        .expect("snapshot fetch failed");

    assert!(snapshot.last_update_id > 0);
    assert!(!snapshot.bids.is_empty(), "snapshot has no bids");
    assert!(!snapshot.asks.is_empty(), "snapshot has no asks");

    let best_bid = snapshot.bids[0].price_decimal().expect("parseable bid");
    let best_ask = snapshot.asks[0].price_decimal().expect("parseable ask");
    assert!(best_bid < best_ask, "book is crossed");
}

#[tokio::test]
#[ignore = "requires network access to the futures API"]
async fn fetch_last_price() {
    let feed = FuturesFeedClient::new(&test_config());

    let price = feed.last_price("BTCUSDT").await.expect("price fetch failed");
    assert!(price > Decimal::ZERO);
}

#[tokio::test]
#[ignore = "requires network access to the futures API"]
async fn fetch_tick_size() {
    let feed = FuturesFeedClient::new(&test_config());

    let tick = feed.tick_size("BTCUSDT").await.expect("tick size fetch failed");
    assert!(tick > Decimal::ZERO);
}

#[tokio::test]
#[ignore = "requires network access to the futures API"]
async fn selection_thresholds_filter_tickers() {
    let config = test_config();
    let feed = FuturesFeedClient::new(&config);

    let stats = feed.ticker_stats().await.expect("ticker fetch failed");
    assert!(!stats.is_empty());

    let selected =
        zonewatch::feed::client::filter_symbols(&stats, config.quote_volume_floor, config.price_ceiling);

    for symbol in &selected {
        assert!(symbol.ends_with("USDT"));
    }
}
