//! Per-symbol websocket subscription to the depth diff stream.
//!
//! One [`DepthStream`] wraps one live subscription. Reconnection policy
//! lives in [`ReconnectConfig`]; the ingestion worker owns the retry
//! loop so a disruption always routes through resynchronization.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::StreamError;

use super::types::{DepthUpdateEvent, DiffEvent};

/// Reconnection policy for a depth subscription.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial backoff delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum backoff delay in seconds.
    pub max_delay_s: u64,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub backoff_multiplier: f64,
    /// Seconds without data before the subscription counts as stalled.
    pub read_timeout_s: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_s: 30,
            backoff_multiplier: 2.0,
            read_timeout_s: 30,
        }
    }
}

impl ReconnectConfig {
    /// Create from config values.
    pub fn from_config(max_delay_s: u64, read_timeout_s: u64) -> Self {
        Self {
            max_delay_s,
            read_timeout_s,
            ..Default::default()
        }
    }

    /// Calculate next delay with exponential backoff.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let max_delay_ms = self.max_delay_s * 1000;
        let clamped_ms = delay_ms.min(max_delay_ms as f64) as u64;
        Duration::from_millis(clamped_ms)
    }

    /// Stall bound as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_s)
    }
}

/// One live depth subscription for one symbol.
pub struct DepthStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
    symbol: String,
}

impl DepthStream {
    /// Connect to the stream endpoint and subscribe to the symbol's
    /// 100ms diff feed.
    pub async fn connect(ws_url: &str, symbol: &str) -> Result<Self, StreamError> {
        let url = Url::parse(ws_url)?;

        info!(url = %url, symbol = %symbol, "connecting depth stream");

        let (inner, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;

        let mut stream = Self {
            inner,
            symbol: symbol.to_lowercase(),
        };
        stream.subscribe().await?;

        Ok(stream)
    }

    /// Send the SUBSCRIBE message for this symbol's diff stream.
    async fn subscribe(&mut self) -> Result<(), StreamError> {
        let msg = Self::subscribe_message(&self.symbol);

        self.inner
            .send(Message::Text(msg))
            .await
            .map_err(|e| StreamError::SendFailed(e.to_string()))?;

        info!(symbol = %self.symbol, "subscribed to depth stream");
        Ok(())
    }

    /// Build the subscription message JSON for a symbol.
    pub fn subscribe_message(symbol: &str) -> String {
        serde_json::json!({
            "method": "SUBSCRIBE",
            "params": [format!("{}@depth@100ms", symbol.to_lowercase())],
            "id": 1
        })
        .to_string()
    }

    /// Read the next frame from the subscription.
    ///
    /// Returns `Ok(Some(diff))` for a depth update, `Ok(None)` for
    /// non-data frames (subscription acks, pongs), and an error once
    /// the connection is unusable. Malformed payloads are dropped and
    /// logged, never fatal.
    pub async fn next_event(&mut self) -> Result<Option<DiffEvent>, StreamError> {
        let msg = match self.inner.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => return Err(StreamError::Tungstenite(e)),
            None => return Err(StreamError::StreamEnded),
        };

        match msg {
            Message::Text(text) => Ok(Self::parse_text_message(&self.symbol, &text)),
            Message::Ping(data) => {
                self.inner
                    .send(Message::Pong(data))
                    .await
                    .map_err(|e| StreamError::SendFailed(e.to_string()))?;
                trace!(symbol = %self.symbol, "responded to ping with pong");
                Ok(None)
            }
            Message::Pong(_) => {
                trace!(symbol = %self.symbol, "received pong");
                Ok(None)
            }
            Message::Close(frame) => {
                warn!(symbol = %self.symbol, frame = ?frame, "websocket closed by server");
                Err(StreamError::StreamEnded)
            }
            _ => Ok(None),
        }
    }

    /// Parse a text frame into a [`DiffEvent`], if it is one.
    fn parse_text_message(symbol: &str, text: &str) -> Option<DiffEvent> {
        crate::metrics::inc_stream_messages();

        match serde_json::from_str::<DepthUpdateEvent>(text) {
            Ok(event) if event.event_type == "depthUpdate" => {
                debug!(
                    symbol = %event.symbol,
                    first_id = event.first_update_id,
                    last_id = event.final_update_id,
                    bids = event.bids.len(),
                    asks = event.asks.len(),
                    "parsed depth update"
                );
                Some(event.to_diff())
            }
            Ok(_) => None,
            Err(_) => {
                // Subscription acks ({"result":null,"id":1}) land here too.
                trace!(symbol = %symbol, msg = %text, "ignoring non-data message");
                None
            }
        }
    }

    /// Close the subscription cleanly.
    pub async fn close(mut self) {
        if let Err(e) = self.inner.close(None).await {
            debug!(symbol = %self.symbol, error = %e, "error closing websocket");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn subscription_message_format() {
        let msg = DepthStream::subscribe_message("DOGEUSDT");
        let parsed: serde_json::Value = serde_json::from_str(&msg).expect("valid JSON");

        assert_eq!(parsed["method"], "SUBSCRIBE");
        assert_eq!(parsed["id"], 1);

        let params = parsed["params"].as_array().expect("params is array");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0], "dogeusdt@depth@100ms");
    }

    #[test]
    fn parse_depth_update() {
        let json = r#"{
            "e": "depthUpdate",
            "E": 1706000000000,
            "s": "DOGEUSDT",
            "U": 100,
            "u": 105,
            "b": [["0.12345", "1500"]],
            "a": [["0.12350", "0"]]
        }"#;

        let diff = DepthStream::parse_text_message("dogeusdt", json).expect("depth update");
        assert_eq!(diff.first_update_id, 100);
        assert_eq!(diff.final_update_id, 105);
        assert_eq!(diff.bids[0], (dec!(0.12345), dec!(1500)));
        assert_eq!(diff.asks[0], (dec!(0.12350), dec!(0)));
    }

    #[test]
    fn parse_subscription_ack_returns_none() {
        let json = r#"{"result": null, "id": 1}"#;
        assert!(DepthStream::parse_text_message("dogeusdt", json).is_none());
    }

    #[test]
    fn parse_other_event_type_returns_none() {
        let json = r#"{
            "e": "aggTrade",
            "E": 1706000000000,
            "s": "DOGEUSDT",
            "U": 1,
            "u": 2,
            "b": [],
            "a": []
        }"#;
        assert!(DepthStream::parse_text_message("dogeusdt", json).is_none());
    }

    #[test]
    fn backoff_grows_and_clamps() {
        let config = ReconnectConfig::default();
        assert_eq!(config.next_delay(0), Duration::from_millis(1000));
        assert_eq!(config.next_delay(1), Duration::from_millis(2000));
        assert_eq!(config.next_delay(10), Duration::from_secs(30));
    }
}
