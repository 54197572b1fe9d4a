//! Per-symbol ingestion workers.
//!
//! One long-lived worker per symbol subscribes to the diff stream and
//! keeps the shared book current. Session discipline:
//!
//! 1. Connect and subscribe.
//! 2. Buffer diffs while the snapshot fetch is in flight.
//! 3. Install the snapshot, replay the buffer.
//! 4. Apply live events in receipt order.
//!
//! Any transport error, server close, or stalled read marks the book
//! stale and restarts the session from step 1 after a backoff, so
//! resynchronization is never skipped.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::book::{BookStore, BookSynchronizer};
use crate::error::{AppError, StreamError};
use crate::feed::stream::{DepthStream, ReconnectConfig};

/// A long-lived ingestion unit for one symbol.
pub struct IngestionWorker {
    symbol: String,
    ws_url: String,
    store: Arc<BookStore>,
    sync: BookSynchronizer,
    reconnect: ReconnectConfig,
    shutdown: watch::Receiver<bool>,
}

impl IngestionWorker {
    /// Create a worker for one symbol.
    pub fn new(
        symbol: String,
        ws_url: String,
        store: Arc<BookStore>,
        sync: BookSynchronizer,
        reconnect: ReconnectConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            symbol,
            ws_url,
            store,
            sync,
            reconnect,
            shutdown,
        }
    }

    /// Run until shutdown. Never returns an error: every disruption is
    /// absorbed by the resynchronization loop.
    pub async fn run(mut self) {
        let mut attempt = 0u32;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let stream = match DepthStream::connect(&self.ws_url, &self.symbol).await {
                Ok(stream) => {
                    attempt = 0;
                    stream
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "depth stream connect failed");
                    if self.backoff(&mut attempt).await {
                        break;
                    }
                    continue;
                }
            };

            match self.session(stream).await {
                Ok(()) => break, // shutdown requested
                Err(e) => {
                    // Diffs are no longer authoritative until the next
                    // snapshot install.
                    self.store.mark_stale(&self.symbol);
                    crate::metrics::inc_stream_disruptions();
                    warn!(symbol = %self.symbol, error = %e, "stream disrupted, resynchronizing");
                    if self.backoff(&mut attempt).await {
                        break;
                    }
                }
            }
        }

        info!(symbol = %self.symbol, "ingestion worker stopped");
    }

    /// Sleep out the reconnect backoff. Returns `true` if shutdown
    /// arrived during the wait.
    async fn backoff(&mut self, attempt: &mut u32) -> bool {
        let delay = self.reconnect.next_delay(*attempt);
        *attempt = attempt.saturating_add(1);

        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.shutdown.changed() => true,
        }
    }

    /// One connected session: synchronize, then apply live diffs.
    ///
    /// `Ok(())` means shutdown was requested; any error means the
    /// session was disrupted and the caller must resynchronize.
    async fn session(&mut self, mut stream: DepthStream) -> Result<(), AppError> {
        let symbol = self.symbol.to_uppercase();
        let sync = self.sync.clone();

        // Buffer diffs that race the snapshot fetch; replayed below.
        let mut buffered: VecDeque<crate::feed::types::DiffEvent> = VecDeque::new();
        let init = sync.initialize(&symbol);
        tokio::pin!(init);

        let snapshot_id = loop {
            tokio::select! {
                result = &mut init => break result?,
                event = stream.next_event() => {
                    if let Some(diff) = event? {
                        buffered.push_back(diff);
                    }
                }
                _ = self.shutdown.changed() => {
                    stream.close().await;
                    return Ok(());
                }
            }
        };

        sync.replay(&symbol, buffered, snapshot_id);

        let read_timeout = self.reconnect.read_timeout();
        loop {
            tokio::select! {
                result = timeout(read_timeout, stream.next_event()) => {
                    let event = match result {
                        Ok(event) => event?,
                        Err(_) => {
                            return Err(StreamError::Stalled {
                                idle_secs: self.reconnect.read_timeout_s,
                            }
                            .into());
                        }
                    };

                    if let Some(diff) = event {
                        self.store.apply_event(&symbol, &diff);
                        crate::metrics::inc_diffs_applied();
                    }
                }
                _ = self.shutdown.changed() => {
                    stream.close().await;
                    return Ok(());
                }
            }
        }
    }
}
