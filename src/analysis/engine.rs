//! The aggregation cycle: persisted registry in, zone reports out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::book::types::PersistedBook;
use crate::config::Config;
use crate::error::AppError;
use crate::feed::client::FuturesFeedClient;
use crate::notify::Notifier;
use crate::persist::load_registry;

use super::buckets::bucket_width_for;
use super::report::{build_report, ZoneReport};

/// Unbounded analysis loop over the persisted registry.
pub struct AggregationEngine {
    feed: Arc<FuturesFeedClient>,
    notifier: Arc<dyn Notifier>,
    path: PathBuf,
    interval: Duration,
    top_zones: usize,
    near_touch_skip: usize,
    shutdown: watch::Receiver<bool>,
}

impl AggregationEngine {
    /// Create an engine from config.
    pub fn new(
        feed: Arc<FuturesFeedClient>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            feed,
            notifier,
            path: PathBuf::from(&config.persist_path),
            interval: Duration::from_secs(config.aggregation_interval_s),
            top_zones: config.top_zones,
            near_touch_skip: config.near_touch_skip,
            shutdown,
        }
    }

    /// Run cycles until shutdown, waiting a full interval between
    /// them, including after an empty or unreadable registry.
    pub async fn run(mut self) {
        loop {
            self.cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        info!("aggregation engine stopped");
    }

    /// One cycle. Never errors: an absent or empty registry means
    /// wait-and-retry, and no single symbol's failure escapes.
    pub async fn cycle(&self) {
        let registry = match load_registry(&self.path).await {
            Ok(registry) if !registry.is_empty() => registry,
            Ok(_) => {
                info!(path = %self.path.display(), "persisted registry empty, waiting for next cycle");
                return;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "persisted registry unreadable, treating as empty");
                return;
            }
        };

        crate::metrics::inc_analysis_cycles();
        let _timer = crate::metrics::timer_analysis_cycle();

        for (symbol, persisted) in &registry {
            match self.analyze_symbol(symbol, persisted).await {
                Ok(report) => {
                    if let Err(e) = self.notifier.notify(&report.render()) {
                        warn!(symbol = %symbol, error = %e, "report delivery failed");
                        continue;
                    }
                    crate::metrics::inc_reports_emitted();
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "skipping symbol this cycle");
                }
            }
        }

        info!(symbols = registry.len(), "analysis cycle complete");
    }

    /// Resolve the width from the live price and build the report.
    #[instrument(skip(self, persisted), fields(symbol = %symbol))]
    async fn analyze_symbol(
        &self,
        symbol: &str,
        persisted: &PersistedBook,
    ) -> Result<ZoneReport, AppError> {
        let price = self.feed.last_price(symbol).await?;
        let width = bucket_width_for(price);

        Ok(self.report_for(symbol, persisted, price, width))
    }

    /// The pure tail of a symbol's cycle, split out for tests.
    pub fn report_for(
        &self,
        symbol: &str,
        persisted: &PersistedBook,
        price: Decimal,
        width: Decimal,
    ) -> ZoneReport {
        tracing::debug!(symbol = %symbol, price = %price, width = %width, "bucketing book");
        build_report(symbol, persisted, width, self.top_zones, self.near_touch_skip)
    }
}
