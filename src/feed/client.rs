//! REST client for the futures price feed.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::FeedError;

use super::types::DepthSnapshot;

/// Futures REST API client: snapshots, instrument metadata, prices.
#[derive(Debug, Clone)]
pub struct FuturesFeedClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for the futures REST API.
    rest_url: String,
    /// Depth snapshot level limit.
    depth_limit: u32,
}

/// 24h ticker statistics for one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerStats {
    /// Symbol name.
    pub symbol: String,
    /// Last traded price.
    #[serde(rename = "lastPrice")]
    pub last_price: String,
    /// 24h quote-asset volume.
    #[serde(rename = "quoteVolume")]
    pub quote_volume: String,
}

/// Last traded price for one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceTicker {
    /// Symbol name.
    pub symbol: String,
    /// Last traded price.
    pub price: String,
}

/// Exchange info response (instrument filters).
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    /// Per-instrument metadata.
    pub symbols: Vec<InstrumentInfo>,
}

/// Metadata for one instrument.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentInfo {
    /// Symbol name.
    pub symbol: String,
    /// Instrument filters.
    #[serde(default)]
    pub filters: Vec<InstrumentFilter>,
}

/// One instrument filter entry.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentFilter {
    /// Filter type, e.g. `PRICE_FILTER`.
    #[serde(rename = "filterType")]
    pub filter_type: String,
    /// Tick size, present on `PRICE_FILTER`.
    #[serde(rename = "tickSize")]
    pub tick_size: Option<String>,
}

impl FuturesFeedClient {
    /// Create a new feed client with pooled, low-latency HTTP settings.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            rest_url: config.rest_url.clone(),
            depth_limit: config.depth_limit,
        }
    }

    /// Get the HTTP client reference.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch a full depth snapshot for a symbol.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn depth_snapshot(&self, symbol: &str) -> Result<DepthSnapshot, FeedError> {
        let url = format!("{}/fapi/v1/depth", self.rest_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol.to_uppercase()),
                ("limit", self.depth_limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::FetchFailed {
                what: "depth snapshot",
                symbol: symbol.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let snapshot: DepthSnapshot = response.json().await.map_err(|e| {
            FeedError::ParseError(format!("depth snapshot for {symbol}: {e}"))
        })?;

        debug!(
            symbol = %symbol,
            last_update_id = snapshot.last_update_id,
            bids = snapshot.bids.len(),
            asks = snapshot.asks.len(),
            "depth snapshot received"
        );

        Ok(snapshot)
    }

    /// Fetch the last traded price for a symbol.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn last_price(&self, symbol: &str) -> Result<Decimal, FeedError> {
        let url = format!("{}/fapi/v1/ticker/price", self.rest_url);

        let response = self
            .http
            .get(&url)
            .query(&[("symbol", symbol.to_uppercase())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::FetchFailed {
                what: "last price",
                symbol: symbol.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let ticker: PriceTicker = response.json().await.map_err(|e| {
            FeedError::ParseError(format!("price ticker for {symbol}: {e}"))
        })?;

        ticker.price.parse().map_err(|_| {
            FeedError::ParseError(format!("unparseable price {:?} for {symbol}", ticker.price))
        })
    }

    /// Fetch the tick size for a symbol from the exchange-info filters.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn tick_size(&self, symbol: &str) -> Result<Decimal, FeedError> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.rest_url);

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::FetchFailed {
                what: "exchange info",
                symbol: symbol.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let info: ExchangeInfo = response.json().await.map_err(|e| {
            FeedError::ParseError(format!("exchange info: {e}"))
        })?;

        let upper = symbol.to_uppercase();
        for instrument in &info.symbols {
            if instrument.symbol != upper {
                continue;
            }
            for filter in &instrument.filters {
                if filter.filter_type == "PRICE_FILTER" {
                    if let Some(tick) = filter.tick_size.as_deref().and_then(|t| t.parse().ok()) {
                        return Ok(tick);
                    }
                }
            }
        }

        Err(FeedError::MissingTickSize {
            symbol: symbol.to_string(),
        })
    }

    /// Fetch 24h ticker statistics for all instruments.
    #[instrument(skip(self))]
    pub async fn ticker_stats(&self) -> Result<Vec<TickerStats>, FeedError> {
        let url = format!("{}/fapi/v1/ticker/24hr", self.rest_url);

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::FetchFailed {
                what: "24h tickers",
                symbol: "*".to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.json().await.map_err(|e| {
            FeedError::ParseError(format!("24h tickers: {e}"))
        })
    }

    /// Select the tracked symbol set: USDT-quoted instruments above the
    /// quote-volume floor and below the price ceiling.
    ///
    /// The result is sorted so the registry layout is stable run-to-run.
    #[instrument(skip(self, config))]
    pub async fn select_symbols(&self, config: &Config) -> Result<Vec<String>, FeedError> {
        let stats = self.ticker_stats().await?;
        let selected = filter_symbols(&stats, config.quote_volume_floor, config.price_ceiling);

        if selected.is_empty() {
            return Err(FeedError::NoSymbolsSelected);
        }

        Ok(selected)
    }
}

/// Apply the selection thresholds to a ticker list.
pub fn filter_symbols(
    stats: &[TickerStats],
    quote_volume_floor: Decimal,
    price_ceiling: Decimal,
) -> Vec<String> {
    let mut selected: Vec<String> = stats
        .iter()
        .filter(|t| t.symbol.ends_with("USDT"))
        .filter_map(|t| {
            let volume: Decimal = match t.quote_volume.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(symbol = %t.symbol, volume = %t.quote_volume, "unparseable quote volume, skipping");
                    return None;
                }
            };
            let price: Decimal = match t.last_price.parse() {
                Ok(p) => p,
                Err(_) => {
                    warn!(symbol = %t.symbol, price = %t.last_price, "unparseable last price, skipping");
                    return None;
                }
            };
            (volume > quote_volume_floor && price < price_ceiling).then(|| t.symbol.clone())
        })
        .collect();

    selected.sort();
    selected
}
