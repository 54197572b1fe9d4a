//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Symbol Selection ===
    /// Explicit symbols to track (comma-separated). Empty = auto-select.
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Minimum 24h quote volume for auto-selected symbols.
    #[serde(default = "default_quote_volume_floor")]
    pub quote_volume_floor: Decimal,

    /// Maximum last price for auto-selected symbols.
    #[serde(default = "default_price_ceiling")]
    pub price_ceiling: Decimal,

    // === Feed Endpoints ===
    /// Futures REST base URL.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    /// Futures websocket base URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Depth snapshot level limit.
    #[serde(default = "default_depth_limit")]
    pub depth_limit: u32,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Stream Resilience ===
    /// Seconds without stream data before the book is considered stale.
    #[serde(default = "default_ws_read_timeout_s")]
    pub ws_read_timeout_s: u64,

    /// Maximum reconnect backoff delay in seconds.
    #[serde(default = "default_ws_reconnect_max_delay_s")]
    pub ws_reconnect_max_delay_s: u64,

    // === Persistence ===
    /// Seconds between durable snapshots of the registry.
    #[serde(default = "default_persist_interval_s")]
    pub persist_interval_s: u64,

    /// Path of the durable registry file.
    #[serde(default = "default_persist_path")]
    pub persist_path: String,

    // === Aggregation ===
    /// Seconds between analysis cycles.
    #[serde(default = "default_aggregation_interval_s")]
    pub aggregation_interval_s: u64,

    /// Number of top-volume buckets selected per side.
    #[serde(default = "default_top_zones")]
    pub top_zones: usize,

    /// Buckets nearest the touch dropped as noise.
    #[serde(default = "default_near_touch_skip")]
    pub near_touch_skip: usize,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_quote_volume_floor() -> Decimal {
    Decimal::new(200_000_000, 0)
}

fn default_price_ceiling() -> Decimal {
    Decimal::new(5, 0)
}

fn default_rest_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_ws_url() -> String {
    "wss://fstream.binance.com/ws".to_string()
}

fn default_depth_limit() -> u32 {
    1000
}

fn default_http_timeout_ms() -> u64 {
    5000
}

fn default_ws_read_timeout_s() -> u64 {
    30
}

fn default_ws_reconnect_max_delay_s() -> u64 {
    30
}

fn default_persist_interval_s() -> u64 {
    10
}

fn default_persist_path() -> String {
    "order_books.json".to_string()
}

fn default_aggregation_interval_s() -> u64 {
    1800
}

fn default_top_zones() -> usize {
    6
}

fn default_near_touch_skip() -> usize {
    2
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.quote_volume_floor <= Decimal::ZERO {
            return Err("QUOTE_VOLUME_FLOOR must be positive".to_string());
        }

        if self.price_ceiling <= Decimal::ZERO {
            return Err("PRICE_CEILING must be positive".to_string());
        }

        if self.depth_limit == 0 {
            return Err("DEPTH_LIMIT must be positive".to_string());
        }

        if self.persist_interval_s == 0 {
            return Err("PERSIST_INTERVAL_S must be positive".to_string());
        }

        if self.aggregation_interval_s == 0 {
            return Err("AGGREGATION_INTERVAL_S must be positive".to_string());
        }

        if self.top_zones == 0 {
            return Err("TOP_ZONES must be positive".to_string());
        }

        if self.near_touch_skip >= self.top_zones {
            return Err("NEAR_TOUCH_SKIP must be smaller than TOP_ZONES".to_string());
        }

        for symbol in &self.symbols {
            if symbol.trim().is_empty() {
                return Err("SYMBOLS contains an empty entry".to_string());
            }
        }

        Ok(())
    }

    /// Explicit symbols, uppercased the way the exchange expects them.
    pub fn symbols_upper(&self) -> Vec<String> {
        self.symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .collect()
    }
}
