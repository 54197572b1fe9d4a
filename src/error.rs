//! Unified error types for the order-book watcher.

use thiserror::Error;

/// Unified top-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// REST feed error.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Websocket stream error.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// Persistence error.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// REST price-feed errors (snapshot, metadata, price lookups).
#[derive(Error, Debug)]
pub enum FeedError {
    /// A REST fetch came back non-2xx.
    #[error("failed to fetch {what} for {symbol}: {reason}")]
    FetchFailed {
        /// What was being fetched (snapshot, price, ...).
        what: &'static str,
        /// The symbol that failed.
        symbol: String,
        /// Reason for failure.
        reason: String,
    },

    /// Exchange info carried no PRICE_FILTER tick size for the symbol.
    #[error("no tick size found for {symbol}")]
    MissingTickSize {
        /// The symbol without a tick size.
        symbol: String,
    },

    /// Failed to parse a feed payload.
    #[error("failed to parse feed data: {0}")]
    ParseError(String),

    /// No symbol passed the selection thresholds.
    #[error("no symbols matched the selection thresholds")]
    NoSymbolsSelected,

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Websocket subscription errors.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Connection failed.
    #[error("websocket connection failed: {0}")]
    ConnectionFailed(String),

    /// Send failed.
    #[error("failed to send websocket message: {0}")]
    SendFailed(String),

    /// The subscription ended (server close or stream exhaustion).
    #[error("websocket stream ended")]
    StreamEnded,

    /// No data arrived within the stall bound; treated as a disruption.
    #[error("websocket stalled: no data for {idle_secs}s")]
    Stalled {
        /// Seconds the stream sat idle.
        idle_secs: u64,
    },

    /// Invalid stream URL.
    #[error("invalid websocket url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Tungstenite error.
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Durable snapshot read/write errors.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Filesystem error during staging write or rename.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
