//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::book::BookStore;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether ingestion is up and the registry is populated.
    pub ready: Arc<AtomicBool>,
    /// The live book registry.
    pub store: Arc<BookStore>,
    /// When the registry was last flushed to disk.
    pub last_persist_at: Arc<tokio::sync::RwLock<Option<OffsetDateTime>>>,
    /// Prometheus render handle, when the exporter is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state over a registry.
    pub fn new(store: Arc<BookStore>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            store,
            last_persist_at: Arc::new(tokio::sync::RwLock::new(None)),
            prometheus: None,
        }
    }

    /// Attach the Prometheus render handle.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the service is ready.
    pub ready: bool,
    /// Number of tracked symbols.
    pub symbols: usize,
    /// Number of books that are live.
    pub initialized: usize,
}

/// Per-book status.
#[derive(Debug, Serialize)]
pub struct BookStatus {
    /// Symbol name.
    pub symbol: String,
    /// Whether the book is live.
    pub initialized: bool,
    /// Bid level count.
    pub bid_levels: usize,
    /// Ask level count.
    pub ask_levels: usize,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Per-book state.
    pub books: Vec<BookStatus>,
    /// Last durable flush, RFC 3339.
    pub last_persist_at: Option<String>,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();

    let response = ReadyResponse {
        ready: is_ready,
        symbols: state.store.symbols().len(),
        initialized: state.store.initialized_count(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns per-book state and the last flush time.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let books = state
        .store
        .symbols()
        .into_iter()
        .map(|symbol| {
            let (initialized, bid_levels, ask_levels) = state
                .store
                .book_of(&symbol)
                .map(|b| {
                    let (bids, asks) = b.level_counts();
                    (b.is_initialized(), bids, asks)
                })
                .unwrap_or((false, 0, 0));
            BookStatus {
                symbol,
                initialized,
                bid_levels,
                ask_levels,
            }
        })
        .collect();

    let status = if state.is_ready() { "running" } else { "starting" };

    let last_flush = *state.last_persist_at.read().await;
    let last_persist_at = last_flush.and_then(|t| t.format(&Rfc3339).ok());

    Json(StatusResponse {
        status,
        books,
        last_persist_at,
    })
}

/// Metrics handler - renders the Prometheus exposition text.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics exporter not installed\n".to_string(),
        ),
    }
}
