//! Order-book reconstruction and volume-zone analysis for Binance
//! USDⓈ-M futures.
//!
//! The pipeline keeps one authoritative price-level book per tracked
//! symbol by seeding it with a REST depth snapshot and applying the
//! 100ms diff stream on top, buffering any diffs that race the
//! snapshot fetch. The registry is flushed to a durable JSON file on a
//! fixed interval, and a separate analysis loop aggregates that file
//! into coarse price buckets to surface the highest-volume
//! support/resistance zones per symbol.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`feed`]: REST and websocket exchange collaborators
//! - [`book`]: Book data model, registry, and synchronization
//! - [`ingest`]: Per-symbol ingestion workers
//! - [`persist`]: Periodic durable snapshots of the registry
//! - [`analysis`]: Bucket aggregation and zone reports
//! - [`notify`]: Report delivery seam
//! - [`api`]: HTTP API for health/metrics
//! - [`metrics`]: Prometheus counters and histograms
//! - [`utils`]: Utility functions

pub mod analysis;
pub mod api;
pub mod book;
pub mod config;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod persist;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
