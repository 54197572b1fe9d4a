//! Exchange feed collaborators.
//!
//! This module handles:
//! - REST access: depth snapshots, instrument metadata, prices
//! - The per-symbol websocket diff subscription
//! - Wire types and their Decimal parsing

pub mod client;
pub mod stream;
pub mod types;

pub use client::{FuturesFeedClient, TickerStats};
pub use stream::{DepthStream, ReconnectConfig};
pub use types::{DepthSnapshot, DepthUpdateEvent, DiffEvent, RawLevel};
