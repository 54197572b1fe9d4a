//! Bucket aggregation and zone ranking over the persisted registry.
//!
//! This module handles:
//! - Tier-table bucket width resolution
//! - Level bucketing, ranking, and near-touch trimming
//! - Report formatting and the periodic analysis cycle

pub mod buckets;
pub mod engine;
pub mod report;

pub use buckets::{bucket_levels, bucket_width_for, range_key, Bucket};
pub use engine::AggregationEngine;
pub use report::{build_report, format_volume, Zone, ZoneReport};
