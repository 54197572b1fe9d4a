//! Price-bucket aggregation and zone ranking.
//!
//! Levels are grouped into buckets of `floor(price / width) * width`,
//! ranked by total quantity, then re-ordered for presentation with the
//! near-touch buckets dropped as noise. All arithmetic is Decimal so
//! the floor never misclassifies a boundary price.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use crate::book::types::Side;

/// Width tiers keyed by current price: (exclusive upper bound, width).
static WIDTH_TIERS: Lazy<[(Decimal, Decimal); 7]> = Lazy::new(|| {
    [
        (Decimal::new(1, 3), Decimal::new(1, 5)),
        (Decimal::new(1, 2), Decimal::new(1, 4)),
        (Decimal::new(1, 1), Decimal::new(1, 3)),
        (Decimal::ONE, Decimal::new(1, 2)),
        (Decimal::TEN, Decimal::new(1, 1)),
        (Decimal::ONE_HUNDRED, Decimal::ONE),
        (Decimal::ONE_THOUSAND, Decimal::TEN),
    ]
});

/// Bucket width for prices past the last tier.
static WIDTH_CEILING: Lazy<Decimal> = Lazy::new(|| Decimal::new(100, 0));

/// Resolve the bucket width from the current price via the tier table.
pub fn bucket_width_for(price: Decimal) -> Decimal {
    for (bound, width) in WIDTH_TIERS.iter() {
        if price < *bound {
            return *width;
        }
    }
    *WIDTH_CEILING
}

/// Bucket key for a price: `floor(price / width) * width`.
pub fn range_key(price: Decimal, width: Decimal) -> Decimal {
    (price / width).floor() * width
}

/// One aggregation bucket, rebuilt every cycle.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    /// Sum of level quantities in the bucket.
    pub total_quantity: Decimal,
    /// Accumulated quantity per exact price, for representative-price
    /// selection.
    pub price_volume: HashMap<Decimal, Decimal>,
}

/// Group one side's levels into buckets.
pub fn bucket_levels(
    levels: impl IntoIterator<Item = (Decimal, Decimal)>,
    width: Decimal,
) -> HashMap<Decimal, Bucket> {
    let mut buckets: HashMap<Decimal, Bucket> = HashMap::new();

    for (price, quantity) in levels {
        let bucket = buckets.entry(range_key(price, width)).or_default();
        bucket.total_quantity += quantity;
        *bucket.price_volume.entry(price).or_insert(Decimal::ZERO) += quantity;
    }

    buckets
}

/// Select the `top_k` buckets by total quantity. Ties break by
/// ascending bucket key so repeated runs rank identically.
pub fn top_buckets(buckets: HashMap<Decimal, Bucket>, top_k: usize) -> Vec<(Decimal, Bucket)> {
    let mut ranked: Vec<(Decimal, Bucket)> = buckets.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.total_quantity
            .cmp(&a.1.total_quantity)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(top_k);
    ranked
}

/// Order ranked buckets for presentation (bids descending by key,
/// asks ascending) and drop the `skip` buckets nearest the touch.
/// A side with `skip` buckets or fewer comes back empty.
pub fn presentation_zones(
    mut ranked: Vec<(Decimal, Bucket)>,
    side: Side,
    skip: usize,
) -> Vec<(Decimal, Bucket)> {
    match side {
        Side::Bid => ranked.sort_by(|a, b| b.0.cmp(&a.0)),
        Side::Ask => ranked.sort_by(|a, b| a.0.cmp(&b.0)),
    }

    if ranked.len() <= skip {
        return Vec::new();
    }

    ranked.drain(..skip);
    ranked
}

/// The exact price carrying the most accumulated quantity in a bucket
/// (volume-weighted mode, not frequency). Ties go to the lower price.
pub fn representative_price(bucket: &Bucket) -> Option<Decimal> {
    bucket
        .price_volume
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(&price, _)| price)
}
