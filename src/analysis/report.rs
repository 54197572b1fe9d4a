//! Zone report construction and formatting.

use rust_decimal::Decimal;

use crate::book::types::{OrderBook, PersistedBook, Side};

use super::buckets::{
    bucket_levels, presentation_zones, representative_price, top_buckets, Bucket,
};

/// One reportable zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Bucket start (`floor(price / width) * width`).
    pub range_key: Decimal,
    /// Exact price carrying the most volume in the bucket.
    pub representative_price: Decimal,
    /// Total quantity across the bucket.
    pub total_quantity: Decimal,
}

/// Ranked, trimmed zones for one symbol, one per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneReport {
    /// Symbol the report covers.
    pub symbol: String,
    /// Bid-side zones, touch-distant ordering (price descending).
    pub long_zones: Vec<Zone>,
    /// Ask-side zones, price ascending.
    pub short_zones: Vec<Zone>,
}

impl ZoneReport {
    /// Render the two-section text block.
    pub fn render(&self) -> String {
        let mut out = format!("===== {} =====\n", self.symbol);

        out.push_str("Long Zones:\n");
        for zone in &self.long_zones {
            out.push_str(&format!(
                "Shock: {:.6} | Volume: {}\n",
                zone.representative_price,
                format_volume(zone.total_quantity)
            ));
        }

        out.push_str("\nShort Zones:\n");
        for zone in &self.short_zones {
            out.push_str(&format!(
                "Shock: {:.6} | Volume: {}\n",
                zone.representative_price,
                format_volume(zone.total_quantity)
            ));
        }

        out
    }
}

/// Build a symbol's report from its persisted book.
pub fn build_report(
    symbol: &str,
    persisted: &PersistedBook,
    width: Decimal,
    top_k: usize,
    near_touch_skip: usize,
) -> ZoneReport {
    let book = OrderBook::from_persisted(persisted);

    let bid_buckets = bucket_levels(
        book.side(Side::Bid).iter().map(|(&p, &q)| (p, q)),
        width,
    );
    let ask_buckets = bucket_levels(
        book.side(Side::Ask).iter().map(|(&p, &q)| (p, q)),
        width,
    );

    let long = presentation_zones(top_buckets(bid_buckets, top_k), Side::Bid, near_touch_skip);
    let short = presentation_zones(top_buckets(ask_buckets, top_k), Side::Ask, near_touch_skip);

    ZoneReport {
        symbol: symbol.to_string(),
        long_zones: zones_from(long),
        short_zones: zones_from(short),
    }
}

/// Convert presentation buckets to zones, keeping order.
fn zones_from(buckets: Vec<(Decimal, Bucket)>) -> Vec<Zone> {
    buckets
        .into_iter()
        .filter_map(|(range_key, bucket)| {
            representative_price(&bucket).map(|price| Zone {
                range_key,
                representative_price: price,
                total_quantity: bucket.total_quantity,
            })
        })
        .collect()
}

/// Format a volume the way the report expects: `x.xb` / `x.xm` /
/// `x.xk` past the thresholds, otherwise a two-decimal plain number.
pub fn format_volume(volume: Decimal) -> String {
    let billion = Decimal::new(1_000_000_000, 0);
    let million = Decimal::new(1_000_000, 0);
    let thousand = Decimal::new(1_000, 0);

    if volume >= billion {
        format!("{:.1}b", volume / billion)
    } else if volume >= million {
        format!("{:.1}m", volume / million)
    } else if volume >= thousand {
        format!("{:.1}k", volume / thousand)
    } else {
        format!("{:.2}", volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn persisted(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> PersistedBook {
        PersistedBook {
            bids: bids
                .iter()
                .map(|(p, q)| (p.to_string(), q.to_string()))
                .collect::<BTreeMap<_, _>>(),
            asks: asks
                .iter()
                .map(|(p, q)| (p.to_string(), q.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn format_volume_thresholds() {
        assert_eq!(format_volume(dec!(2500000000)), "2.5b");
        assert_eq!(format_volume(dec!(1500000)), "1.5m");
        assert_eq!(format_volume(dec!(12500)), "12.5k");
        assert_eq!(format_volume(dec!(999)), "999.00");
        assert_eq!(format_volume(dec!(0.5)), "0.50");
    }

    #[test]
    fn format_volume_at_exact_thresholds() {
        assert_eq!(format_volume(dec!(1000)), "1.0k");
        assert_eq!(format_volume(dec!(1000000)), "1.0m");
        assert_eq!(format_volume(dec!(1000000000)), "1.0b");
    }

    #[test]
    fn report_drops_near_touch_buckets_per_side() {
        // Six one-bucket bid levels; top-6 then skip-2 leaves four,
        // price descending, with the two highest (nearest the touch)
        // gone.
        let book = persisted(
            &[
                ("1.5", "10"),
                ("2.5", "20"),
                ("3.5", "30"),
                ("4.5", "40"),
                ("5.5", "50"),
                ("6.5", "60"),
            ],
            &[],
        );

        let report = build_report("DOGEUSDT", &book, dec!(1), 6, 2);

        let keys: Vec<Decimal> = report.long_zones.iter().map(|z| z.range_key).collect();
        assert_eq!(keys, vec![dec!(4), dec!(3), dec!(2), dec!(1)]);
        assert!(report.short_zones.is_empty());
    }

    #[test]
    fn report_ranks_by_volume_before_presentation() {
        // Seven buckets; the thinnest one must not survive top-6.
        let book = persisted(
            &[],
            &[
                ("1.5", "100"),
                ("2.5", "90"),
                ("3.5", "80"),
                ("4.5", "70"),
                ("5.5", "60"),
                ("6.5", "50"),
                ("7.5", "1"),
            ],
        );

        let report = build_report("DOGEUSDT", &book, dec!(1), 6, 2);

        // Ask presentation is ascending; 1.5 and 2.5 are nearest the
        // touch and get skipped; 7.5 lost the ranking cut.
        let keys: Vec<Decimal> = report.short_zones.iter().map(|z| z.range_key).collect();
        assert_eq!(keys, vec![dec!(3), dec!(4), dec!(5), dec!(6)]);
    }

    #[test]
    fn report_uses_volume_weighted_representative_price() {
        let book = persisted(
            &[
                ("100.00", "5"),
                ("100.05", "3"),
                ("100.25", "2"),
                ("100.35", "4"),
                ("90.00", "50"),
                ("80.00", "60"),
                ("70.00", "70"),
            ],
            &[],
        );

        let report = build_report("TESTUSDT", &book, dec!(0.1), 6, 2);

        // 100.3 and 100.2 are nearest the touch and get skipped; the
        // 100.0 bucket survives and represents itself by the 100.00
        // level, which carries most of its volume.
        let zone = report
            .long_zones
            .iter()
            .find(|z| z.range_key == dec!(100.0))
            .expect("bucket reported");
        assert_eq!(zone.representative_price, dec!(100.00));
        assert_eq!(zone.total_quantity, dec!(8));
    }

    #[test]
    fn render_emits_both_sections() {
        let report = ZoneReport {
            symbol: "DOGEUSDT".to_string(),
            long_zones: vec![Zone {
                range_key: dec!(0.123),
                representative_price: dec!(0.12345),
                total_quantity: dec!(1500000),
            }],
            short_zones: Vec::new(),
        };

        let text = report.render();
        assert_eq!(
            text,
            "===== DOGEUSDT =====\n\
             Long Zones:\n\
             Shock: 0.123450 | Volume: 1.5m\n\
             \n\
             Short Zones:\n"
        );
    }

    #[test]
    fn empty_book_renders_empty_sections() {
        let report = build_report("DOGEUSDT", &PersistedBook::default(), dec!(0.001), 6, 2);
        assert!(report.long_zones.is_empty());
        assert!(report.short_zones.is_empty());

        let text = report.render();
        assert!(text.contains("Long Zones:"));
        assert!(text.contains("Short Zones:"));
    }
}
