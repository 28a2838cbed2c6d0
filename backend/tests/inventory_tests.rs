//! Inventory aggregate tests
//!
//! Tests for the rebuild computation that derives quantity-on-hand from the
//! batch ledger:
//! - Recomputation sums remaining quantity per (product, vendor, brand) key
//! - NULL and empty brand fall in the same bucket
//! - Rebuilding is idempotent: a second pass changes nothing
//! - Consumption shifts the aggregate by exactly the consumed quantity

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use shared::{plan_fifo, BatchLot, Brand};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// One ledger batch as the rebuild sees it.
#[derive(Debug, Clone)]
struct LedgerRow {
    product_id: i32,
    vendor_id: i32,
    brand: Option<String>,
    qty: Decimal,
    remaining_qty: Decimal,
}

type AggregateKey = (i32, i32, Option<Brand>);

/// Recompute every aggregate key from the ledger: group by the
/// brand-normalized key and sum remaining quantity.
fn rebuild(rows: &[LedgerRow]) -> HashMap<AggregateKey, Decimal> {
    let mut aggregates: HashMap<AggregateKey, Decimal> = HashMap::new();
    for row in rows {
        let key = (
            row.product_id,
            row.vendor_id,
            Brand::normalize(row.brand.as_deref()),
        );
        *aggregates.entry(key).or_insert(Decimal::ZERO) += row.remaining_qty;
    }
    aggregates
}

/// Upsert the computed sums into an aggregate table, overwriting whatever a
/// key held before.
fn apply(table: &mut HashMap<AggregateKey, Decimal>, computed: &HashMap<AggregateKey, Decimal>) {
    for (key, qty) in computed {
        table.insert(key.clone(), *qty);
    }
}

fn row(
    product_id: i32,
    vendor_id: i32,
    brand: Option<&str>,
    qty: &str,
    remaining: &str,
) -> LedgerRow {
    LedgerRow {
        product_id,
        vendor_id,
        brand: brand.map(str::to_string),
        qty: dec(qty),
        remaining_qty: dec(remaining),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The aggregate is the sum of remaining quantity per key
    #[test]
    fn test_rebuild_sums_remaining_per_key() {
        let rows = vec![
            row(1, 1, Some("Astra"), "10", "10"),
            row(1, 1, Some("Astra"), "5", "3"),
            row(2, 1, None, "8", "8"),
        ];
        let aggregates = rebuild(&rows);

        let astra = (1, 1, Brand::normalize(Some("Astra")));
        assert_eq!(aggregates[&astra], dec("13"));
        assert_eq!(aggregates[&(2, 1, None)], dec("8"));
        assert_eq!(aggregates.len(), 2);
    }

    /// Summing remaining, not original, quantity: sold stock stays sold
    #[test]
    fn test_rebuild_does_not_resurrect_sold_stock() {
        let rows = vec![row(1, 1, None, "10", "4")];
        let aggregates = rebuild(&rows);

        assert_eq!(aggregates[&(1, 1, None)], dec("4"));
        assert_ne!(aggregates[&(1, 1, None)], rows[0].qty);
    }

    /// NULL, empty, and whitespace brand are one bucket
    #[test]
    fn test_rebuild_brand_bucketing() {
        let rows = vec![
            row(1, 1, None, "2", "2"),
            row(1, 1, Some(""), "3", "3"),
            row(1, 1, Some("   "), "4", "4"),
        ];
        let aggregates = rebuild(&rows);

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[&(1, 1, None)], dec("9"));
    }

    /// Running the rebuild twice over the same ledger leaves the aggregate
    /// table exactly where the first run put it
    #[test]
    fn test_rebuild_is_idempotent() {
        let rows = vec![
            row(1, 1, Some("Astra"), "10", "7"),
            row(1, 2, None, "5", "5"),
            row(3, 1, Some("Mila"), "6", "0"),
        ];

        // Stale entry that a rebuild overwrites.
        let mut table = HashMap::new();
        table.insert((1, 1, Brand::normalize(Some("Astra"))), dec("999"));

        apply(&mut table, &rebuild(&rows));
        let after_first = table.clone();
        apply(&mut table, &rebuild(&rows));

        assert_eq!(table, after_first);
        assert_eq!(table[&(1, 1, Brand::normalize(Some("Astra")))], dec("7"));
        assert_eq!(table[&(3, 1, Brand::normalize(Some("Mila")))], dec("0"));
    }

    /// Consuming through a FIFO plan moves the aggregate down by exactly the
    /// consumed quantity
    #[test]
    fn test_rebuild_tracks_consumption() {
        let mut rows = vec![
            row(1, 1, None, "5", "5"),
            row(1, 1, None, "10", "10"),
        ];
        let before = rebuild(&rows)[&(1, 1, None)];

        let lots: Vec<BatchLot> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| BatchLot {
                batch_id: i as i32,
                remaining_qty: r.remaining_qty,
            })
            .collect();
        for allocation in plan_fifo(&lots, dec("8")).unwrap() {
            rows[allocation.batch_id as usize].remaining_qty -= allocation.qty;
        }

        let after = rebuild(&rows)[&(1, 1, None)];
        assert_eq!(after, before - dec("8"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating ledger rows with colliding keys
    fn rows_strategy() -> impl Strategy<Value = Vec<LedgerRow>> {
        prop::collection::vec(
            (
                1i32..=3,
                1i32..=2,
                prop_oneof![
                    Just(None),
                    Just(Some("".to_string())),
                    Just(Some("Astra".to_string())),
                    Just(Some("Mila".to_string())),
                ],
                1i64..=10000i64,
                0i64..=10000i64,
            )
                .prop_map(|(product_id, vendor_id, brand, qty, remaining)| {
                    let qty = Decimal::new(qty, 2);
                    LedgerRow {
                        product_id,
                        vendor_id,
                        brand,
                        qty,
                        remaining_qty: Decimal::new(remaining, 2).min(qty),
                    }
                }),
            1..20,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Applying the rebuild to the same ledger twice is a no-op
        #[test]
        fn prop_rebuild_idempotent(rows in rows_strategy()) {
            let mut table = HashMap::new();
            apply(&mut table, &rebuild(&rows));
            let after_first = table.clone();
            apply(&mut table, &rebuild(&rows));

            prop_assert_eq!(table, after_first);
        }

        /// Every aggregate value is the remaining-quantity sum over exactly
        /// the rows sharing its normalized key
        #[test]
        fn prop_rebuild_values_match_ledger(rows in rows_strategy()) {
            let aggregates = rebuild(&rows);

            let total_remaining: Decimal = rows.iter().map(|r| r.remaining_qty).sum();
            let total_aggregated: Decimal = aggregates.values().copied().sum();
            prop_assert_eq!(total_aggregated, total_remaining);

            for (key, qty) in &aggregates {
                let expected: Decimal = rows
                    .iter()
                    .filter(|r| {
                        r.product_id == key.0
                            && r.vendor_id == key.1
                            && Brand::normalize(r.brand.as_deref()) == key.2
                    })
                    .map(|r| r.remaining_qty)
                    .sum();
                prop_assert_eq!(*qty, expected);
                prop_assert!(*qty >= Decimal::ZERO);
            }
        }
    }
}
