//! Batch allocation tests
//!
//! Tests for FIFO consumption planning:
//! - Oldest batches are drained first
//! - Allocated quantities sum to the requested quantity
//! - Shortfalls are rejected with the available total

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{plan_fifo, Allocation, AllocationError, BatchLot};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn lot(batch_id: i32, remaining: &str) -> BatchLot {
    BatchLot {
        batch_id,
        remaining_qty: dec(remaining),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Consuming across two batches drains the older one completely first
    #[test]
    fn test_fifo_spans_batches() {
        let lots = vec![lot(1, "5"), lot(2, "10")];
        let plan = plan_fifo(&lots, dec("8")).unwrap();

        assert_eq!(
            plan,
            vec![
                Allocation {
                    batch_id: 1,
                    qty: dec("5"),
                },
                Allocation {
                    batch_id: 2,
                    qty: dec("3"),
                },
            ]
        );
    }

    /// A request smaller than the first batch touches only that batch
    #[test]
    fn test_single_batch_partial() {
        let lots = vec![lot(1, "5"), lot(2, "10")];
        let plan = plan_fifo(&lots, dec("3")).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_id, 1);
        assert_eq!(plan[0].qty, dec("3"));
    }

    /// Exhausted batches contribute nothing to the plan
    #[test]
    fn test_skips_exhausted_batches() {
        let lots = vec![lot(1, "0"), lot(2, "4"), lot(3, "4")];
        let plan = plan_fifo(&lots, dec("6")).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].batch_id, 2);
        assert_eq!(plan[0].qty, dec("4"));
        assert_eq!(plan[1].batch_id, 3);
        assert_eq!(plan[1].qty, dec("2"));
    }

    /// Fractional quantities allocate exactly
    #[test]
    fn test_fractional_quantities() {
        let lots = vec![lot(1, "2.5"), lot(2, "2.5")];
        let plan = plan_fifo(&lots, dec("3.75")).unwrap();

        assert_eq!(plan[0].qty, dec("2.5"));
        assert_eq!(plan[1].qty, dec("1.25"));
    }

    /// Requesting more than the total remaining fails with the available sum
    #[test]
    fn test_insufficient_stock() {
        let lots = vec![lot(1, "5"), lot(2, "10")];
        let err = plan_fifo(&lots, dec("20")).unwrap_err();

        match err {
            AllocationError::Insufficient {
                requested,
                available,
            } => {
                assert_eq!(requested, dec("20"));
                assert_eq!(available, dec("15"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// No live batches at all is still a shortfall, not a panic
    #[test]
    fn test_no_batches() {
        let err = plan_fifo(&[], dec("1")).unwrap_err();

        match err {
            AllocationError::Insufficient { available, .. } => {
                assert_eq!(available, Decimal::ZERO);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Zero and negative quantities are rejected up front
    #[test]
    fn test_non_positive_quantity() {
        let lots = vec![lot(1, "5")];

        assert!(matches!(
            plan_fifo(&lots, Decimal::ZERO),
            Err(AllocationError::NonPositiveQuantity(_))
        ));
        assert!(matches!(
            plan_fifo(&lots, dec("-1")),
            Err(AllocationError::NonPositiveQuantity(_))
        ));
    }

    /// Exact drain of every batch produces a full plan
    #[test]
    fn test_exact_drain() {
        let lots = vec![lot(1, "5"), lot(2, "10")];
        let plan = plan_fifo(&lots, dec("15")).unwrap();

        let total: Decimal = plan.iter().map(|a| a.qty).sum();
        assert_eq!(total, dec("15"));
        assert_eq!(plan.len(), 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating batch remaining quantities (may include zero)
    fn remaining_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10000i64).prop_map(|n| Decimal::new(n, 2)) // 0.00 to 100.00
    }

    /// Strategy for generating a list of batches with sequential ids
    fn lots_strategy() -> impl Strategy<Value = Vec<BatchLot>> {
        prop::collection::vec(remaining_strategy(), 1..12).prop_map(|quantities| {
            quantities
                .into_iter()
                .enumerate()
                .map(|(i, remaining_qty)| BatchLot {
                    batch_id: i as i32 + 1,
                    remaining_qty,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Allocated quantities always sum to exactly the requested quantity
        #[test]
        fn prop_allocation_conserves_quantity(
            lots in lots_strategy(),
            numerator in 1i64..=10000i64
        ) {
            let qty = Decimal::new(numerator, 2);
            let available: Decimal = lots.iter().map(|l| l.remaining_qty).sum();

            match plan_fifo(&lots, qty) {
                Ok(plan) => {
                    let allocated: Decimal = plan.iter().map(|a| a.qty).sum();
                    prop_assert_eq!(allocated, qty);
                }
                Err(AllocationError::Insufficient { requested, available: reported }) => {
                    prop_assert_eq!(requested, qty);
                    prop_assert_eq!(reported, available);
                    prop_assert!(qty > available);
                }
                Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
            }
        }

        /// No allocation ever exceeds its batch's remaining quantity
        #[test]
        fn prop_allocation_within_batch_bounds(
            lots in lots_strategy(),
            numerator in 1i64..=10000i64
        ) {
            let qty = Decimal::new(numerator, 2);

            if let Ok(plan) = plan_fifo(&lots, qty) {
                for alloc in &plan {
                    let source = lots.iter().find(|l| l.batch_id == alloc.batch_id).unwrap();
                    prop_assert!(alloc.qty > Decimal::ZERO);
                    prop_assert!(alloc.qty <= source.remaining_qty);
                }
            }
        }

        /// Allocations appear in the same order as their source batches
        #[test]
        fn prop_allocation_preserves_order(
            lots in lots_strategy(),
            numerator in 1i64..=10000i64
        ) {
            let qty = Decimal::new(numerator, 2);

            if let Ok(plan) = plan_fifo(&lots, qty) {
                let positions: Vec<usize> = plan
                    .iter()
                    .map(|a| lots.iter().position(|l| l.batch_id == a.batch_id).unwrap())
                    .collect();
                for window in positions.windows(2) {
                    prop_assert!(window[0] < window[1]);
                }
            }
        }

        /// Every batch before the last one touched is fully drained
        #[test]
        fn prop_earlier_batches_fully_drained(
            lots in lots_strategy(),
            numerator in 1i64..=10000i64
        ) {
            let qty = Decimal::new(numerator, 2);

            if let Ok(plan) = plan_fifo(&lots, qty) {
                for alloc in plan.iter().rev().skip(1) {
                    let source = lots.iter().find(|l| l.batch_id == alloc.batch_id).unwrap();
                    prop_assert_eq!(alloc.qty, source.remaining_qty);
                }
            }
        }
    }
}
