//! FIFO batch allocation planning
//!
//! Given the live batches for an inventory key in intake order, plan how a
//! requested sale quantity is split across them. The plan is computed up
//! front so a shortfall rejects the whole request before anything is written.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A live batch as seen by the allocator: identity plus remaining quantity.
/// The caller supplies these ordered oldest intake first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLot {
    pub batch_id: i32,
    pub remaining_qty: Decimal,
}

/// One slice of an allocation plan: take `qty` from `batch_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub batch_id: i32,
    pub qty: Decimal,
}

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("requested quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient {
        requested: Decimal,
        available: Decimal,
    },
}

/// Plan a FIFO allocation of `requested` units across `batches`.
///
/// Batches must be ordered oldest-first; each contributes
/// `min(remaining, still_needed)` until the request is covered. If the total
/// available across all batches is short, no plan is produced and the caller
/// must fail its whole operation.
pub fn plan_fifo(batches: &[BatchLot], requested: Decimal) -> Result<Vec<Allocation>, AllocationError> {
    if requested <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveQuantity(requested));
    }

    let available: Decimal = batches.iter().map(|b| b.remaining_qty).sum();
    if available < requested {
        return Err(AllocationError::Insufficient {
            requested,
            available,
        });
    }

    let mut plan = Vec::new();
    let mut still_needed = requested;
    for batch in batches {
        if still_needed <= Decimal::ZERO {
            break;
        }
        if batch.remaining_qty <= Decimal::ZERO {
            continue;
        }
        let take = batch.remaining_qty.min(still_needed);
        plan.push(Allocation {
            batch_id: batch.batch_id,
            qty: take,
        });
        still_needed -= take;
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lot(id: i32, remaining: &str) -> BatchLot {
        BatchLot {
            batch_id: id,
            remaining_qty: dec(remaining),
        }
    }

    #[test]
    fn consumes_oldest_batch_first() {
        let batches = vec![lot(1, "5"), lot(2, "10")];
        let plan = plan_fifo(&batches, dec("8")).unwrap();
        assert_eq!(
            plan,
            vec![
                Allocation { batch_id: 1, qty: dec("5") },
                Allocation { batch_id: 2, qty: dec("3") },
            ]
        );
    }

    #[test]
    fn shortfall_rejects_the_whole_request() {
        let batches = vec![lot(1, "5"), lot(2, "7")];
        let err = plan_fifo(&batches, dec("20")).unwrap_err();
        assert_eq!(
            err,
            AllocationError::Insufficient {
                requested: dec("20"),
                available: dec("12"),
            }
        );
    }

    #[test]
    fn exhausted_batches_are_skipped() {
        let batches = vec![lot(1, "0"), lot(2, "4")];
        let plan = plan_fifo(&batches, dec("4")).unwrap();
        assert_eq!(plan, vec![Allocation { batch_id: 2, qty: dec("4") }]);
    }

    #[test]
    fn non_positive_request_is_rejected() {
        let batches = vec![lot(1, "5")];
        assert!(matches!(
            plan_fifo(&batches, dec("0")),
            Err(AllocationError::NonPositiveQuantity(_))
        ));
    }

    #[test]
    fn fractional_quantities_allocate_exactly() {
        let batches = vec![lot(1, "2.25"), lot(2, "3.00")];
        let plan = plan_fifo(&batches, dec("2.75")).unwrap();
        assert_eq!(
            plan,
            vec![
                Allocation { batch_id: 1, qty: dec("2.25") },
                Allocation { batch_id: 2, qty: dec("0.50") },
            ]
        );
    }
}
