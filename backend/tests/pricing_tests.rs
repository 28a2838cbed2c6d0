//! Pricing derivation tests
//!
//! Tests for unit cost, markup, rounding, line totals, and sale totals:
//! - Weight-priced goods keep two-decimal precision
//! - Piece-priced goods round up to the next multiple of 5
//! - Explicit totals and discounts compose correctly

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    derive_selling_price, line_profit, line_total, quote_selling_price, round2,
    round_up_to_nearest_5, sale_total, unit_cost_from_bill, UnitKind,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Half-up rounding at two places
    #[test]
    fn test_round2_midpoint() {
        assert_eq!(round2(dec("1.005")), dec("1.01"));
        assert_eq!(round2(dec("1.004")), dec("1.00"));
        assert_eq!(round2(dec("33.333")), dec("33.33"));
    }

    /// Ceiling to the next multiple of 5
    #[test]
    fn test_round_up_to_nearest_5() {
        assert_eq!(round_up_to_nearest_5(dec("100.1")), dec("105"));
        assert_eq!(round_up_to_nearest_5(dec("100")), dec("100"));
        assert_eq!(round_up_to_nearest_5(dec("1")), dec("5"));
        assert_eq!(round_up_to_nearest_5(dec("0")), dec("0"));
    }

    /// Unit cost is the bill divided by quantity, rounded to two places
    #[test]
    fn test_unit_cost_from_bill() {
        assert_eq!(unit_cost_from_bill(dec("100"), dec("3")), dec("33.33"));
        assert_eq!(unit_cost_from_bill(dec("200"), dec("3")), dec("66.67"));
        assert_eq!(unit_cost_from_bill(dec("250"), dec("10")), dec("25.00"));
    }

    /// Weight-priced markup: cost 100 sells at 130
    #[test]
    fn test_by_weight_markup() {
        assert_eq!(
            derive_selling_price(dec("100"), UnitKind::ByWeight),
            dec("130.0")
        );
        assert_eq!(
            derive_selling_price(dec("33.33"), UnitKind::ByWeight),
            dec("43.33")
        );
    }

    /// Piece-priced markup: cost 77 marks up to 100.1 and bumps to 105
    #[test]
    fn test_by_count_markup() {
        assert_eq!(
            derive_selling_price(dec("77"), UnitKind::ByCount),
            dec("105")
        );
        assert_eq!(
            derive_selling_price(dec("100"), UnitKind::ByCount),
            dec("130")
        );
    }

    /// A batch taken in without an explicit quote stores no selling price,
    /// so a piece-priced cost of 77 quotes at the 105 ceiling, never at the
    /// plain two-decimal markup 100.10
    #[test]
    fn test_intake_default_reaches_count_ceiling() {
        let quoted = quote_selling_price(None, dec("77.00"), UnitKind::ByCount);
        assert_eq!(quoted, dec("105"));
        assert_ne!(quoted, dec("100.10"));

        // An explicitly quoted price still wins over the derivation.
        assert_eq!(
            quote_selling_price(Some(dec("95")), dec("77.00"), UnitKind::ByCount),
            dec("95")
        );
    }

    /// Weight line totals settle in cash, bumped to the next 5
    #[test]
    fn test_line_total_by_weight() {
        // 43.33 * 2.5 = 108.325 -> 110
        assert_eq!(
            line_total(UnitKind::ByWeight, dec("43.33"), dec("2.5")),
            dec("110")
        );
    }

    /// Count line totals multiply a price already on a 5 boundary
    #[test]
    fn test_line_total_by_count() {
        assert_eq!(
            line_total(UnitKind::ByCount, dec("105"), dec("3")),
            dec("315")
        );
    }

    /// Profit is per-unit margin times quantity
    #[test]
    fn test_line_profit() {
        assert_eq!(line_profit(dec("130"), dec("100"), dec("2")), dec("60"));
        assert_eq!(line_profit(dec("105"), dec("77"), dec("1")), dec("28"));
    }

    /// An explicit sale total wins over computed lines and discount
    #[test]
    fn test_sale_total_explicit_wins() {
        assert_eq!(
            sale_total(Some(dec("500")), dec("620"), Some(dec("10"))),
            dec("500")
        );
    }

    /// Discount is a percentage of the summed line totals
    #[test]
    fn test_sale_total_discount() {
        assert_eq!(sale_total(None, dec("200"), Some(dec("25"))), dec("150.00"));
        assert_eq!(sale_total(None, dec("200"), Some(dec("0"))), dec("200"));
        assert_eq!(sale_total(None, dec("200"), None), dec("200"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating unit costs (0.01 to 1000.00)
    fn cost_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Strategy for generating quantities (0.01 to 100.00)
    fn qty_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Strategy for generating discount percentages (0 to 100)
    fn discount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// round2 output always has at most two decimal places
        #[test]
        fn prop_round2_scale(cost in cost_strategy(), qty in qty_strategy()) {
            let rounded = round2(cost / qty.max(Decimal::ONE));
            prop_assert!(rounded.scale() <= 2);
        }

        /// Piece-price derivation always lands on a multiple of 5 at or above
        /// the marked-up cost
        #[test]
        fn prop_by_count_price_on_5_boundary(cost in cost_strategy()) {
            let price = derive_selling_price(cost, UnitKind::ByCount);
            let raw = cost * dec("1.3");

            prop_assert!(price >= raw);
            prop_assert!(price - raw < dec("5"));
            prop_assert_eq!(price % dec("5"), Decimal::ZERO);
        }

        /// Weight-price derivation stays within a rounding step of the markup
        #[test]
        fn prop_by_weight_price_tracks_markup(cost in cost_strategy()) {
            let price = derive_selling_price(cost, UnitKind::ByWeight);
            let raw = cost * dec("1.3");

            prop_assert!((price - raw).abs() <= dec("0.005"));
            prop_assert!(price.scale() <= 2);
        }

        /// Selling above cost always yields positive profit
        #[test]
        fn prop_markup_profit_positive(cost in cost_strategy(), qty in qty_strategy()) {
            let selling = derive_selling_price(cost, UnitKind::ByWeight);
            prop_assert!(line_profit(selling, cost, qty) > Decimal::ZERO);
        }

        /// A discounted total never exceeds the undiscounted sum and a full
        /// discount zeroes it
        #[test]
        fn prop_discount_bounds(
            sum in cost_strategy(),
            discount in discount_strategy()
        ) {
            let total = sale_total(None, sum, Some(discount));
            prop_assert!(total <= sum);
            prop_assert!(total >= Decimal::ZERO);

            let full = sale_total(None, sum, Some(dec("100")));
            prop_assert_eq!(full, dec("0.00"));
        }

        /// Weight line totals are multiples of 5 and never undercharge
        #[test]
        fn prop_weight_line_total_ceiling(
            price in cost_strategy(),
            qty in qty_strategy()
        ) {
            let total = line_total(UnitKind::ByWeight, price, qty);
            let raw = price * qty;

            prop_assert!(total >= raw);
            prop_assert!(total - raw < dec("5"));
            prop_assert_eq!(total % dec("5"), Decimal::ZERO);
        }
    }
}
