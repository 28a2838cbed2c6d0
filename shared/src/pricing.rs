//! Pricing derivation rules
//!
//! Unit cost and selling price arithmetic shared by purchase intake and sale
//! consumption. All values are fixed-point decimals: two places for money and
//! two places for quantity.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::UnitKind;

/// Markup applied when no explicit selling price was recorded at intake.
const MARKUP: Decimal = Decimal::from_parts(13, 0, 0, false, 1); // 1.3

const FIVE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Round to two decimal places, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round up to the nearest multiple of 5.
///
/// Piece-priced goods are quoted in a currency with no sub-5 denominations
/// in circulation, so derived prices are bumped to the next 5.
pub fn round_up_to_nearest_5(value: Decimal) -> Decimal {
    (value / FIVE).ceil() * FIVE
}

/// Unit cost from a total bill: `round2(bill_price / qty)`.
pub fn unit_cost_from_bill(bill_price: Decimal, qty: Decimal) -> Decimal {
    round2(bill_price / qty)
}

/// Derive a selling price from a unit cost when none was stored at intake.
///
/// `ByWeight` products keep two-decimal precision; `ByCount` products round
/// the marked-up price to the next multiple of 5.
pub fn derive_selling_price(unit_cost: Decimal, kind: UnitKind) -> Decimal {
    match kind {
        UnitKind::ByWeight => round2(unit_cost * MARKUP),
        UnitKind::ByCount => round_up_to_nearest_5(unit_cost * MARKUP),
    }
}

/// Selling price at quote/sale time: the price stored on the batch wins,
/// otherwise it is derived from the unit cost per the unit-kind rule. A batch
/// taken in without an explicit quote stores no selling price at all, so the
/// derivation stays reachable for every such batch.
pub fn quote_selling_price(
    stored: Option<Decimal>,
    unit_cost: Decimal,
    kind: UnitKind,
) -> Decimal {
    stored.unwrap_or_else(|| derive_selling_price(unit_cost, kind))
}

/// Line total for a sale line.
///
/// Weight-denominated lines are settled in cash, so the extended amount is
/// rounded up to the nearest 5; count-denominated lines multiply a selling
/// price that is already a multiple of 5.
pub fn line_total(kind: UnitKind, selling_price: Decimal, qty: Decimal) -> Decimal {
    match kind {
        UnitKind::ByWeight => round_up_to_nearest_5(selling_price * qty),
        UnitKind::ByCount => selling_price * qty,
    }
}

/// Per-line profit: `(selling - unit_cost) * qty`.
pub fn line_profit(selling_price: Decimal, unit_cost: Decimal, qty: Decimal) -> Decimal {
    (selling_price - unit_cost) * qty
}

/// Final sale total.
///
/// An explicit total wins; otherwise the summed line totals are discounted by
/// `discount` percent (0-100) when present.
pub fn sale_total(
    explicit_total: Option<Decimal>,
    line_total_sum: Decimal,
    discount: Option<Decimal>,
) -> Decimal {
    if let Some(total) = explicit_total {
        return total;
    }
    match discount {
        Some(d) if !d.is_zero() => {
            round2(line_total_sum * (Decimal::ONE - d / Decimal::ONE_HUNDRED))
        }
        _ => line_total_sum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn by_weight_markup_keeps_two_decimals() {
        assert_eq!(
            derive_selling_price(dec("100.00"), UnitKind::ByWeight),
            dec("130.00")
        );
        assert_eq!(
            derive_selling_price(dec("10.07"), UnitKind::ByWeight),
            dec("13.09")
        );
    }

    #[test]
    fn by_count_markup_rounds_up_to_5() {
        // ceil(77 * 1.3 / 5) * 5 = ceil(20.02) * 5 = 105
        assert_eq!(
            derive_selling_price(dec("77.00"), UnitKind::ByCount),
            dec("105")
        );
        // Already on a multiple of 5 stays put.
        assert_eq!(
            derive_selling_price(dec("50.00"), UnitKind::ByCount),
            dec("65")
        );
    }

    #[test]
    fn quote_prefers_stored_price_else_derives_by_kind() {
        assert_eq!(
            quote_selling_price(Some(dec("99")), dec("77"), UnitKind::ByCount),
            dec("99")
        );
        // An intake-default batch stores no price, so a ByCount cost of 77
        // reaches the nearest-5 ceiling: 105, never 100.10.
        assert_eq!(
            quote_selling_price(None, dec("77"), UnitKind::ByCount),
            dec("105")
        );
        assert_eq!(
            quote_selling_price(None, dec("100"), UnitKind::ByWeight),
            dec("130.00")
        );
    }

    #[test]
    fn unit_cost_divides_bill_by_qty() {
        assert_eq!(unit_cost_from_bill(dec("100.00"), dec("3")), dec("33.33"));
        assert_eq!(unit_cost_from_bill(dec("250.00"), dec("10")), dec("25.00"));
    }

    #[test]
    fn weight_line_total_rounds_up_to_5() {
        // 13.00 * 3.5 = 45.5 -> 50
        assert_eq!(line_total(UnitKind::ByWeight, dec("13.00"), dec("3.5")), dec("50"));
        assert_eq!(line_total(UnitKind::ByCount, dec("105"), dec("2")), dec("210"));
    }

    #[test]
    fn sale_total_precedence() {
        assert_eq!(
            sale_total(Some(dec("90")), dec("100"), Some(dec("5"))),
            dec("90")
        );
        assert_eq!(sale_total(None, dec("100"), Some(dec("10"))), dec("90.00"));
        assert_eq!(sale_total(None, dec("100"), None), dec("100"));
    }
}
