//! Pure discount arithmetic. No I/O happens here; callers supply catalog data.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::entities::IdSet;

/// How a coupon reduces the applicable total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountKind {
    /// `rate` is a percentage in `0..=100`; `cap` bounds the resulting amount.
    Percentage { rate: Decimal, cap: Option<Decimal> },
    Fixed { amount: Decimal },
}

impl DiscountKind {
    /// Discount granted on `applicable_total`.
    ///
    /// Rounded to cents, never negative and never above `applicable_total`.
    pub fn discount_for(&self, applicable_total: Decimal) -> Decimal {
        if applicable_total <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let raw = match *self {
            DiscountKind::Percentage { rate, cap } => {
                let amount = applicable_total * rate / Decimal::ONE_HUNDRED;
                match cap {
                    Some(cap) => amount.min(cap),
                    None => amount,
                }
            }
            DiscountKind::Fixed { amount } => amount.min(applicable_total),
        };

        round_money(raw).max(Decimal::ZERO).min(applicable_total)
    }
}

/// Rounds to two decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Restriction sets of a coupon; empty sets do not restrict.
#[derive(Debug, Clone, Copy)]
pub struct Applicability<'a> {
    pub products: &'a IdSet,
    pub categories: &'a IdSet,
}

impl<'a> Applicability<'a> {
    pub fn admits(&self, product_id: &Uuid, category_id: &Uuid) -> bool {
        self.products.admits(product_id) && self.categories.admits(category_id)
    }
}

/// A cart line after its price and category were re-read from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub category_id: Uuid,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of line totals for the lines the restrictions admit.
pub fn applicable_total(lines: &[PricedLine], applicability: Applicability<'_>) -> Decimal {
    lines
        .iter()
        .filter(|line| applicability.admits(&line.product_id, &line.category_id))
        .map(PricedLine::line_total)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(category_id: Uuid, unit_price: Decimal, quantity: i32) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            category_id,
            unit_price,
            quantity,
        }
    }

    #[test]
    fn save10_is_capped_at_one_hundred() {
        let kind = DiscountKind::Percentage {
            rate: dec!(10),
            cap: Some(dec!(100)),
        };
        assert_eq!(kind.discount_for(dec!(1200)), dec!(100));
    }

    #[test]
    fn percentage_below_cap_is_not_clamped() {
        let kind = DiscountKind::Percentage {
            rate: dec!(10),
            cap: Some(dec!(100)),
        };
        assert_eq!(kind.discount_for(dec!(600)), dec!(60));
    }

    #[test]
    fn flat50_never_exceeds_the_total() {
        let kind = DiscountKind::Fixed { amount: dec!(50) };
        assert_eq!(kind.discount_for(dec!(30)), dec!(30));
        assert_eq!(kind.discount_for(dec!(80)), dec!(50));
    }

    #[test]
    fn percentage_rounds_half_away_from_zero() {
        let kind = DiscountKind::Percentage {
            rate: dec!(15),
            cap: None,
        };
        // 15% of 0.30 = 0.045
        assert_eq!(kind.discount_for(dec!(0.30)), dec!(0.05));
    }

    #[test]
    fn zero_total_yields_zero() {
        let kind = DiscountKind::Fixed { amount: dec!(50) };
        assert_eq!(kind.discount_for(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn applicable_total_respects_category_restriction() {
        let cakes = Uuid::new_v4();
        let candy = Uuid::new_v4();
        let lines = vec![line(cakes, dec!(250), 2), line(candy, dec!(40), 3)];

        let products = IdSet::default();
        let categories: IdSet = [cakes].into_iter().collect();
        let total = applicable_total(
            &lines,
            Applicability {
                products: &products,
                categories: &categories,
            },
        );
        assert_eq!(total, dec!(500));
    }

    #[test]
    fn product_and_category_restrictions_combine_with_and() {
        let cakes = Uuid::new_v4();
        let eligible = line(cakes, dec!(100), 1);
        let other_cake = line(cakes, dec!(70), 1);

        let products: IdSet = [eligible.product_id].into_iter().collect();
        let categories: IdSet = [cakes].into_iter().collect();
        let total = applicable_total(
            &[eligible, other_cake],
            Applicability {
                products: &products,
                categories: &categories,
            },
        );
        assert_eq!(total, dec!(100));
    }
}
