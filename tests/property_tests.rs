//! Property-based tests for discount arithmetic.
//!
//! Amounts are generated in whole cents so every input is a valid money value.

use proptest::prelude::*;
use rust_decimal::Decimal;
use sweetshop_api::{
    entities::IdSet,
    services::discounts::{applicable_total, round_money, Applicability, DiscountKind, PricedLine},
};
use uuid::Uuid;

fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|basis_points| Decimal::new(basis_points, 2))
}

fn lines_strategy() -> impl Strategy<Value = Vec<PricedLine>> {
    prop::collection::vec(
        (money_strategy(), 1i32..20, any::<bool>()),
        1..12,
    )
    .prop_map(|raw| {
        let cakes = Uuid::from_u128(1);
        let sweets = Uuid::from_u128(2);
        raw.into_iter()
            .map(|(unit_price, quantity, is_cake)| PricedLine {
                product_id: Uuid::new_v4(),
                category_id: if is_cake { cakes } else { sweets },
                unit_price,
                quantity,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn fixed_discount_is_bounded_by_total(amount in money_strategy(), total in money_strategy()) {
        let discount = DiscountKind::Fixed { amount }.discount_for(total);
        prop_assert!(discount >= Decimal::ZERO);
        prop_assert!(discount <= total);
        prop_assert!(discount <= amount);
    }

    #[test]
    fn percentage_discount_respects_cap(
        rate in rate_strategy(),
        cap in prop::option::of(money_strategy()),
        total in money_strategy(),
    ) {
        let discount = DiscountKind::Percentage { rate, cap }.discount_for(total);
        prop_assert!(discount >= Decimal::ZERO);
        prop_assert!(discount <= total);
        if let Some(cap) = cap {
            prop_assert!(discount <= cap);
        }
        prop_assert_eq!(discount, round_money(discount));
    }

    #[test]
    fn applicable_total_ignores_line_order(lines in lines_strategy()) {
        let categories: IdSet = [Uuid::from_u128(1)].into_iter().collect();
        let products = IdSet::default();
        let applicability = Applicability { products: &products, categories: &categories };

        let forward = applicable_total(&lines, applicability);
        let mut reversed = lines.clone();
        reversed.reverse();
        prop_assert_eq!(forward, applicable_total(&reversed, applicability));

        let everything = applicable_total(
            &lines,
            Applicability { products: &products, categories: &IdSet::default() },
        );
        prop_assert!(forward <= everything);
    }
}
