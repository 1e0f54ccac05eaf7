mod common;

use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use sweetshop_api::{
    entities::order,
    services::{
        coupons::CartLine,
        settlement::{CustomerInfo, PlaceOrderInput},
    },
};
use uuid::Uuid;

use common::{CouponSeed, TestApp};

#[tokio::test]
async fn single_use_coupon_is_redeemed_once_under_contention() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(200), Uuid::new_v4()).await;
    let coupon = app
        .seed_coupon(CouponSeed {
            code: "ONCE",
            usage_limit: Some(1),
            ..Default::default()
        })
        .await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let settlement = app.services().settlement.clone();
        let input = PlaceOrderInput {
            customer: CustomerInfo {
                user_id: Some(Uuid::new_v4()),
                phone: "555-0100".into(),
                address: "1 Sugar Lane".into(),
                ..Default::default()
            },
            items: vec![CartLine {
                product_id: product.id,
                quantity: 1,
                unit_price: None,
            }],
            coupon_id: Some(coupon.id),
        };
        tasks.push(tokio::spawn(async move { settlement.place_order(input).await }));
    }

    let mut discounted = 0;
    for task in tasks {
        let details = task.await.expect("task joined").expect("order placed");
        if details.order.coupon_id.is_some() {
            assert_eq!(details.order.discount_amount, dec!(20));
            discounted += 1;
        } else {
            assert_eq!(details.order.discount_amount, dec!(0));
            assert_eq!(details.order.total, dec!(200));
        }
    }

    assert_eq!(discounted, 1);
    assert_eq!(app.reload_coupon(coupon.id).await.used_count, 1);
    let with_coupon = order::Entity::find()
        .filter(order::Column::CouponId.eq(coupon.id))
        .count(app.db())
        .await
        .unwrap();
    assert_eq!(with_coupon, 1);
}
