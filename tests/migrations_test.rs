mod common;

use rust_decimal_macros::dec;
use sea_orm_migration::MigratorTrait;
use sweetshop_api::{
    db,
    handlers::AppServices,
    services::{
        coupons::CartLine,
        settlement::{CustomerInfo, PlaceOrderInput},
    },
    AppState,
};
use std::sync::Arc;
use uuid::Uuid;

use common::TestApp;

fn file_config(path: &std::path::Path) -> sweetshop_api::config::AppConfig {
    let mut cfg = common::test_config();
    cfg.database_url = format!("sqlite://{}?mode=rwc", path.display());
    cfg
}

#[tokio::test]
async fn migrations_can_be_applied_twice() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = file_config(&dir.path().join("sweetshop.db"));

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .expect("connect");
    db::run_migrations(&pool).await.expect("first run");
    db::run_migrations(&pool).await.expect("second run is a no-op");

    let pending = migrations::Migrator::get_pending_migrations(&pool)
        .await
        .expect("pending migrations");
    assert!(pending.is_empty());
}

#[tokio::test]
async fn order_sequence_survives_reconnect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = file_config(&dir.path().join("sweetshop.db"));
    let customer = CustomerInfo {
        name: Some("Kiran".into()),
        phone: "555-0103".into(),
        address: "4 Cardamom Court".into(),
        ..Default::default()
    };

    let product_id = {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect");
        db::run_migrations(&pool).await.expect("migrate");
        let app = TestApp::from_state(Arc::new(AppState::new(Arc::new(pool), cfg.clone())));
        let product = app.seed_product(dec!(40), Uuid::new_v4()).await;

        let first = app
            .services()
            .settlement
            .place_order(PlaceOrderInput {
                customer: customer.clone(),
                items: vec![CartLine {
                    product_id: product.id,
                    quantity: 1,
                    unit_price: None,
                }],
                coupon_id: None,
            })
            .await
            .expect("first order");
        assert_eq!(first.order.order_number, "ORD-000001");
        product.id
    };

    let pool = Arc::new(
        db::establish_connection_from_app_config(&cfg)
            .await
            .expect("reconnect"),
    );
    let services = AppServices::new(pool, &cfg);
    let second = services
        .settlement
        .place_order(PlaceOrderInput {
            customer,
            items: vec![CartLine {
                product_id,
                quantity: 1,
                unit_price: None,
            }],
            coupon_id: None,
        })
        .await
        .expect("second order");
    assert_eq!(second.order.order_number, "ORD-000002");
}
