mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{CouponSeed, TestApp};

#[tokio::test]
async fn validate_returns_discount_preview() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(1200), Uuid::new_v4()).await;
    app.seed_coupon(CouponSeed {
        min_cart_value: dec!(500),
        cap: Some(dec!(100)),
        ..Default::default()
    })
    .await;

    let (status, body) = app
        .post(
            "/api/v1/coupons/validate",
            json!({
                "code": "save10",
                "items": [{ "productId": product.id, "price": 1200, "quantity": 1 }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["coupon"]["code"], json!("SAVE10"));
    assert_eq!(body["coupon"]["discountType"], json!("percentage"));
    assert_eq!(body["discountAmount"].as_f64(), Some(100.0));
    assert_eq!(body["applicableTotal"].as_f64(), Some(1200.0));
}

#[tokio::test]
async fn unknown_code_is_404_with_error_body() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(100), Uuid::new_v4()).await;

    let (status, body) = app
        .post(
            "/api/v1/coupons/validate",
            json!({
                "code": "MISSING",
                "items": [{ "productId": product.id, "quantity": 1 }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Coupon code not found" }));
}

#[tokio::test]
async fn expired_coupon_is_400_with_error_body() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(100), Uuid::new_v4()).await;
    let now = Utc::now();
    app.seed_coupon(CouponSeed {
        code: "OLD",
        start_date: Some(now - Duration::days(30)),
        expiry_date: Some(now - Duration::days(1)),
        ..Default::default()
    })
    .await;

    let (status, body) = app
        .post(
            "/api/v1/coupons/validate",
            json!({
                "code": "OLD",
                "items": [{ "productId": product.id, "quantity": 1 }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "This coupon has expired" }));
}

#[tokio::test]
async fn empty_cart_fails_request_validation() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/v1/coupons/validate", json!({ "code": "SAVE10", "items": [] }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn place_order_returns_created_order() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(300), Uuid::new_v4()).await;
    let coupon = app.seed_coupon(CouponSeed::default()).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            json!({
                "name": "Ravi",
                "phone": "555-0102",
                "address": "3 Jaggery Street",
                "items": [{ "productId": product.id, "quantity": 2 }],
                "couponId": coupon.id
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], json!("pending"));
    assert_eq!(body["orderNumber"], json!("ORD-000001"));
    assert_eq!(body["subtotal"].as_f64(), Some(600.0));
    assert_eq!(body["discountAmount"].as_f64(), Some(60.0));
    assert_eq!(body["total"].as_f64(), Some(540.0));
    assert_eq!(body["couponCode"], json!("SAVE10"));
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));

    let id = body["id"].as_str().expect("order id").to_string();
    let (status, fetched) = app.get(&format!("/api/v1/orders/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["orderNumber"], json!("ORD-000001"));

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{id}/status"),
            Some(json!({ "status": "confirmed", "note": "kitchen notified" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], json!("confirmed"));
    assert_eq!(updated["statusHistory"].as_array().map(Vec::len), Some(2));

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{id}/status"),
            Some(json!({ "status": "pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn place_order_without_phone_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(300), Uuid::new_v4()).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            json!({
                "name": "Ravi",
                "address": "3 Jaggery Street",
                "items": [{ "productId": product.id, "quantity": 1 }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Missing required field: phone"));
}

#[tokio::test]
async fn unknown_order_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app.get(&format!("/api/v1/orders/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], json!("up"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/coupons/validate"].is_object());
}
