use axum::{response::IntoResponse, routing::get, Json, Router};
use utoipa::OpenApi;

use crate::handlers::{admin_coupons, common, coupons, health, orders};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sweetshop API",
        version = "0.1.0",
        description = r#"
# Sweetshop checkout API

Coupon validation and order settlement for the storefront.

- **Coupons**: preview a promotional code against a cart before checkout
- **Orders**: settle a cart into a pending order; the coupon is re-checked and redeemed atomically
- **Admin**: manage coupon definitions and inspect their redemptions

Monetary values are JSON numbers. Coupon rejections on the validate route are returned as
`{"error": "..."}`; every other failure uses the standard error body.
"#
    ),
    paths(
        coupons::validate_coupon,
        orders::place_order,
        orders::get_order,
        orders::update_order_status,
        admin_coupons::list_coupons,
        admin_coupons::create_coupon,
        admin_coupons::get_coupon,
        admin_coupons::update_coupon,
        admin_coupons::delete_coupon,
        admin_coupons::coupon_usage,
        health::health_check,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::errors::CouponErrorResponse,
        crate::entities::DiscountType,
        crate::entities::OrderStatus,
        common::CartItemRequest,
        common::PaginationMeta,
        coupons::ValidateCouponRequest,
        coupons::ValidateCouponResponse,
        coupons::CouponSummary,
        orders::PlaceOrderRequest,
        orders::UpdateOrderStatusRequest,
        orders::OrderResponse,
        orders::OrderItemResponse,
        orders::StatusHistoryResponse,
        admin_coupons::CreateCouponRequest,
        admin_coupons::UpdateCouponRequest,
        admin_coupons::CouponResponse,
        admin_coupons::CouponListResponse,
        crate::services::coupon_admin::CouponUsage,
        health::HealthResponse,
        health::ComponentStatus,
    )),
    tags(
        (name = "coupons", description = "Storefront coupon preview"),
        (name = "orders", description = "Order settlement and status"),
        (name = "admin", description = "Coupon administration"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}
