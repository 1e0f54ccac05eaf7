use crate::handlers::common::{
    cart_lines, map_service_error, success_response, validate_cart_items, validate_input,
    CartItemRequest,
};
use crate::{
    entities::DiscountType,
    errors::ApiError,
    services::coupons::CouponQuote,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for storefront coupon endpoints
pub fn coupons_routes() -> Router<Arc<AppState>> {
    Router::new().route("/validate", post(validate_coupon))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub user_id: Option<Uuid>,
    #[validate(custom = "validate_cart_items")]
    pub items: Vec<CartItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponSummary {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponResponse {
    pub success: bool,
    pub coupon: CouponSummary,
    pub discount_amount: Decimal,
    pub applicable_total: Decimal,
}

impl From<CouponQuote> for ValidateCouponResponse {
    fn from(quote: CouponQuote) -> Self {
        Self {
            success: true,
            coupon: CouponSummary {
                id: quote.coupon.id,
                code: quote.coupon.code,
                discount_type: quote.coupon.discount_type,
                discount_value: quote.coupon.discount_value,
            },
            discount_amount: quote.discount_amount,
            applicable_total: quote.applicable_total,
        }
    }
}

/// Preview a coupon against a cart. Nothing is reserved or redeemed.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/validate",
    summary = "Validate coupon",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon applies to the cart", body = ValidateCouponResponse),
        (status = 400, description = "Coupon cannot be applied", body = crate::errors::CouponErrorResponse),
        (status = 404, description = "Coupon code not found", body = crate::errors::CouponErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn validate_coupon(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let quote = state
        .services
        .coupons
        .validate(&payload.code, payload.user_id, &cart_lines(&payload.items))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ValidateCouponResponse::from(quote)))
}
