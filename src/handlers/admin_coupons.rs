use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginationMeta, PaginationParams,
};
use crate::{
    entities::{CouponModel, DiscountType},
    errors::ApiError,
    services::coupon_admin::{CouponDraft, CouponPatch, CouponUsage},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Creates the router for coupon administration
pub fn admin_coupons_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route(
            "/:id",
            get(get_coupon).put(update_coupon).delete(delete_coupon),
        )
        .route("/:id/usage", get(coupon_usage))
}

fn validate_decimal_min_zero(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    Ok(())
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[validate(custom = "validate_decimal_min_zero")]
    pub discount_value: Decimal,
    #[validate(custom = "validate_decimal_min_zero")]
    pub min_cart_value: Option<Decimal>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub max_discount_cap: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    #[validate(range(min = 0))]
    pub usage_limit: Option<i32>,
    #[validate(range(min = 1))]
    pub user_limit: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub applicable_products: Vec<Uuid>,
    #[serde(default)]
    pub applicable_categories: Vec<Uuid>,
    #[serde(default)]
    pub eligible_users: Vec<Uuid>,
}

impl From<CreateCouponRequest> for CouponDraft {
    fn from(req: CreateCouponRequest) -> Self {
        Self {
            code: req.code,
            description: req.description,
            discount_type: req.discount_type,
            discount_value: req.discount_value,
            min_cart_value: req.min_cart_value,
            max_discount_cap: req.max_discount_cap,
            start_date: req.start_date,
            expiry_date: req.expiry_date,
            usage_limit: req.usage_limit,
            user_limit: req.user_limit,
            is_active: req.is_active,
            applicable_products: req.applicable_products,
            applicable_categories: req.applicable_categories,
            eligible_users: req.eligible_users,
        }
    }
}

/// Every field is optional. Send `null` to clear `description`, `maxDiscountCap` or `usageLimit`.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub discount_type: Option<DiscountType>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub discount_value: Option<Decimal>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub min_cart_value: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub max_discount_cap: Option<Option<Decimal>>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub usage_limit: Option<Option<i32>>,
    #[validate(range(min = 1))]
    pub user_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub applicable_products: Option<Vec<Uuid>>,
    pub applicable_categories: Option<Vec<Uuid>>,
    pub eligible_users: Option<Vec<Uuid>>,
}

impl From<UpdateCouponRequest> for CouponPatch {
    fn from(req: UpdateCouponRequest) -> Self {
        Self {
            code: req.code,
            description: req.description,
            discount_type: req.discount_type,
            discount_value: req.discount_value,
            min_cart_value: req.min_cart_value,
            max_discount_cap: req.max_discount_cap,
            start_date: req.start_date,
            expiry_date: req.expiry_date,
            usage_limit: req.usage_limit,
            user_limit: req.user_limit,
            is_active: req.is_active,
            applicable_products: req.applicable_products,
            applicable_categories: req.applicable_categories,
            eligible_users: req.eligible_users,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_cart_value: Decimal,
    pub max_discount_cap: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub user_limit: i32,
    pub is_active: bool,
    pub applicable_products: Vec<Uuid>,
    pub applicable_categories: Vec<Uuid>,
    pub eligible_users: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CouponModel> for CouponResponse {
    fn from(coupon: CouponModel) -> Self {
        Self {
            id: coupon.id,
            code: coupon.code,
            description: coupon.description,
            discount_type: coupon.discount_type,
            discount_value: coupon.discount_value,
            min_cart_value: coupon.min_cart_value,
            max_discount_cap: coupon.max_discount_cap,
            start_date: coupon.start_date,
            expiry_date: coupon.expiry_date,
            usage_limit: coupon.usage_limit,
            used_count: coupon.used_count,
            user_limit: coupon.user_limit,
            is_active: coupon.is_active,
            applicable_products: coupon.applicable_products.to_vec(),
            applicable_categories: coupon.applicable_categories.to_vec(),
            eligible_users: coupon.eligible_users.to_vec(),
            created_at: coupon.created_at,
            updated_at: coupon.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponListResponse {
    pub data: Vec<CouponResponse>,
    pub pagination: PaginationMeta,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/coupons",
    summary = "List coupons",
    params(PaginationParams),
    responses(
        (status = 200, description = "Coupons retrieved", body = CouponListResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn list_coupons(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = (params.page(), params.per_page());
    let (coupons, total) = state
        .services
        .coupon_admin
        .list(page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CouponListResponse {
        data: coupons.into_iter().map(CouponResponse::from).collect(),
        pagination: PaginationMeta::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons",
    summary = "Create coupon",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = CouponResponse),
        (status = 400, description = "Invalid coupon definition", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already in use", body = crate::errors::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn create_coupon(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let coupon = state
        .services
        .coupon_admin
        .create(payload.into())
        .await
        .map_err(map_service_error)?;

    Ok(created_response(CouponResponse::from(coupon)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/coupons/{id}",
    summary = "Get coupon",
    params(("id" = Uuid, Path, description = "Coupon id")),
    responses(
        (status = 200, description = "Coupon retrieved", body = CouponResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn get_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupon_admin
        .get(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CouponResponse::from(coupon)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/coupons/{id}",
    summary = "Update coupon",
    params(("id" = Uuid, Path, description = "Coupon id")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Coupon updated", body = CouponResponse),
        (status = 400, description = "Invalid coupon definition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already in use", body = crate::errors::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn update_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let coupon = state
        .services
        .coupon_admin
        .update(id, payload.into())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CouponResponse::from(coupon)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/coupons/{id}",
    summary = "Delete coupon",
    params(("id" = Uuid, Path, description = "Coupon id")),
    responses(
        (status = 204, description = "Coupon deleted"),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn delete_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .coupon_admin
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/coupons/{id}/usage",
    summary = "Coupon usage history",
    params(("id" = Uuid, Path, description = "Coupon id")),
    responses(
        (status = 200, description = "Orders that redeemed the coupon, newest first", body = [CouponUsage]),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn coupon_usage(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let usage = state
        .services
        .coupon_admin
        .usage_history(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(usage))
}
