use crate::{
    errors::{ApiError, ServiceError},
    services::coupons::CartLine,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::CouponRejected(rejection) => ApiError::CouponRejected(rejection),
        other => ApiError::ServiceError(other),
    }
}

/// One cart line as the storefront submits it
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    /// Price shown to the customer; ignored for pricing
    #[serde(default)]
    pub price: Option<Decimal>,
    pub quantity: i32,
}

impl From<&CartItemRequest> for CartLine {
    fn from(item: &CartItemRequest) -> Self {
        CartLine {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.price,
        }
    }
}

pub fn validate_cart_items(items: &[CartItemRequest]) -> Result<(), ValidationError> {
    if items.is_empty() {
        let mut err = ValidationError::new("length");
        err.message = Some("Cart must contain at least one item".into());
        return Err(err);
    }
    if items.iter().any(|item| item.quantity < 1) {
        let mut err = ValidationError::new("range");
        err.message = Some("Quantity must be at least 1".into());
        return Err(err);
    }
    Ok(())
}

pub fn cart_lines(items: &[CartItemRequest]) -> Vec<CartLine> {
    items.iter().map(CartLine::from).collect()
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

const MAX_PER_PAGE: u64 = 100;

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PaginationMeta::new(1, 20, 0).total_pages, 0);
    }

    #[test]
    fn per_page_is_clamped() {
        let params = PaginationParams {
            page: 0,
            per_page: 10_000,
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn cart_items_need_positive_quantities() {
        let item = CartItemRequest {
            product_id: Uuid::new_v4(),
            price: None,
            quantity: 0,
        };
        assert!(validate_cart_items(&[item]).is_err());
        assert!(validate_cart_items(&[]).is_err());
    }
}
