use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::OrderStatus;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Standard error body for every failing endpoint except coupon validation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Missing required field: phone",
    "requestId": "req-abc123xyz",
    "timestamp": "2025-06-01T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

/// Body returned when a coupon code cannot be applied
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "error": "This coupon has expired" }))]
pub struct CouponErrorResponse {
    pub error: String,
}

/// Why a coupon cannot be applied to a cart.
///
/// These are user-facing outcomes of the validation pipeline, never system faults.
/// Variants are listed in the order the pipeline checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("Coupon code not found")]
    NotFound,

    #[error("This coupon is not active")]
    Inactive,

    #[error("This coupon is not valid yet")]
    NotYetValid,

    #[error("This coupon has expired")]
    Expired,

    #[error("This coupon has reached its usage limit")]
    GlobalLimitReached,

    #[error("You have already used this coupon the maximum number of times")]
    UserLimitReached,

    #[error("You are not eligible to use this coupon")]
    NotEligible,

    #[error("This coupon does not apply to any item in your cart")]
    NoApplicableItems,

    #[error("A minimum order of {minimum} in eligible items is required for this coupon")]
    BelowMinimum { minimum: Decimal },
}

impl CouponRejection {
    /// Stable machine-readable identifier, used in logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Inactive => "inactive",
            Self::NotYetValid => "not_yet_valid",
            Self::Expired => "expired",
            Self::GlobalLimitReached => "global_limit_reached",
            Self::UserLimitReached => "user_limit_reached",
            Self::NotEligible => "not_eligible",
            Self::NoApplicableItems => "no_applicable_items",
            Self::BelowMinimum { .. } => "below_minimum",
        }
    }

    /// 404 when the code does not exist, 400 for every other rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for CouponRejection {
    fn into_response(self) -> Response {
        let body = CouponErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Product {0} is not available")]
    UnknownProduct(Uuid),

    #[error("Cannot move order from '{from}' to '{to}'")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    CouponRejected(#[from] CouponRejection),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidInput(_)
            | Self::MissingField(_)
            | Self::UnknownProduct(_) => StatusCode::BAD_REQUEST,
            Self::InvalidStatusTransition { .. } | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::CouponRejected(rejection) => rejection.status_code(),
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Coupon rejected: {0}")]
    CouponRejected(CouponRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(service_error) => service_error.into_response(),
            ApiError::ValidationError(message) => {
                ServiceError::ValidationError(message).into_response()
            }
            ApiError::CouponRejected(rejection) => rejection.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.error, "Not Found");
    }

    #[tokio::test]
    async fn coupon_rejection_renders_error_only_body() {
        let response = ApiError::CouponRejected(CouponRejection::Expired).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload, json!({ "error": "This coupon has expired" }));
    }

    #[test]
    fn unknown_code_maps_to_not_found_and_the_rest_to_bad_request() {
        assert_eq!(
            CouponRejection::NotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        for rejection in [
            CouponRejection::Inactive,
            CouponRejection::NotYetValid,
            CouponRejection::Expired,
            CouponRejection::GlobalLimitReached,
            CouponRejection::UserLimitReached,
            CouponRejection::NotEligible,
            CouponRejection::NoApplicableItems,
            CouponRejection::BelowMinimum { minimum: dec!(500) },
        ] {
            assert_eq!(rejection.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn below_minimum_message_names_the_threshold() {
        let message = CouponRejection::BelowMinimum { minimum: dec!(500) }.to_string();
        assert!(message.contains("500"), "{message}");
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::MissingField("phone").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::UnknownProduct(Uuid::nil()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InvalidStatusTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("password=hunter2".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("stack".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::MissingField("address").response_message(),
            "Missing required field: address"
        );
    }
}
