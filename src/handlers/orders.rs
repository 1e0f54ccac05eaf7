use crate::handlers::common::{
    cart_lines, created_response, map_service_error, success_response, validate_cart_items,
    validate_input, CartItemRequest,
};
use crate::{
    entities::{OrderItemModel, OrderStatus, OrderStatusHistoryModel},
    errors::ApiError,
    services::{
        order_status::OrderDetails,
        settlement::{CustomerInfo, PlaceOrderInput},
    },
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(place_order))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_order_status))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_id: Option<Uuid>,
    #[validate(custom = "validate_cart_items")]
    pub items: Vec<CartItemRequest>,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub address: String,
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub store_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
}

impl From<PlaceOrderRequest> for PlaceOrderInput {
    fn from(req: PlaceOrderRequest) -> Self {
        Self {
            items: cart_lines(&req.items),
            coupon_id: req.coupon_id,
            customer: CustomerInfo {
                user_id: req.user_id,
                name: req.name,
                phone: req.phone,
                address: req.address,
                email: req.email,
                notes: req.notes,
                store_id: req.store_id,
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub line_total: Decimal,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(item: OrderItemModel) -> Self {
        Self {
            id: item.id,
            position: item.position,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            line_total: item.line_total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryResponse {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderStatusHistoryModel> for StatusHistoryResponse {
    fn from(entry: OrderStatusHistoryModel) -> Self {
        Self {
            status: entry.status,
            note: entry.note,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub coupon_id: Option<Uuid>,
    pub coupon_code: Option<String>,
    pub name: Option<String>,
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub store_id: Option<Uuid>,
    pub items: Vec<OrderItemResponse>,
    pub status_history: Vec<StatusHistoryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let order = details.order;
        Self {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            status: order.status,
            subtotal: order.subtotal,
            discount_amount: order.discount_amount,
            total: order.total,
            coupon_id: order.coupon_id,
            coupon_code: order.coupon_code,
            name: order.customer_name,
            phone: order.phone,
            address: order.address,
            email: order.email,
            notes: order.notes,
            store_id: order.store_id,
            items: details.items.into_iter().map(Into::into).collect(),
            status_history: details.status_history.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Settle a cart into an order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Prices the cart from the catalog, re-checks the coupon and records the order as pending. \
                   A coupon that no longer applies is dropped without failing the order.",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Missing field or unknown product", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .settlement
        .place_order(payload.into())
        .await
        .map_err(map_service_error)?;

    Ok(created_response(OrderResponse::from(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with items and status history", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .order_status
        .get_order(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(OrderResponse::from(order)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    summary = "Update order status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .order_status
        .update_status(id, payload.status, payload.note)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(OrderResponse::from(order)))
}
