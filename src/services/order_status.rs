use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
        order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
        order_status_history::{
            self, Entity as OrderStatusHistoryEntity, Model as OrderStatusHistoryModel,
        },
    },
    errors::ServiceError,
};

/// An order together with its lines and status trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: OrderModel,
    /// Ordered by position.
    pub items: Vec<OrderItemModel>,
    /// Oldest first.
    pub status_history: Vec<OrderStatusHistoryModel>,
}

/// Statuses an order may move to from `from`.
pub fn allowed_transitions(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[Preparing, Cancelled],
        Preparing => &[OutForDelivery, Cancelled],
        OutForDelivery => &[Delivered],
        Delivered | Cancelled => &[],
    }
}

pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db;
        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Position)
            .all(db)
            .await?;

        let status_history = OrderStatusHistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(OrderDetails {
            order,
            items,
            status_history,
        })
    }

    /// Moves an order to `new_status` and records the change in its history.
    ///
    /// Cancelling releases the user's per-user coupon allowance; the coupon's
    /// global usage count is left as is.
    #[instrument(skip(self, note), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        note: Option<String>,
    ) -> Result<OrderDetails, ServiceError> {
        let current = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        self.transition(order_id, current.status, new_status, note)
            .await
    }

    /// Moves an order from `from` to `to`, but only if it is still in `from`.
    ///
    /// Returns `Conflict` when the order has moved on since `from` was read.
    #[instrument(skip(self, note), fields(order_id = %order_id, from = %from, to = %to))]
    pub async fn transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<OrderDetails, ServiceError> {
        if !is_valid_transition(from, to) {
            return Err(ServiceError::InvalidStatusTransition { from, to });
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let moved = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(to))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(from))
            .exec(&txn)
            .await?;

        if moved.rows_affected == 0 {
            let exists = OrderEntity::find_by_id(order_id).one(&txn).await?.is_some();
            txn.rollback().await?;
            if !exists {
                return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
            }
            warn!("order status changed concurrently");
            return Err(ServiceError::Conflict(format!(
                "Order {} is no longer {}",
                order_id, from
            )));
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(to),
            note: Set(note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        counter!("orders.status_changes", 1, "status" => to.as_str());
        info!(%from, %to, "order status updated");

        self.get_order(order_id).await
    }
}
