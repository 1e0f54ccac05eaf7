use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        coupon::{self, normalize_code, Entity as CouponEntity, Model as CouponModel},
        order::{self, Entity as OrderEntity, OrderStatus},
        DiscountType, IdSet,
    },
    errors::ServiceError,
};

const MAX_CODE_LEN: usize = 64;

/// Fields of a new coupon definition.
#[derive(Debug, Clone)]
pub struct CouponDraft {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_cart_value: Option<Decimal>,
    pub max_discount_cap: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub user_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub applicable_products: Vec<Uuid>,
    pub applicable_categories: Vec<Uuid>,
    pub eligible_users: Vec<Uuid>,
}

/// Partial update. `None` leaves a field alone; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct CouponPatch {
    pub code: Option<String>,
    pub description: Option<Option<String>>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub min_cart_value: Option<Decimal>,
    pub max_discount_cap: Option<Option<Decimal>>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<Option<i32>>,
    pub user_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub applicable_products: Option<Vec<Uuid>>,
    pub applicable_categories: Option<Vec<Uuid>>,
    pub eligible_users: Option<Vec<Uuid>>,
}

/// One redemption of a coupon as seen from the order it was applied to.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponUsage {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<order::Model> for CouponUsage {
    fn from(order: order::Model) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            discount_amount: order.discount_amount,
            total: order.total,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

/// Owner of coupon definitions. Never changes `used_count`.
#[derive(Clone)]
pub struct CouponAdminService {
    db: Arc<DatabaseConnection>,
}

impl CouponAdminService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, draft), fields(code = %draft.code))]
    pub async fn create(&self, draft: CouponDraft) -> Result<CouponModel, ServiceError> {
        let now = Utc::now();
        let candidate = CouponModel {
            id: Uuid::new_v4(),
            code: normalize_code(&draft.code),
            description: draft.description,
            discount_type: draft.discount_type,
            discount_value: draft.discount_value,
            min_cart_value: draft.min_cart_value.unwrap_or(Decimal::ZERO),
            max_discount_cap: draft.max_discount_cap,
            start_date: draft.start_date,
            expiry_date: draft.expiry_date,
            usage_limit: draft.usage_limit,
            used_count: 0,
            user_limit: draft.user_limit.unwrap_or(1),
            is_active: draft.is_active.unwrap_or(true),
            applicable_products: draft.applicable_products.into_iter().collect(),
            applicable_categories: draft.applicable_categories.into_iter().collect(),
            eligible_users: draft.eligible_users.into_iter().collect(),
            created_at: now,
            updated_at: now,
        };
        check_definition(&candidate)?;
        self.ensure_code_free(&candidate.code, None).await?;

        let created = candidate
            .into_active_model()
            .insert(&*self.db)
            .await
            .map_err(conflict_on_duplicate)?;

        info!(coupon_id = %created.id, "coupon created");
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: CouponPatch) -> Result<CouponModel, ServiceError> {
        let existing = self.get(id).await?;

        let mut candidate = existing.clone();
        apply_patch(&mut candidate, patch);
        candidate.updated_at = Utc::now();
        check_definition(&candidate)?;
        if candidate.code != existing.code {
            self.ensure_code_free(&candidate.code, Some(id)).await?;
        }

        // used_count only moves through redemption
        let active = coupon::ActiveModel {
            id: Set(id),
            code: Set(candidate.code),
            description: Set(candidate.description),
            discount_type: Set(candidate.discount_type),
            discount_value: Set(candidate.discount_value),
            min_cart_value: Set(candidate.min_cart_value),
            max_discount_cap: Set(candidate.max_discount_cap),
            start_date: Set(candidate.start_date),
            expiry_date: Set(candidate.expiry_date),
            usage_limit: Set(candidate.usage_limit),
            user_limit: Set(candidate.user_limit),
            is_active: Set(candidate.is_active),
            applicable_products: Set(candidate.applicable_products),
            applicable_categories: Set(candidate.applicable_categories),
            eligible_users: Set(candidate.eligible_users),
            updated_at: Set(candidate.updated_at),
            ..Default::default()
        };
        let updated = active.update(&*self.db).await.map_err(conflict_on_duplicate)?;

        info!(coupon_id = %id, "coupon updated");
        Ok(updated)
    }

    /// Deletes the definition. Orders keep their code snapshot and lose the reference.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let detached = OrderEntity::update_many()
            .col_expr(order::Column::CouponId, Expr::value(Option::<Uuid>::None))
            .filter(order::Column::CouponId.eq(id))
            .exec(&txn)
            .await?;

        let deleted = CouponEntity::delete_by_id(id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Coupon {} not found", id)));
        }

        txn.commit().await?;
        info!(coupon_id = %id, orders_detached = detached.rows_affected, "coupon deleted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        CouponEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))
    }

    /// Newest first. `page` is 1-based.
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<CouponModel>, u64), ServiceError> {
        let paginator = CouponEntity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let coupons = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((coupons, total))
    }

    #[instrument(skip(self))]
    pub async fn usage_history(&self, id: Uuid) -> Result<Vec<CouponUsage>, ServiceError> {
        self.get(id).await?;

        let orders = OrderEntity::find()
            .filter(order::Column::CouponId.eq(id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(orders.into_iter().map(CouponUsage::from).collect())
    }

    async fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = CouponEntity::find().filter(coupon::Column::Code.eq(code));
        if let Some(id) = except {
            query = query.filter(coupon::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                code
            )));
        }
        Ok(())
    }
}

fn apply_patch(coupon: &mut CouponModel, patch: CouponPatch) {
    if let Some(code) = patch.code {
        coupon.code = normalize_code(&code);
    }
    if let Some(description) = patch.description {
        coupon.description = description;
    }
    if let Some(discount_type) = patch.discount_type {
        coupon.discount_type = discount_type;
    }
    if let Some(value) = patch.discount_value {
        coupon.discount_value = value;
    }
    if let Some(value) = patch.min_cart_value {
        coupon.min_cart_value = value;
    }
    if let Some(cap) = patch.max_discount_cap {
        coupon.max_discount_cap = cap;
    }
    if let Some(start) = patch.start_date {
        coupon.start_date = start;
    }
    if let Some(expiry) = patch.expiry_date {
        coupon.expiry_date = expiry;
    }
    if let Some(limit) = patch.usage_limit {
        coupon.usage_limit = limit;
    }
    if let Some(limit) = patch.user_limit {
        coupon.user_limit = limit;
    }
    if let Some(active) = patch.is_active {
        coupon.is_active = active;
    }
    if let Some(ids) = patch.applicable_products {
        coupon.applicable_products = ids.into_iter().collect::<IdSet>();
    }
    if let Some(ids) = patch.applicable_categories {
        coupon.applicable_categories = ids.into_iter().collect::<IdSet>();
    }
    if let Some(ids) = patch.eligible_users {
        coupon.eligible_users = ids.into_iter().collect::<IdSet>();
    }
}

/// Invariants every stored coupon satisfies.
pub fn check_definition(coupon: &CouponModel) -> Result<(), ServiceError> {
    let invalid = |msg: &str| Err(ServiceError::ValidationError(msg.to_string()));

    if coupon.code.is_empty() {
        return invalid("code must not be empty");
    }
    if coupon.code.len() > MAX_CODE_LEN {
        return invalid("code must be at most 64 characters");
    }
    if !coupon
        .code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return invalid("code may only contain letters, digits, '-' and '_'");
    }
    if coupon.discount_value < Decimal::ZERO {
        return invalid("discountValue must not be negative");
    }
    if coupon.discount_type == DiscountType::Percentage
        && coupon.discount_value > Decimal::ONE_HUNDRED
    {
        return invalid("percentage discountValue must not exceed 100");
    }
    if coupon.min_cart_value < Decimal::ZERO {
        return invalid("minCartValue must not be negative");
    }
    if coupon.max_discount_cap.is_some_and(|cap| cap < Decimal::ZERO) {
        return invalid("maxDiscountCap must not be negative");
    }
    if coupon.start_date >= coupon.expiry_date {
        return invalid("startDate must be before expiryDate");
    }
    if coupon.user_limit < 1 {
        return invalid("userLimit must be at least 1");
    }
    if let Some(limit) = coupon.usage_limit {
        if limit < 0 {
            return invalid("usageLimit must not be negative");
        }
        if limit < coupon.used_count {
            return invalid("usageLimit cannot be lower than the number of redemptions so far");
        }
    }
    Ok(())
}

fn conflict_on_duplicate(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict("Coupon code already exists".to_string())
        }
        _ => ServiceError::DatabaseError(err),
    }
}
