use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        coupon::{self, normalize_code, Entity as CouponEntity, Model as CouponModel},
        order::{self, Entity as OrderEntity, OrderStatus},
    },
    errors::{CouponRejection, ServiceError},
    services::{
        catalog::CatalogReader,
        discounts::{applicable_total, Applicability, PricedLine},
    },
};

/// A cart line as submitted by the client.
///
/// `unit_price` is a display hint only; prices are re-read from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

/// Cart lines joined with live catalog data.
#[derive(Debug, Clone, Default)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    /// Number of lines the client submitted, priced or not.
    pub submitted: usize,
}

impl PricedCart {
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(PricedLine::line_total).sum()
    }
}

/// Outcome of a successful evaluation.
#[derive(Debug, Clone)]
pub struct CouponQuote {
    pub coupon: CouponModel,
    pub discount_amount: Decimal,
    pub applicable_total: Decimal,
}

/// Decides whether a coupon applies to a cart and what it is worth.
///
/// Only reads: the coupon, the user's past orders and the catalog.
#[derive(Clone)]
pub struct CouponEvaluator {
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn CatalogReader>,
}

impl CouponEvaluator {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Arc<dyn CatalogReader>) -> Self {
        Self { db, catalog }
    }

    /// Preview path used while the customer builds the cart.
    #[instrument(skip(self, items), fields(code = %code, lines = items.len()))]
    pub async fn validate(
        &self,
        code: &str,
        user_id: Option<Uuid>,
        items: &[CartLine],
    ) -> Result<CouponQuote, ServiceError> {
        self.validate_at(code, user_id, items, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        code: &str,
        user_id: Option<Uuid>,
        items: &[CartLine],
        now: DateTime<Utc>,
    ) -> Result<CouponQuote, ServiceError> {
        let result = async {
            let coupon = self
                .find_by_code(code)
                .await?
                .ok_or(CouponRejection::NotFound)?;
            let cart = self.price_known_lines(items).await?;
            self.evaluate(&*self.db, coupon, user_id, &cart, now).await
        }
        .await;

        record_outcome("preview", &result);
        result
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<CouponModel>, ServiceError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Ok(None);
        }
        Ok(CouponEntity::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?)
    }

    /// Prices lines from the catalog, leaving out products it does not list as active.
    pub async fn price_known_lines(
        &self,
        items: &[CartLine],
    ) -> Result<PricedCart, ServiceError> {
        let ids: Vec<Uuid> = items.iter().map(|line| line.product_id).collect();
        let products = self.catalog.products(&ids).await?;

        let lines = items
            .iter()
            .filter(|line| line.quantity > 0)
            .filter_map(|line| {
                let product = products.get(&line.product_id)?;
                product.is_active.then_some(PricedLine {
                    product_id: product.id,
                    category_id: product.category_id,
                    unit_price: product.price,
                    quantity: line.quantity,
                })
            })
            .collect();

        Ok(PricedCart {
            lines,
            submitted: items.len(),
        })
    }

    /// Runs the status, usage, eligibility, applicability and minimum checks,
    /// then prices the discount.
    ///
    /// `conn` is the connection the per-user usage count is read through.
    pub async fn evaluate<C: ConnectionTrait>(
        &self,
        conn: &C,
        coupon: CouponModel,
        user_id: Option<Uuid>,
        cart: &PricedCart,
        now: DateTime<Utc>,
    ) -> Result<CouponQuote, ServiceError> {
        check_status(&coupon, now)?;

        if let Some(user_id) = user_id {
            let used = user_redemptions(conn, coupon.id, user_id).await?;
            if used >= u64::try_from(coupon.user_limit).unwrap_or(0) {
                return Err(CouponRejection::UserLimitReached.into());
            }
        }

        if !coupon.eligible_users.is_unrestricted() {
            let eligible = user_id
                .map(|id| coupon.eligible_users.contains(&id))
                .unwrap_or(false);
            if !eligible {
                return Err(CouponRejection::NotEligible.into());
            }
        }

        let applicable = applicable_total(
            &cart.lines,
            Applicability {
                products: &coupon.applicable_products,
                categories: &coupon.applicable_categories,
            },
        );
        if applicable.is_zero() && cart.submitted > 0 {
            return Err(CouponRejection::NoApplicableItems.into());
        }

        if applicable < coupon.min_cart_value {
            return Err(CouponRejection::BelowMinimum {
                minimum: coupon.min_cart_value,
            }
            .into());
        }

        let discount_amount = coupon.discount_kind().discount_for(applicable);
        debug!(
            coupon = %coupon.code,
            applicable_total = %applicable,
            discount = %discount_amount,
            "coupon applies"
        );

        Ok(CouponQuote {
            coupon,
            discount_amount,
            applicable_total: applicable,
        })
    }
}

fn check_status(coupon: &CouponModel, now: DateTime<Utc>) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if now < coupon.start_date {
        return Err(CouponRejection::NotYetValid);
    }
    if now > coupon.expiry_date {
        return Err(CouponRejection::Expired);
    }
    if coupon.usage_exhausted() {
        return Err(CouponRejection::GlobalLimitReached);
    }
    Ok(())
}

/// Counts the user's orders that still hold a redemption of `coupon_id`.
///
/// Read outside the settlement transaction, so two simultaneous checkouts by
/// the same user can both pass.
pub async fn user_redemptions<C: ConnectionTrait>(
    conn: &C,
    coupon_id: Uuid,
    user_id: Uuid,
) -> Result<u64, ServiceError> {
    Ok(OrderEntity::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::CouponId.eq(coupon_id))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .count(conn)
        .await?)
}

pub(crate) fn record_outcome(path: &'static str, result: &Result<CouponQuote, ServiceError>) {
    match result {
        Ok(_) => counter!("coupons.evaluations", 1, "path" => path, "outcome" => "applied"),
        Err(ServiceError::CouponRejected(rejection)) => counter!(
            "coupons.evaluations",
            1,
            "path" => path,
            "outcome" => rejection.code()
        ),
        Err(_) => counter!("coupons.evaluations", 1, "path" => path, "outcome" => "error"),
    }
}
